use funcmon_client::{Client, ClientConfig};
use funcmon_common::{FuncMonError, MetricRecord, Result};
use funcmon_dashboard::{HtmlTableBody, MetricsSource, OverlapPolicy, RefreshLoop, TickOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

// --- Test helpers ---

/// Replays queued responses, one per fetch. Repeats the last one when the queue runs dry.
struct ScriptedSource {
    responses: std::sync::Mutex<VecDeque<Result<Vec<MetricRecord>>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<Vec<MetricRecord>>>) -> Self {
        Self { responses: std::sync::Mutex::new(responses.into()), fetches: Arc::new(AtomicUsize::new(0)) }
    }
}

impl MetricsSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<MetricRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

/// Blocks every fetch until released, then returns one record.
struct GatedSource {
    gate: Arc<Notify>,
    fetches: Arc<AtomicUsize>,
}

impl MetricsSource for GatedSource {
    async fn fetch(&self) -> Result<Vec<MetricRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(vec![MetricRecord::new("gated", 1)])
    }
}

/// Each fetch takes the next queued delay and answers with the matching record name.
struct DelayedSource {
    script: Arc<std::sync::Mutex<VecDeque<(Duration, &'static str)>>>,
}

impl MetricsSource for DelayedSource {
    async fn fetch(&self) -> Result<Vec<MetricRecord>> {
        let next = self.script.lock().unwrap().pop_front();
        let (delay, name) = next.unwrap_or((Duration::ZERO, "unscripted"));
        tokio::time::sleep(delay).await;
        Ok(vec![MetricRecord::new(name, 1)])
    }
}

fn records(names: &[&str]) -> Vec<MetricRecord> {
    names.iter().enumerate().map(|(i, n)| MetricRecord::new(*n, i as u64)).collect()
}

fn html_table() -> Arc<Mutex<HtmlTableBody>> {
    Arc::new(Mutex::new(HtmlTableBody::new()))
}

// --- tick ---

#[tokio::test]
async fn test_tick_renders_one_row_per_record() {
    let table = html_table();
    let refresh = RefreshLoop::new(ScriptedSource::new(vec![Ok(records(&["a", "b", "c"]))]), table.clone());

    assert_eq!(refresh.tick().await, TickOutcome::Rendered(3));
    assert_eq!(table.lock().await.row_count(), 3);
}

#[tokio::test]
async fn test_tick_with_empty_response_clears_table() {
    let table = html_table();
    let source = ScriptedSource::new(vec![Ok(records(&["a", "b"])), Ok(Vec::new())]);
    let refresh = RefreshLoop::new(source, table.clone());

    assert_eq!(refresh.tick().await, TickOutcome::Rendered(2));
    assert_eq!(refresh.tick().await, TickOutcome::Rendered(0));
    assert_eq!(table.lock().await.row_count(), 0);
}

#[tokio::test]
async fn test_failed_tick_leaves_table_unchanged() {
    let table = html_table();
    let source = ScriptedSource::new(vec![
        Ok(records(&["a", "b"])),
        Err(FuncMonError::NetworkError("connection reset".to_string())),
        Err(FuncMonError::DecodeError("expected value".to_string())),
        Ok(records(&["c"])),
    ]);
    let refresh = RefreshLoop::new(source, table.clone());

    refresh.tick().await;
    let before = table.lock().await.to_html();

    assert!(matches!(refresh.tick().await, TickOutcome::Skipped(FuncMonError::NetworkError(_))));
    assert_eq!(table.lock().await.to_html(), before);

    assert!(matches!(refresh.tick().await, TickOutcome::Skipped(FuncMonError::DecodeError(_))));
    assert_eq!(table.lock().await.to_html(), before);

    // The next successful tick recovers without any retry bookkeeping.
    assert_eq!(refresh.tick().await, TickOutcome::Rendered(1));
    assert!(table.lock().await.to_html().contains(">c</a>"));
}

#[tokio::test]
async fn test_tick_against_http_feed() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/api/metrics")
        .with_status(200)
        .with_body(r#"[{"name":"foo","duration":0.005,"avg_duration":0.01,"mem_alloc":2097152,"invocations":42}]"#)
        .create_async()
        .await;

    let client = Client::new(ClientConfig { server_addr: server.url().trim_start_matches("http://").to_string() });
    let table = html_table();
    let refresh = RefreshLoop::new(client, table.clone());

    assert_eq!(refresh.tick().await, TickOutcome::Rendered(1));
    assert_eq!(
        table.lock().await.to_html(),
        "<tr><td><a href=\"/function?name=foo\">foo</a></td><td>5 ms</td><td>10 ms</td><td>2.00 MB</td><td>42</td></tr>"
    );
}

#[tokio::test]
async fn test_tick_skips_on_http_500() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/api/metrics")
        .with_status(500)
        .create_async()
        .await;

    let client = Client::new(ClientConfig { server_addr: server.url().trim_start_matches("http://").to_string() });
    let refresh = RefreshLoop::new(client, html_table());

    assert!(matches!(refresh.tick().await, TickOutcome::Skipped(FuncMonError::HttpError(500, _))));
}

// --- overlap policy ---

#[test]
fn test_defaults() {
    let refresh = RefreshLoop::new(ScriptedSource::new(Vec::new()), html_table());
    assert_eq!(refresh.interval(), Duration::from_millis(1000));
    assert_eq!(refresh.overlap_policy(), OverlapPolicy::Concurrent);
}

#[tokio::test]
async fn test_single_flight_reports_busy_while_fetch_pending() {
    let gate = Arc::new(Notify::new());
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = GatedSource { gate: gate.clone(), fetches: fetches.clone() };
    let refresh = RefreshLoop::new(source, html_table()).with_overlap_policy(OverlapPolicy::SingleFlight);

    let first = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });
    while fetches.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(refresh.tick().await, TickOutcome::Busy);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), TickOutcome::Rendered(1));

    // The flag is released once the first tick completes.
    let second = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });
    while fetches.load(Ordering::SeqCst) == 1 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();
    assert_eq!(second.await.unwrap(), TickOutcome::Rendered(1));
}

#[tokio::test]
async fn test_concurrent_policy_lets_ticks_overlap() {
    let gate = Arc::new(Notify::new());
    let fetches = Arc::new(AtomicUsize::new(0));
    let source = GatedSource { gate: gate.clone(), fetches: fetches.clone() };
    let refresh = RefreshLoop::new(source, html_table());

    let a = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });
    let b = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });
    while fetches.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }

    gate.notify_waiters();
    assert_eq!(a.await.unwrap(), TickOutcome::Rendered(1));
    assert_eq!(b.await.unwrap(), TickOutcome::Rendered(1));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_policy_last_completed_render_wins() {
    let script = Arc::new(std::sync::Mutex::new(VecDeque::from(vec![
        (Duration::from_millis(200), "slow"),
        (Duration::from_millis(10), "fast"),
    ])));
    let source = DelayedSource { script: script.clone() };
    let table = html_table();
    let refresh = RefreshLoop::new(source, table.clone());

    let slow = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });
    while script.lock().unwrap().len() == 2 {
        tokio::task::yield_now().await;
    }
    let fast = tokio::spawn({
        let refresh = refresh.clone();
        async move { refresh.tick().await }
    });

    assert_eq!(fast.await.unwrap(), TickOutcome::Rendered(1));
    assert!(table.lock().await.to_html().contains(">fast</a>"));

    assert_eq!(slow.await.unwrap(), TickOutcome::Rendered(1));
    let html = table.lock().await.to_html();
    assert!(html.contains(">slow</a>"));
    assert!(!html.contains(">fast</a>"));
}

// --- start / stop ---

#[tokio::test(start_paused = true)]
async fn test_start_ticks_immediately_then_every_interval() {
    let source = ScriptedSource::new(vec![Ok(records(&["a"]))]);
    let fetches = source.fetches.clone();
    let table = html_table();
    let refresh = RefreshLoop::new(source, table.clone());

    let handle = refresh.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(table.lock().await.row_count(), 1);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 3);

    handle.stop();
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert!(!handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_errors_do_not_stop_the_timer() {
    let source = ScriptedSource::new(vec![Err(FuncMonError::NetworkError("down".to_string()))]);
    let fetches = source.fetches.clone();
    let refresh = RefreshLoop::new(source, html_table()).with_interval(Duration::from_millis(250));

    let _handle = refresh.start();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_timer() {
    let source = ScriptedSource::new(vec![Ok(Vec::new())]);
    let fetches = source.fetches.clone();
    let refresh = RefreshLoop::new(source, html_table());

    let handle = refresh.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}
