//! The refresh loop: fetch the metrics collection and repaint the table, on a timer.

use funcmon_client::Client;
use funcmon_common::{FuncMonError, MetricRecord, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_REFRESH_INTERVAL;
use crate::render::render_row;
use crate::table::TableBody;

/// Where a tick gets its records from.
pub trait MetricsSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<MetricRecord>>> + Send;
}

impl MetricsSource for Client {
    fn fetch(&self) -> impl Future<Output = Result<Vec<MetricRecord>>> + Send {
        self.fetch_metrics()
    }
}

/// What to do when a tick fires while an earlier one is still fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Start the new fetch anyway. Whichever render completes last wins.
    #[default]
    Concurrent,
    /// Drop the new tick.
    SingleFlight,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The table was repainted with this many rows.
    Rendered(usize),
    /// Fetch or decode failed; the table was left untouched.
    Skipped(FuncMonError),
    /// Another tick was in flight under [`OverlapPolicy::SingleFlight`].
    Busy,
}

/// Replace the table contents with one row per record, in order.
pub fn paint<T: TableBody + ?Sized>(table: &mut T, records: &[MetricRecord]) {
    table.clear();
    for record in records {
        table.append_row(render_row(record));
    }
    table.finish();
}

pub struct RefreshLoop<S, T> {
    source: Arc<S>,
    table: Arc<Mutex<T>>,
    interval: Duration,
    policy: OverlapPolicy,
    in_flight: Arc<AtomicBool>,
}

impl<S, T> Clone for RefreshLoop<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            table: Arc::clone(&self.table),
            interval: self.interval,
            policy: self.policy,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S: MetricsSource, T: TableBody + 'static> RefreshLoop<S, T> {
    pub fn new(source: S, table: Arc<Mutex<T>>) -> Self {
        Self {
            source: Arc::new(source),
            table,
            interval: DEFAULT_REFRESH_INTERVAL,
            policy: OverlapPolicy::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Must be non-zero.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn table(&self) -> Arc<Mutex<T>> {
        Arc::clone(&self.table)
    }

    /// Run one fetch-and-render cycle.
    pub async fn tick(&self) -> TickOutcome {
        let _guard = match self.policy {
            OverlapPolicy::Concurrent => None,
            OverlapPolicy::SingleFlight => match InFlightGuard::acquire(&self.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    debug!(event = "dashboard.refresh.tick_busy");
                    return TickOutcome::Busy;
                }
            },
        };

        match self.source.fetch().await {
            Ok(records) => {
                let mut table = self.table.lock().await;
                paint(&mut *table, &records);
                debug!(event = "dashboard.refresh.rendered", rows = records.len());
                TickOutcome::Rendered(records.len())
            }
            Err(e) => {
                warn!(
                    event = "dashboard.refresh.render_skipped",
                    error = %e,
                    message = "Metrics fetch failed; keeping previous table"
                );
                TickOutcome::Skipped(e)
            }
        }
    }

    /// Spawn the repeating timer. The first tick fires immediately.
    ///
    /// Each tick runs as its own task so a slow fetch never delays the timer.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> RefreshHandle {
        let refresh = self.clone();
        info!(
            event = "dashboard.refresh.started",
            interval_ms = refresh.interval.as_millis() as u64,
            policy = ?refresh.policy
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let tick = refresh.clone();
                tokio::spawn(async move {
                    tick.tick().await;
                });
            }
        });

        RefreshHandle { task }
    }
}

/// Owns a running refresh timer. Dropping the handle stops the timer.
///
/// Stopping does not cancel ticks that are already fetching; they finish and render.
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(&self) {
        if !self.task.is_finished() {
            self.task.abort();
            info!(event = "dashboard.refresh.stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
