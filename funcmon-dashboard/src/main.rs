use clap::Parser;
use funcmon_client::Client;
use funcmon_dashboard::logging::init_logging;
use funcmon_dashboard::{
    function_summary, render_call_rows, DashboardConfig, HtmlTableBody, RefreshLoop, Row, TableBody, TerminalTable, TickOutcome,
    CALL_HEADERS, METRICS_HEADERS,
};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "funcmon-dashboard", about = "Live table of per-function metrics")]
struct Args {
    /// Metrics server address (host:port)
    #[arg(long)]
    addr: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Skip a tick while the previous fetch is still running
    #[arg(long)]
    single_flight: bool,

    /// Fetch and render once, then exit
    #[arg(long)]
    once: bool,

    /// Print the HTML table body instead of a text table
    #[arg(long)]
    html: bool,

    /// Show one function's call history instead of the live table
    #[arg(long)]
    function: Option<String>,

    /// Path to a JSON file with dashboard settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.quiet);

    let config = resolve_config(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(3);
    });

    let client = Client::new(config.client_config());

    let exit_code = if let Some(name) = &args.function {
        show_function(&client, name, args.html).await
    } else if args.html {
        run_dashboard(&config, client, HtmlPrinter::default(), args.once).await
    } else {
        let table = TerminalTable::new(&METRICS_HEADERS, std::io::stdout()).with_clear_screen(!args.once);
        run_dashboard(&config, client, table, args.once).await
    };

    process::exit(exit_code);
}

fn resolve_config(args: &Args) -> funcmon_common::Result<DashboardConfig> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(addr) = &args.addr {
        config.server_addr = addr.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.refresh_interval_ms = ms;
    }
    if args.single_flight {
        config.single_flight = true;
    }
    config.validate()?;
    Ok(config)
}

async fn run_dashboard<T: TableBody + 'static>(config: &DashboardConfig, client: Client, table: T, once: bool) -> i32 {
    let refresh = RefreshLoop::new(client, Arc::new(Mutex::new(table)))
        .with_interval(config.refresh_interval())
        .with_overlap_policy(config.overlap_policy());

    if once {
        return match refresh.tick().await {
            TickOutcome::Rendered(_) => 0,
            TickOutcome::Skipped(e) => {
                eprintln!("{e}");
                1
            }
            TickOutcome::Busy => 1,
        };
    }

    let handle = refresh.start();
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(event = "dashboard.signal.failed", error = %e);
    }
    handle.stop();
    0
}

async fn show_function(client: &Client, name: &str, html: bool) -> i32 {
    let record = match client.fetch_function(name).await {
        Ok(record) => record,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let rows = render_call_rows(&record);
    if html {
        let mut body = HtmlTableBody::new();
        fill(&mut body, rows);
        println!("{}", body.to_html());
        return 0;
    }

    for (label, value) in function_summary(&record) {
        println!("{:<14}{}", format!("{label}:"), value);
    }
    println!();
    fill(&mut TerminalTable::new(&CALL_HEADERS, std::io::stdout()), rows);
    0
}

fn fill<T: TableBody>(table: &mut T, rows: Vec<Row>) {
    table.clear();
    for row in rows {
        table.append_row(row);
    }
    table.finish();
}

/// HTML body printed to stdout after every paint, one line per paint.
#[derive(Default)]
struct HtmlPrinter {
    body: HtmlTableBody,
}

impl TableBody for HtmlPrinter {
    fn clear(&mut self) {
        self.body.clear();
    }

    fn append_row(&mut self, row: Row) {
        self.body.append_row(row);
    }

    fn finish(&mut self) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", self.body.to_html()).and_then(|_| out.flush()) {
            error!(event = "dashboard.html.write_failed", error = %e);
        }
    }
}
