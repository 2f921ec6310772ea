pub mod config;
pub mod logging;
pub mod refresh;
pub mod render;
pub mod table;

pub use config::{DashboardConfig, DEFAULT_REFRESH_INTERVAL};
pub use refresh::{paint, MetricsSource, OverlapPolicy, RefreshHandle, RefreshLoop, TickOutcome};
pub use render::{function_link, function_summary, render_call_rows, render_row, CALL_HEADERS, METRICS_HEADERS};
pub use table::{Cell, HtmlTableBody, Row, TableBody, TerminalTable};
