use funcmon_common::format::{format_bytes, format_duration, format_mb, format_seconds, format_time};
use funcmon_common::{MetricRecord, FUNCTION_PAGE_PATH};
use reqwest::Url;

use crate::table::{Cell, Row};

/// Column headers of the metrics table, in cell order.
pub const METRICS_HEADERS: [&str; 5] = ["Function", "Duration", "Avg Duration", "Memory", "Invocations"];

/// Column headers of a function's call history.
pub const CALL_HEADERS: [&str; 3] = ["Timestamp", "Duration", "Memory"];

/// Relative link to a function's page, e.g. `/function?name=ProcessData`.
/// The name is form-encoded into the query.
pub fn function_link(name: &str) -> String {
    let base = format!("http://localhost{}", FUNCTION_PAGE_PATH);
    match Url::parse_with_params(&base, &[("name", name)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => FUNCTION_PAGE_PATH.to_string(),
    }
}

/// One metrics table row: linked name, duration, average duration, memory, invocations.
/// Unmeasured values (missing, null, zero) render as empty cells.
pub fn render_row(record: &MetricRecord) -> Row {
    Row {
        cells: vec![
            Cell::Link { text: record.name.clone(), href: function_link(&record.name) },
            Cell::Text(record.measured_duration().map(format_duration).unwrap_or_default()),
            Cell::Text(record.measured_avg_duration().map(format_duration).unwrap_or_default()),
            Cell::Text(record.measured_mem_alloc().map(format_mb).unwrap_or_default()),
            Cell::Text(record.invocations.to_string()),
        ],
    }
}

/// Labelled summary lines for a single function: name, invocations,
/// total and average time in seconds, and memory.
pub fn function_summary(record: &MetricRecord) -> Vec<(&'static str, String)> {
    let seconds = |value: Option<f64>| value.map(|s| format!("{} s", format_seconds(s))).unwrap_or_default();
    vec![
        ("Function", record.name.clone()),
        ("Invocations", record.invocations.to_string()),
        ("Total time", seconds(record.measured_duration())),
        ("Average time", seconds(record.measured_avg_duration())),
        ("Memory", record.measured_mem_alloc().map(format_mb).unwrap_or_default()),
    ]
}

/// One row per recorded call: timestamp, duration, memory.
pub fn render_call_rows(record: &MetricRecord) -> Vec<Row> {
    record
        .calls
        .iter()
        .map(|call| Row {
            cells: vec![
                Cell::Text(format_time(&call.timestamp)),
                Cell::Text(format_duration(call.duration)),
                Cell::Text(format_bytes(call.mem_alloc)),
            ],
        })
        .collect()
}
