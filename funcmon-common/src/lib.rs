use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod format;

/// Path of the collection endpoint polled by the dashboard.
pub const METRICS_PATH: &str = "/api/metrics";

/// Path prefix of the per-function endpoint; the function name follows as one path segment.
pub const FUNCTION_API_PATH: &str = "/api/function/";

/// Path of the per-function page that dashboard rows link to.
pub const FUNCTION_PAGE_PATH: &str = "/function";

/// Error types for funcmon operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuncMonError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Malformed metrics payload: {0}")]
    DecodeError(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// JSON error envelope a metrics server may return with an error status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result type for funcmon operations
pub type Result<T> = std::result::Result<T, FuncMonError>;

/// One monitored function as reported by the metrics feed.
///
/// The numeric measurements are optional: a server may omit them, send
/// `null`, or send `0` before anything has been measured. All three mean
/// "not yet measured" to the dashboard; see [`MetricRecord::measured_duration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Seconds.
    #[serde(default)]
    pub avg_duration: Option<f64>,
    /// Bytes.
    #[serde(default)]
    pub mem_alloc: Option<f64>,
    pub invocations: u64,
    /// Per-call history. Only the per-function endpoint is expected to fill it.
    /// A `null` (Go's encoding of a nil slice) decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallRecord>,
}

impl MetricRecord {
    /// A record with no measurements yet.
    pub fn new(name: impl Into<String>, invocations: u64) -> Self {
        Self {
            name: name.into(),
            duration: None,
            avg_duration: None,
            mem_alloc: None,
            invocations,
            calls: Vec::new(),
        }
    }

    pub fn measured_duration(&self) -> Option<f64> {
        measured(self.duration)
    }

    pub fn measured_avg_duration(&self) -> Option<f64> {
        measured(self.avg_duration)
    }

    pub fn measured_mem_alloc(&self) -> Option<f64> {
        measured(self.mem_alloc)
    }
}

/// A single recorded invocation of a function. Missing fields take zero values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallRecord {
    /// RFC 3339 timestamp as sent by the server.
    pub timestamp: String,
    /// Seconds.
    pub duration: f64,
    /// Bytes.
    pub mem_alloc: u64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// Zero and NaN count as "not measured" alongside a missing value.
fn measured(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}
