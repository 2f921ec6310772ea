//! Human-readable renderings of durations and memory sizes for the dashboard.

use chrono::DateTime;

/// Format a duration given in seconds.
///
/// Sub-second values are shown as whole milliseconds, values under a minute
/// as seconds with two decimals. Anything longer is divided by 60 but keeps
/// the `s` suffix, so `120.0` renders as `"2.00 s"`. Existing dashboards
/// show that label and it is kept as-is.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{} ms", to_fixed(seconds * 1000.0, 0))
    } else if seconds < 60.0 {
        format!("{} s", to_fixed(seconds, 2))
    } else {
        format!("{} s", to_fixed(seconds / 60.0, 2))
    }
}

/// Format a byte count as mebibytes with two decimals, e.g. `"2.00 MB"`.
pub fn format_mb(bytes: f64) -> String {
    format!("{} MB", to_fixed(bytes / 1024.0 / 1024.0, 2))
}

/// Format a byte count with the largest fitting binary unit, e.g. `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

/// Render an RFC 3339 timestamp as `2006-01-02 15:04:05` in its own offset.
/// Text that does not parse is returned unchanged.
pub fn format_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Seconds with two decimals and no unit.
pub fn format_seconds(seconds: f64) -> String {
    to_fixed(seconds, 2)
}

/// Fixed-point rendering that rounds exact binary ties upwards.
///
/// `format!("{:.2}")` rounds ties to even, so `0.125` would come out as
/// `"0.12"`; browsers print `"0.13"`. Values that only look like ties in
/// decimal (`1.005` is stored as `1.00499...`) are left to the formatter.
pub fn to_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    let exact = value.mul_add(scale, -scaled) == 0.0;
    if exact && scaled.fract() == 0.5 {
        return format!("{:.*}", digits, (scaled + 0.5) / scale);
    }
    format!("{:.*}", digits, value)
}
