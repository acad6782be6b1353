//! Display helpers shared by the terminal slots and the history views.

/// Format an elapsed time in seconds for a run timer.
///
/// Negative and non-finite input is treated as zero. Under a minute the
/// result is `"{s}s"`; from one minute on it is `"{m}:{ss}"` with minutes
/// left unbounded (an hour is `"60:00"`).
pub fn format_elapsed(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    if seconds < 60.0 {
        return format!("{}s", seconds.floor() as u64);
    }

    let minutes = (seconds / 60.0).floor() as u64;
    let rest = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, rest)
}

/// Format a duration in milliseconds, rounded to the nearest second.
///
/// Absent or negative durations render as an empty string.
pub fn format_duration_ms(ms: Option<i64>) -> String {
    match ms {
        Some(ms) if ms >= 0 => format_elapsed((ms as f64 / 1000.0).round()),
        _ => String::new(),
    }
}

/// Parse `N` out of a run label shaped like `"Ticket #N: title"`.
///
/// The label must start with `Ticket #` immediately followed by digits; the
/// first such number wins even if the title mentions other `#refs`.
pub fn parse_ticket_number_from_run_label(label: Option<&str>) -> Option<u64> {
    let rest = label?.strip_prefix("Ticket #")?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end].parse().ok()
}
