//! Duration parsing utilities.
//!
//! Engine settings are written as human-readable strings like "5s", "1500ms"
//! or "1m" in the project file.

use std::time::Duration;

/// Parse a settings duration. A bare number means seconds; `ms`, `s` and `m`
/// suffixes are accepted. Fractions and negative values are rejected.
///
/// ```
/// use devswitch::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("1500ms"), Some(Duration::from_millis(1500)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("soon"), None);
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration back into the shortest string `parse_duration_string` accepts.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 != 0 {
        format!("{}ms", millis)
    } else if millis % 60_000 == 0 && millis != 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{}s", millis / 1000)
    }
}
