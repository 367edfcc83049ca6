use std::time::Duration;

use anyhow::{bail, Result};
use chrono::TimeDelta;

/// Suffix to nanoseconds multiplier (sub-second suffixes before "s", "ms" before "m")
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
    ("d", 86_400_000_000_000.0),
];

/// Parse duration strings like "30s", "10m", "24h", "1.5d", "500ms"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Parse a duration string into a signed time window for timestamp arithmetic.
pub fn parse_window(s: &str) -> Result<TimeDelta> {
    let d = parse_duration(s)?;
    Ok(TimeDelta::from_std(d)?)
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if d.as_nanos() == 0 {
        "0s".to_string()
    } else if secs < 1 {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

/// Format the age of a timestamp relative to now ("12m ago").
///
/// A negative age (timestamp in the future) is shown as "in 5m" rather than
/// treated as an error.
pub fn format_age(age: TimeDelta) -> String {
    match age.to_std() {
        Ok(d) => format!("{} ago", format_duration(d)),
        Err(_) => {
            let ahead = (-age).to_std().unwrap_or_default();
            format!("in {}", format_duration(ahead))
        }
    }
}
