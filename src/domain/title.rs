use regex::Regex;
use std::sync::LazyLock;

/// Trailing tracked-time annotation: `[1h 5m]`, `[2h]` or `[75m]`
static TRACKED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:\[(\d+)h(?:\s+(\d+)m)?\]|\[(\d+)m\])\s*$").unwrap()
});

/// A task title split into its base text and already-tracked minutes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTitle {
    pub base_title: String,
    pub existing_minutes: u64,
}

/// Strip a trailing `[Xh Ym]` annotation from a title
///
/// Titles without an annotation come back unchanged with zero minutes.
pub fn decode(title: &str) -> DecodedTitle {
    let Some(caps) = TRACKED_SUFFIX.captures(title) else {
        return DecodedTitle {
            base_title: title.to_string(),
            existing_minutes: 0,
        };
    };

    let number = |idx: usize| -> u64 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    let existing_minutes = if caps.get(1).is_some() {
        number(1).saturating_mul(60).saturating_add(number(2))
    } else {
        number(3)
    };

    let base_title = match caps.get(0) {
        Some(whole) => title[..whole.start()].trim().to_string(),
        None => title.trim().to_string(),
    };

    DecodedTitle {
        base_title,
        existing_minutes,
    }
}

/// Append a tracked-time annotation to a base title
pub fn encode(base_title: &str, total_minutes: u64) -> String {
    format!("{} [{}]", base_title, format_minutes(total_minutes))
}

/// Format minutes as "Xh Ym", "Xh" or "Ym" (zero renders as "0m")
pub fn format_minutes(total_minutes: u64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 && minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Convert elapsed milliseconds to whole minutes, rounding half up
pub fn minutes_from_millis(elapsed_ms: i64) -> u64 {
    if elapsed_ms <= 0 {
        return 0;
    }
    ((elapsed_ms as u64) + 30_000) / 60_000
}
