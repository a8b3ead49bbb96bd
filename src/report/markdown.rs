use crate::config::TableWidths;
use crate::domain::{format_hhmm, format_minutes, minutes_from_millis, DayLog, IDLE_LABEL};

/// Pad to `width` characters, leaving longer text as it is
fn pad_right(text: &str, width: usize) -> String {
    let text = text.trim();
    format!("{:<width$}", text, width = width)
}

fn pad_left(text: &str, width: usize) -> String {
    let text = text.trim();
    format!("{:>width$}", text, width = width)
}

/// Elapsed time between `start` and `end`, as shown in the table
pub fn human_duration(elapsed_ms: i64) -> String {
    format_minutes(minutes_from_millis(elapsed_ms))
}

/// Render a day's sessions as a fixed-column Markdown table
///
/// Open sessions are measured up to `now_ms`.
pub fn render_day_log(day: &DayLog, now_ms: i64, widths: &TableWidths) -> String {
    let mut lines = Vec::with_capacity(day.len() + 2);
    lines.push(format!(
        "|Start| {}| Spent |",
        pad_right("Task name", widths.name_width.saturating_sub(1))
    ));
    lines.push(format!(
        "|{}|{}|{}|",
        "-".repeat(widths.start_width),
        "-".repeat(widths.name_width),
        "-".repeat(widths.spent_width)
    ));

    for session in day.sessions() {
        let label = session.label.trim();
        let label = if label.is_empty() { IDLE_LABEL } else { label };
        let end = session.end.unwrap_or(now_ms);
        lines.push(format!(
            "|{}|{}|{}|",
            format_hhmm(session.start),
            pad_right(label, widths.name_width),
            pad_left(&human_duration(end - session.start), widths.spent_width)
        ));
    }

    lines.join("\n")
}
