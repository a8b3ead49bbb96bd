use super::markdown::{human_duration, render_day_log};
use crate::config::TableWidths;
use crate::domain::format_hhmm;
use crate::error::{LogError, StoreError};
use crate::persistence::SessionLogStore;

const NO_VALUE: &str = "—";

/// The session shown at the top of the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSession {
    pub label: String,
    /// `HH:MM`, or a dash when nothing was logged today
    pub since: String,
    pub elapsed: String,
}

/// Everything the popup shows for today
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView {
    pub date: String,
    pub current: CurrentSession,
    pub markdown: String,
}

impl PopupView {
    /// Build the view from today's log; the last session counts as current
    pub async fn load(log: &SessionLogStore, widths: &TableWidths) -> Result<Self, StoreError> {
        let now = log.clock().now_ms();
        let date = log.today_key();
        let day = log.day_log(&date).await?;

        let current = match day.last() {
            Some(last) => CurrentSession {
                label: last.display_label().to_string(),
                since: format_hhmm(last.start),
                elapsed: human_duration(last.end.unwrap_or(now) - last.start),
            },
            None => CurrentSession {
                label: log.idle_label().to_string(),
                since: NO_VALUE.to_string(),
                elapsed: NO_VALUE.to_string(),
            },
        };

        Ok(Self {
            markdown: render_day_log(&day, now, widths),
            date,
            current,
        })
    }

    /// File name for the downloaded table
    pub fn download_name(&self) -> String {
        format!("chronolog-{}.md", self.date)
    }
}

/// Throw away today's history and start over with an open Idle session
pub async fn reset_today(log: &SessionLogStore) -> Result<(), LogError> {
    log.reset_today_preserve_idle().await
}
