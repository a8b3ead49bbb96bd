/// User-facing notices
/// Desktop notifications are only implemented on macOS; elsewhere they go to stderr

#[cfg(target_os = "macos")]
use std::process::Command;
use std::sync::Mutex;

/// Something the user should see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Time was logged but the title could not be updated; the user has to rename by hand
    RenameFailed { intended_title: String, reason: String },
    /// A tracked session was stopped
    SessionCompleted { label: String, minutes: u64 },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::RenameFailed { .. } => "Chronolog - Rename manually",
            Notice::SessionCompleted { .. } => "Chronolog - Session completed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notice::RenameFailed {
                intended_title,
                reason,
            } => format!("Rename the task to \"{}\" ({})", intended_title, reason),
            Notice::SessionCompleted { label, minutes } => {
                format!("{}: {}", label, crate::domain::format_minutes(*minutes))
            }
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Prints notices to stderr and, on macOS, also raises a desktop notification
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}: {}", notice.title(), notice.body());

        #[cfg(target_os = "macos")]
        {
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                notice.body().replace('"', "\\\""),
                notice.title()
            );

            if let Err(e) = Command::new("osascript").arg("-e").arg(&script).output() {
                tracing::debug!(error = %e, "osascript failed");
            }
        }
    }
}

/// Keeps every notice in memory
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        tracing::info!(notice = ?notice, "Notice");
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let notice = Notice::RenameFailed {
            intended_title: "Write report [1h 23m]".into(),
            reason: "Could not find title control".into(),
        };
        assert_eq!(
            notice.body(),
            "Rename the task to \"Write report [1h 23m]\" (Could not find title control)"
        );

        let notice = Notice::SessionCompleted {
            label: "Review PR".into(),
            minutes: 83,
        };
        assert_eq!(notice.body(), "Review PR: 1h 23m");
    }

    #[test]
    fn test_notice_log_collects() {
        let log = NoticeLog::new();
        log.notify(Notice::SessionCompleted {
            label: "A".into(),
            minutes: 1,
        });
        assert_eq!(log.notices().len(), 1);
    }
}
