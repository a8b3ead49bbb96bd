use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default label for time not attributed to any task
pub const IDLE_LABEL: &str = "Idle";

/// A labeled time interval; `end == None` means it is still running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub label: String,
    /// Epoch milliseconds
    pub start: i64,
    /// Epoch milliseconds, absent while open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl Session {
    pub fn open(label: impl Into<String>, start: i64) -> Self {
        Self {
            label: label.into(),
            start,
            end: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Elapsed milliseconds, measured against `now` while still open
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        (self.end.unwrap_or(now) - self.start).max(0)
    }

    /// Label to display, falling back to Idle for blank labels
    pub fn display_label(&self) -> &str {
        let label = self.label.trim();
        if label.is_empty() {
            IDLE_LABEL
        } else {
            label
        }
    }
}

/// Ordered sessions for one calendar day; insertion order is chronological
///
/// At most one session is open, and an open session is always the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayLog(Vec<Session>);

impl DayLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn sessions(&self) -> &[Session] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Session> {
        self.0.last()
    }

    /// The running session, if the last one is open
    pub fn open_session(&self) -> Option<&Session> {
        self.0.last().filter(|s| s.is_open())
    }

    /// Push a new open session. Returns the label of the session blocking it, if any.
    pub fn push_open(&mut self, label: &str, start: i64) -> Result<(), String> {
        if let Some(open) = self.open_session() {
            return Err(open.label.clone());
        }
        self.0.push(Session::open(label, start));
        Ok(())
    }

    /// Close the running session at `end` (never earlier than its start)
    pub fn close_open(&mut self, end: i64) -> Option<Session> {
        let last = self.0.last_mut().filter(|s| s.is_open())?;
        last.end = Some(end.max(last.start));
        Some(last.clone())
    }

    /// Open a session with `label` unless one is already running. Returns true if one was added.
    pub fn ensure_open(&mut self, label: &str, now: i64) -> bool {
        if self.open_session().is_some() {
            return false;
        }
        self.0.push(Session::open(label, now));
        true
    }

    /// Close the running session and open `label` at the same instant
    pub fn switch_to(&mut self, label: &str, now: i64) -> Option<Session> {
        let closed = self.close_open(now);
        self.0.push(Session::open(label, now));
        closed
    }

    /// Drop all history and start over with an open Idle session at `now`
    pub fn reset_to_idle(&mut self, idle_label: &str, now: i64) {
        self.0.clear();
        self.0.push(Session::open(idle_label, now));
    }

    /// Check the single-open-session invariant
    pub fn is_well_formed(&self) -> bool {
        let open = self.0.iter().filter(|s| s.is_open()).count();
        open == 0 || (open == 1 && self.open_session().is_some())
    }
}

impl From<Vec<Session>> for DayLog {
    fn from(sessions: Vec<Session>) -> Self {
        Self(sessions)
    }
}

/// Every day's log, keyed by `YYYY-MM-DD`
pub type LogBook = BTreeMap<String, DayLog>;

/// Local calendar date key for a moment
pub fn day_key(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Local `HH:MM` for an epoch-millisecond timestamp
pub fn format_hhmm(ts_ms: i64) -> String {
    match Local.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_json_shape() {
        let open: Session = serde_json::from_str(r#"{"label":"Idle","start":1000}"#).unwrap();
        assert!(open.is_open());

        let null_end: Session =
            serde_json::from_str(r#"{"label":"Idle","start":1000,"end":null}"#).unwrap();
        assert!(null_end.is_open());

        let json = serde_json::to_string(&Session::open("Idle", 5)).unwrap();
        assert_eq!(json, r#"{"label":"Idle","start":5}"#);
    }

    #[test]
    fn test_display_label_falls_back_to_idle() {
        assert_eq!(Session::open("  ", 0).display_label(), "Idle");
        assert_eq!(Session::open(" Deep work ", 0).display_label(), "Deep work");
    }

    #[test]
    fn test_ensure_open_on_empty_log() {
        let mut log = DayLog::new();
        assert!(log.ensure_open(IDLE_LABEL, 42));
        assert_eq!(log.sessions(), &[Session::open(IDLE_LABEL, 42)]);
    }

    #[test]
    fn test_ensure_open_is_idempotent() {
        let mut once = DayLog::new();
        once.ensure_open(IDLE_LABEL, 10);

        let mut twice = DayLog::new();
        twice.ensure_open(IDLE_LABEL, 10);
        assert!(!twice.ensure_open(IDLE_LABEL, 20));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_switch_has_no_gap_or_overlap() {
        let mut log = DayLog::new();
        log.ensure_open(IDLE_LABEL, 100);
        let closed = log.switch_to("Write report", 500).unwrap();

        assert_eq!(closed.end, Some(500));
        assert_eq!(log.sessions()[1].start, 500);
        assert_eq!(log.open_session().map(|s| s.label.as_str()), Some("Write report"));
    }

    #[test]
    fn test_switch_on_closed_log_only_opens() {
        let mut log = DayLog::from(vec![Session {
            label: "A".to_string(),
            start: 0,
            end: Some(10),
        }]);
        assert!(log.switch_to("B", 20).is_none());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_close_open_never_ends_before_start() {
        let mut log = DayLog::new();
        log.ensure_open("A", 1_000);
        let closed = log.close_open(500).unwrap();
        assert_eq!(closed.end, Some(1_000));
        assert!(log.close_open(2_000).is_none());
    }

    #[test]
    fn test_push_open_refuses_second_open_session() {
        let mut log = DayLog::new();
        log.push_open("A", 0).unwrap();
        assert_eq!(log.push_open("B", 1), Err("A".to_string()));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_invariant_holds_across_operations() {
        enum Op {
            Ensure,
            Switch(&'static str),
            Close,
        }

        let ops = [
            Op::Ensure,
            Op::Switch("A"),
            Op::Close,
            Op::Close,
            Op::Ensure,
            Op::Ensure,
            Op::Switch("B"),
            Op::Switch(IDLE_LABEL),
            Op::Close,
            Op::Switch("C"),
        ];

        let mut log = DayLog::new();
        for (i, op) in ops.iter().enumerate() {
            let now = i as i64 * 1_000;
            match op {
                Op::Ensure => {
                    log.ensure_open(IDLE_LABEL, now);
                }
                Op::Switch(label) => {
                    log.switch_to(label, now);
                }
                Op::Close => {
                    log.close_open(now);
                }
            }
            assert!(log.is_well_formed(), "broken after step {}: {:?}", i, log);
        }
    }

    #[test]
    fn test_reset_to_idle_discards_history() {
        let mut log = DayLog::new();
        for (i, label) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            log.switch_to(label, i as i64);
        }
        log.reset_to_idle(IDLE_LABEL, 99);
        assert_eq!(log.sessions(), &[Session::open(IDLE_LABEL, 99)]);
    }

    #[test]
    fn test_day_key_and_hhmm_use_local_time() {
        let at = Local.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(day_key(&at), "2025-03-07");
        assert_eq!(format_hhmm(at.timestamp_millis()), "09:05");
    }
}
