use super::store::KeyValueStore;
use crate::domain::{day_key, Clock, DayLog, LogBook, Session};
use crate::error::{LogError, StoreError};
use serde_json::Value;
use std::sync::Arc;

/// Storage key of the date-partitioned session log
pub const LOGS_KEY: &str = "chronolog.logs";

/// Append-only, date-partitioned session log kept in a key-value store
///
/// Each operation reads the whole log book, changes today's day log and writes the book back.
#[derive(Clone)]
pub struct SessionLogStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    idle_label: String,
}

impl SessionLogStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        idle_label: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            idle_label: idle_label.into(),
        }
    }

    pub fn idle_label(&self) -> &str {
        &self.idle_label
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Date key for "now"
    pub fn today_key(&self) -> String {
        day_key(&self.clock.now())
    }

    /// Read the full log book
    pub async fn load(&self) -> Result<LogBook, StoreError> {
        match self.store.get_one(LOGS_KEY).await? {
            None | Some(Value::Null) => Ok(LogBook::new()),
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                key: LOGS_KEY.to_string(),
                source,
            }),
        }
    }

    async fn save(&self, book: &LogBook) -> Result<(), StoreError> {
        let value = serde_json::to_value(book).map_err(|source| StoreError::Corrupt {
            key: LOGS_KEY.to_string(),
            source,
        })?;
        self.store.set_one(LOGS_KEY, value).await
    }

    /// Read-modify-write today's day log
    async fn update_today<T>(
        &self,
        f: impl FnOnce(&mut DayLog, i64) -> Result<(T, bool), LogError>,
    ) -> Result<T, LogError> {
        let now = self.clock.now();
        let key = day_key(&now);
        let mut book = self.load().await?;
        let day = book.entry(key).or_default();
        let (result, changed) = f(day, now.timestamp_millis())?;
        if changed {
            self.save(&book).await?;
        }
        Ok(result)
    }

    /// Today's sessions
    pub async fn today(&self) -> Result<DayLog, StoreError> {
        self.day_log(&self.today_key()).await
    }

    /// Sessions for a specific date key
    pub async fn day_log(&self, key: &str) -> Result<DayLog, StoreError> {
        let mut book = self.load().await?;
        Ok(book.remove(key).unwrap_or_default())
    }

    /// The open session of today, if any
    pub async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.today().await?.open_session().cloned())
    }

    /// Push a new open session onto today's log
    pub async fn append_session(&self, label: &str, start: i64) -> Result<(), LogError> {
        self.update_today(|day, _| {
            day.push_open(label, start)
                .map_err(|label| LogError::OpenSessionExists { label })?;
            Ok(((), true))
        })
        .await?;
        tracing::debug!(label, start, "Session appended");
        Ok(())
    }

    /// Close today's open session at `end`, returning it
    pub async fn end_open_session(&self, end: i64) -> Result<Option<Session>, LogError> {
        let closed = self
            .update_today(|day, _| {
                let closed = day.close_open(end);
                let changed = closed.is_some();
                Ok((closed, changed))
            })
            .await?;
        if let Some(session) = &closed {
            tracing::debug!(label = %session.label, "Session closed");
        }
        Ok(closed)
    }

    /// Open a session with `default_label` unless one is already open
    pub async fn ensure_open_session(&self, default_label: &str) -> Result<bool, LogError> {
        let opened = self
            .update_today(|day, now| {
                let opened = day.ensure_open(default_label, now);
                Ok((opened, opened))
            })
            .await?;
        if opened {
            tracing::debug!(label = default_label, "Opened session on empty or closed log");
        }
        Ok(opened)
    }

    /// Close the open session and open `label` at the same instant, in one write
    pub async fn switch_session(&self, label: &str) -> Result<Option<Session>, LogError> {
        let closed = self
            .update_today(|day, now| Ok((day.switch_to(label, now), true)))
            .await?;
        tracing::info!(
            from = closed.as_ref().map(|s| s.label.as_str()).unwrap_or("-"),
            to = label,
            "Session switched"
        );
        Ok(closed)
    }

    /// Replace today's log with a single open Idle session starting now
    pub async fn reset_today_preserve_idle(&self) -> Result<(), LogError> {
        let idle = self.idle_label.clone();
        self.update_today(|day, now| {
            day.reset_to_idle(&idle, now);
            Ok(((), true))
        })
        .await?;
        tracing::info!("Today's log reset to Idle");
        Ok(())
    }
}
