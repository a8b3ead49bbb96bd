use super::store::KeyValueStore;
use crate::domain::FilterKind;
use crate::error::StoreError;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Storage key of the completion-popup preference
pub const COMPLETION_POPUP_KEY: &str = "chronolog.completionPopupEnabled";

/// Completion popups are on until the user turns them off
pub const COMPLETION_POPUP_DEFAULT: bool = true;

/// Anything but an explicit `false` means enabled
pub fn normalize_completion_popup(value: Option<&Value>) -> bool {
    match value {
        None => COMPLETION_POPUP_DEFAULT,
        Some(v) => v.as_bool() != Some(false),
    }
}

/// Read a filter toggle; missing or non-boolean values read as off
pub async fn load_filter(store: &dyn KeyValueStore, kind: FilterKind) -> Result<bool, StoreError> {
    let value = store.get_one(kind.storage_key()).await?;
    Ok(matches!(value, Some(Value::Bool(true))))
}

pub async fn save_filter(
    store: &dyn KeyValueStore,
    kind: FilterKind,
    on: bool,
) -> Result<(), StoreError> {
    store.set_one(kind.storage_key(), Value::Bool(on)).await
}

pub async fn load_completion_popup(store: &dyn KeyValueStore) -> Result<bool, StoreError> {
    let value = store.get_one(COMPLETION_POPUP_KEY).await?;
    Ok(normalize_completion_popup(value.as_ref()))
}

pub async fn save_completion_popup(store: &dyn KeyValueStore, on: bool) -> Result<(), StoreError> {
    store.set_one(COMPLETION_POPUP_KEY, Value::Bool(on)).await
}

/// In-memory copy of the completion-popup preference, kept current by store change events
#[derive(Clone)]
pub struct CompletionPopupPreference {
    enabled: Arc<AtomicBool>,
}

impl CompletionPopupPreference {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Load the stored value, falling back to the default if the store is unreadable
    pub async fn load(store: &dyn KeyValueStore) -> Self {
        let enabled = match load_completion_popup(store).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read completion popup preference");
                COMPLETION_POPUP_DEFAULT
            }
        };
        Self::new(enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Follow store changes to the preference key until the store goes away
    pub fn spawn_listener(&self, store: &dyn KeyValueStore) -> JoinHandle<()> {
        let mut changes = store.changes();
        let pref = self.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key == COMPLETION_POPUP_KEY => {
                        let enabled = normalize_completion_popup(Some(&change.new_value));
                        tracing::debug!(enabled, "Completion popup preference changed");
                        pref.set(enabled);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed store change notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_normalize_completion_popup() {
        assert!(normalize_completion_popup(None));
        assert!(normalize_completion_popup(Some(&json!(true))));
        assert!(normalize_completion_popup(Some(&json!(null))));
        assert!(normalize_completion_popup(Some(&json!("no"))));
        assert!(!normalize_completion_popup(Some(&json!(false))));
    }

    #[tokio::test]
    async fn test_filter_toggles_are_independent() {
        let store = MemoryStore::new();
        assert!(!load_filter(&store, FilterKind::Future).await.unwrap());

        save_filter(&store, FilterKind::Future, true).await.unwrap();
        assert!(load_filter(&store, FilterKind::Future).await.unwrap());
        assert!(!load_filter(&store, FilterKind::Recurring).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_boolean_filter_reads_as_off() {
        let store = MemoryStore::new().with_value(FilterKind::Recurring.storage_key(), json!("1"));
        assert!(!load_filter(&store, FilterKind::Recurring).await.unwrap());
    }

    #[tokio::test]
    async fn test_preference_defaults_when_store_unavailable() {
        let store = MemoryStore::new().with_value(COMPLETION_POPUP_KEY, json!(false));
        store.set_available(false);
        assert!(CompletionPopupPreference::load(&store).await.is_enabled());
    }

    #[tokio::test]
    async fn test_preference_follows_change_events() {
        let store = MemoryStore::new();
        let pref = CompletionPopupPreference::load(&store).await;
        assert!(pref.is_enabled());

        let listener = pref.spawn_listener(&store);
        save_completion_popup(&store, false).await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!pref.is_enabled());

        store.set_one("unrelated", json!(true)).await.unwrap();
        save_completion_popup(&store, true).await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(pref.is_enabled());
        listener.abort();
    }
}
