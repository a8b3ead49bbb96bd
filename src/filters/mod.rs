//! Hide-upcoming and hide-recurring filters.
//!
//! Classification is stateless and re-run whenever something inside a task changes. The on/off
//! state is persisted per filter and mirrored on the page by marker classes and toolbar buttons.

pub mod classifier;
pub mod toolbar;

pub use classifier::{apply_all, apply_filters, classify_task, Classification, FilterState};

use crate::domain::FilterKind;
use crate::error::StoreError;
use crate::page::{watch, HostPage, Locator, NodeId, Selector, WatchOptions};
use crate::persistence::{load_filter, save_filter, KeyValueStore};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

fn task_region() -> Locator {
    Locator::new(
        "task region",
        [Selector::new(".tasks"), Selector::new("#root")],
    )
}

/// Persisted filter toggles bound to a page
pub struct FilterToggles {
    page: Arc<dyn HostPage>,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<FilterState>,
}

impl FilterToggles {
    /// Read the stored toggles; unreadable values count as off
    pub async fn load(page: Arc<dyn HostPage>, store: Arc<dyn KeyValueStore>) -> Self {
        let mut state = FilterState::default();
        for kind in FilterKind::all() {
            match load_filter(&*store, *kind).await {
                Ok(on) => state.set(*kind, on),
                Err(e) => {
                    tracing::warn!(filter = kind.name(), error = %e, "Could not read filter state")
                }
            }
        }
        Self {
            page,
            store,
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> FilterState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply the current state to every task, the root element and the buttons
    pub fn refresh(&self) -> usize {
        let state = self.state();
        let page = &*self.page;
        for kind in FilterKind::all() {
            toolbar::sync_button(page, *kind, state.is_on(*kind));
        }
        apply_all(page, &state)
    }

    /// Turn a filter on or off, persist it and re-apply
    pub async fn set(&self, kind: FilterKind, on: bool) -> Result<(), StoreError> {
        save_filter(&*self.store, kind, on).await?;
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set(kind, on);
        self.refresh();
        tracing::info!(filter = kind.name(), on, "Filter toggled");
        Ok(())
    }

    /// Flip a filter; returns the new state
    pub async fn toggle(&self, kind: FilterKind) -> Result<bool, StoreError> {
        let on = !self.state().is_on(kind);
        self.set(kind, on).await?;
        Ok(on)
    }

    /// Handle a click anywhere on the page; returns the filter it toggled
    pub async fn handle_click(&self, node: NodeId) -> Result<Option<FilterKind>, StoreError> {
        let Some(kind) = toolbar::button_kind(&*self.page, node) else {
            return Ok(None);
        };
        self.toggle(kind).await?;
        Ok(Some(kind))
    }

    /// Insert the toolbar buttons if the toolbar is there
    pub fn insert_buttons(&self) -> bool {
        let inserted = toolbar::insert_buttons(&*self.page);
        if inserted {
            let state = self.state();
            for kind in FilterKind::all() {
                toolbar::sync_button(&*self.page, *kind, state.is_on(*kind));
            }
        }
        inserted
    }

    /// Initial pass plus background re-classification and deferred button insertion
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.refresh();

        let page = self.page.clone();
        let region = task_region()
            .find(&*page, page.root())
            .unwrap_or_else(|| page.root());
        let mut changed = watch(
            page.clone(),
            region,
            classifier::TASK,
            WatchOptions {
                inner_changes: true,
            },
        );
        let mut added = (!self.insert_buttons()).then(|| {
            watch(
                page.clone(),
                page.root(),
                Selector::new("*"),
                WatchOptions::default(),
            )
        });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(task) = changed.recv() => {
                        apply_filters(&*self.page, task, &self.state());
                    }
                    Some(_) = next_added(&mut added) => {
                        if self.insert_buttons() {
                            tracing::debug!("Toolbar appeared, filter buttons inserted");
                            added = None;
                        }
                    }
                    else => break,
                }
            }
        })
    }
}

async fn next_added(added: &mut Option<UnboundedReceiver<NodeId>>) -> Option<NodeId> {
    match added {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{DueState, SimulatedTodoApp, TaskSpec};
    use crate::persistence::MemoryStore;
    use serde_json::json;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_load_reads_persisted_toggles() {
        let app = Arc::new(SimulatedTodoApp::new("Work", &[]));
        let store = Arc::new(
            MemoryStore::new()
                .with_value(FilterKind::Recurring.storage_key(), json!(true)),
        );
        let toggles = FilterToggles::load(app, store).await;
        assert_eq!(
            toggles.state(),
            FilterState {
                hide_future: false,
                hide_recurring: true
            }
        );
    }

    #[tokio::test]
    async fn test_button_click_toggles_and_persists() {
        let app = Arc::new(SimulatedTodoApp::new(
            "Work",
            &[TaskSpec::new("Later").due(DueState::Later)],
        ));
        let store = Arc::new(MemoryStore::new());
        let toggles = FilterToggles::load(app.clone(), store.clone()).await;
        assert!(toggles.insert_buttons());

        let button = toolbar::find_button(&*app, FilterKind::Future).unwrap();
        assert_eq!(
            toggles.handle_click(button).await.unwrap(),
            Some(FilterKind::Future)
        );

        let task = app.query(app.root(), &classifier::TASK).unwrap();
        assert!(app.has_class(task, "chronolog-future-task"));
        assert!(app.has_class(button, toolbar::SELECTED_CLASS));
        assert_eq!(store.snapshot().get("chronolog.hideFuture"), Some(&json!(true)));

        assert!(!toggles.toggle(FilterKind::Future).await.unwrap());
        assert!(!app.has_class(task, "chronolog-future-task"));
        assert_eq!(toggles.handle_click(app.root()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_state() {
        let app = Arc::new(SimulatedTodoApp::new("Work", &[]));
        let store = Arc::new(MemoryStore::new());
        let toggles = FilterToggles::load(app, store.clone()).await;
        store.set_available(false);
        assert!(toggles.toggle(FilterKind::Recurring).await.is_err());
        assert!(!toggles.state().hide_recurring);
    }

    #[tokio::test]
    async fn test_background_reclassification_and_late_toolbar() {
        let app = Arc::new(SimulatedTodoApp::without_toolbar("Work", &[]));
        let store = Arc::new(
            MemoryStore::new().with_value(FilterKind::Future.storage_key(), json!(true)),
        );
        let toggles = Arc::new(FilterToggles::load(app.clone(), store).await);
        let handle = toggles.clone().spawn();

        let row = app.add_task(&TaskSpec::new("Later").due(DueState::Later));
        settle().await;
        let task = app.query(app.root(), &classifier::TASK).unwrap();
        assert!(app.has_class(task, "chronolog-future-task"));

        app.set_due(row, Some(DueState::Today));
        settle().await;
        assert!(!app.has_class(task, "chronolog-future-task"));

        assert!(toolbar::find_button(&*app, FilterKind::Future).is_none());
        app.mount_toolbar();
        settle().await;
        let button = toolbar::find_button(&*app, FilterKind::Future).unwrap();
        assert!(app.has_class(button, toolbar::SELECTED_CLASS));
        assert!(app.has_class(app.root(), "chronolog-hide-future"));
        handle.abort();
    }
}
