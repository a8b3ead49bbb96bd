use crate::domain::FilterKind;
use crate::page::{HostPage, Locator, NodeId, Selector};

pub const TASK: Selector = Selector::new(".taskItem");
const DATE: Selector = Selector::new(".taskItemInfo-date");
const DUE_NOW_CLASSES: [&str; 2] = ["overdue", "dueToday"];

fn recurrence_indicator() -> Locator {
    Locator::new(
        "recurrence indicator",
        [
            Selector::new(".taskItemInfo-recurring"),
            Selector::new(".taskItemInfo .ms-Icon--RepeatAll"),
        ],
    )
}

/// What a task looks like to the filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Has a due date that is neither overdue nor today
    pub future: bool,
    pub recurring: bool,
}

impl Classification {
    pub fn is(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Future => self.future,
            FilterKind::Recurring => self.recurring,
        }
    }
}

/// On/off state of every filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub hide_future: bool,
    pub hide_recurring: bool,
}

impl FilterState {
    pub fn is_on(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::Future => self.hide_future,
            FilterKind::Recurring => self.hide_recurring,
        }
    }

    pub fn set(&mut self, kind: FilterKind, on: bool) {
        match kind {
            FilterKind::Future => self.hide_future = on,
            FilterKind::Recurring => self.hide_recurring = on,
        }
    }
}

pub fn classify_task(page: &dyn HostPage, task: NodeId) -> Classification {
    let future = page.query(task, &DATE).is_some_and(|date| {
        !DUE_NOW_CLASSES
            .iter()
            .any(|class| page.has_class(date, class))
    });
    let recurring = recurrence_indicator().find(page, task).is_some();
    Classification { future, recurring }
}

/// Set the marker classes of one task; safe to run any number of times
pub fn apply_filters(page: &dyn HostPage, task: NodeId, state: &FilterState) -> Classification {
    let class = classify_task(page, task);
    for kind in FilterKind::all() {
        page.toggle_class(task, kind.task_class(), state.is_on(*kind) && class.is(*kind));
    }
    class
}

/// Mirror the filter state on the root element and re-mark every task
pub fn apply_all(page: &dyn HostPage, state: &FilterState) -> usize {
    let root = page.root();
    for kind in FilterKind::all() {
        page.toggle_class(root, kind.root_class(), state.is_on(*kind));
    }
    let tasks = page.query_all(root, &TASK);
    for task in &tasks {
        apply_filters(page, *task, state);
    }
    tracing::debug!(tasks = tasks.len(), ?state, "Filters applied");
    tasks.len()
}
