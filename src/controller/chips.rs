//! Work chips and the per-row Working marker.

use crate::domain::{decode, Session, WorkState};
use crate::page::{HostPage, InsertPosition, NodeId, Selector};

pub const ROW: Selector = Selector::new(".taskItem-body");
pub const WORKING_ROWS: Selector = Selector::new(".taskItem-body.is-working");
pub const CHIP: Selector = Selector::new(".work-chip");
pub const LIST_TITLE: Selector = Selector::new(".listTitle");

pub const CHIP_CLASS: &str = "work-chip";
pub const CHIP_DISABLED_CLASS: &str = "work-chip--disabled";
pub const WORKING_CLASS: &str = "is-working";
pub const START_ATTR: &str = "data-work-start";

pub const DEFAULT_LIST_NAME: &str = "Tasks";

const CHIP_IDLE_TEXT: &str = "▶";
const CHIP_WORKING_TEXT: &str = "■";

pub fn row_state(page: &dyn HostPage, row: NodeId) -> WorkState {
    if page.has_class(row, WORKING_CLASS) {
        WorkState::Working
    } else {
        WorkState::Idle
    }
}

/// Start timestamp recorded on a Working row
pub fn row_start(page: &dyn HostPage, row: NodeId) -> Option<i64> {
    page.attribute(row, START_ATTR)?.parse().ok()
}

pub fn chip_of(page: &dyn HostPage, row: NodeId) -> Option<NodeId> {
    page.query(row, &CHIP)
}

/// Mark a row Working (with its start) or Idle and update its chip to match
pub fn set_row_state(page: &dyn HostPage, row: NodeId, state: WorkState, start: Option<i64>) {
    let working = state.is_working();
    page.toggle_class(row, WORKING_CLASS, working);
    let start = start.filter(|_| working).map(|s| s.to_string());
    page.set_attribute(row, START_ATTR, start.as_deref());

    if let Some(chip) = chip_of(page, row) {
        page.set_text(chip, if working { CHIP_WORKING_TEXT } else { CHIP_IDLE_TEXT });
        page.set_attribute(chip, "aria-pressed", Some(if working { "true" } else { "false" }));
    }
}

pub fn set_chips_disabled(page: &dyn HostPage, disabled: bool) {
    for chip in page.query_all(page.root(), &CHIP) {
        page.toggle_class(chip, CHIP_DISABLED_CLASS, disabled);
    }
}

/// Name of the task list shown on the page
pub fn list_name(page: &dyn HostPage) -> String {
    page.query(page.root(), &LIST_TITLE)
        .map(|title| page.text(title))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string())
}

/// Log identity of a task: `<list>::<base title>`
pub fn work_key(page: &dyn HostPage, base_title: &str) -> String {
    format!("{}::{}", list_name(page), base_title)
}

/// Give a row its chip, restoring Working if `open` is this row's session
///
/// Only the first row matching the open session is restored, so at most one row is Working.
/// `busy` creates the chip disabled. Returns `false` if the row already had a chip.
pub fn augment_row(
    page: &dyn HostPage,
    row: NodeId,
    title: Option<&str>,
    open: Option<&Session>,
    busy: bool,
) -> bool {
    if chip_of(page, row).is_some() {
        return false;
    }

    let chip = page.create_element("button");
    page.toggle_class(chip, CHIP_CLASS, true);
    page.toggle_class(chip, CHIP_DISABLED_CLASS, busy);
    page.set_attribute(chip, "type", Some("button"));
    page.set_attribute(chip, "title", Some("Start/stop tracking"));
    page.insert(row, chip, InsertPosition::Prepend);

    let already_working = page.query(page.root(), &WORKING_ROWS).is_some();
    let restored = match (title, open) {
        (Some(title), Some(session))
            if !already_working && decode(title).base_title == session.label =>
        {
            tracing::debug!(label = %session.label, "Restoring Working row");
            Some(session.start)
        }
        _ => None,
    };
    match restored {
        Some(start) => set_row_state(page, row, WorkState::Working, Some(start)),
        None => set_row_state(page, row, row_state(page, row), row_start(page, row)),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{SimulatedTodoApp, TaskSpec};

    fn app() -> SimulatedTodoApp {
        SimulatedTodoApp::new("Work", &[TaskSpec::new("A [5m]"), TaskSpec::new("B")])
    }

    #[test]
    fn test_augment_is_idempotent() {
        let app = app();
        let row = app.rows()[0];
        assert!(augment_row(&app, row, Some("A [5m]"), None, false));
        assert!(!augment_row(&app, row, Some("A [5m]"), None, false));
        assert_eq!(app.query_all(row, &CHIP).len(), 1);
        assert_eq!(row_state(&app, row), WorkState::Idle);
        assert_eq!(app.title(row), "A [5m]");
    }

    #[test]
    fn test_augment_restores_open_session() {
        let app = app();
        let rows = app.rows();
        let open = Session::open("A", 1_000);
        augment_row(&app, rows[0], Some("A [5m]"), Some(&open), false);
        augment_row(&app, rows[1], Some("B"), Some(&open), false);

        assert_eq!(row_state(&app, rows[0]), WorkState::Working);
        assert_eq!(row_start(&app, rows[0]), Some(1_000));
        assert_eq!(row_state(&app, rows[1]), WorkState::Idle);
    }

    #[test]
    fn test_restore_only_first_row_with_same_base_title() {
        let app = SimulatedTodoApp::new("Work", &[TaskSpec::new("A"), TaskSpec::new("A [5m]")]);
        let rows = app.rows();
        let open = Session::open("A", 1_000);
        augment_row(&app, rows[0], Some("A"), Some(&open), false);
        augment_row(&app, rows[1], Some("A [5m]"), Some(&open), false);

        assert_eq!(app.query_all(app.root(), &WORKING_ROWS), vec![rows[0]]);
        assert_eq!(row_state(&app, rows[1]), WorkState::Idle);
        assert_eq!(row_start(&app, rows[1]), None);
    }

    #[test]
    fn test_chip_created_while_busy_is_disabled() {
        let app = app();
        let rows = app.rows();
        augment_row(&app, rows[0], Some("A [5m]"), None, true);
        augment_row(&app, rows[1], Some("B"), None, false);

        let busy_chip = chip_of(&app, rows[0]).unwrap();
        assert!(app.has_class(busy_chip, CHIP_DISABLED_CLASS));
        let chip = chip_of(&app, rows[1]).unwrap();
        assert!(!app.has_class(chip, CHIP_DISABLED_CLASS));
    }

    #[test]
    fn test_row_state_round_trips_through_markup() {
        let app = app();
        let row = app.rows()[1];
        augment_row(&app, row, Some("B"), None, false);

        set_row_state(&app, row, WorkState::Working, Some(42));
        assert!(app.has_class(row, WORKING_CLASS));
        assert_eq!(row_start(&app, row), Some(42));
        assert_eq!(app.query_all(app.root(), &WORKING_ROWS), vec![row]);

        set_row_state(&app, row, WorkState::Idle, Some(42));
        assert_eq!(row_start(&app, row), None);
        assert!(app.query_all(app.root(), &WORKING_ROWS).is_empty());
    }

    #[test]
    fn test_work_key_uses_list_title() {
        let app = app();
        assert_eq!(work_key(&app, "A"), "Work::A");
        assert_eq!(list_name(&crate::page::MemoryPage::new()), "Tasks");
    }
}
