use crate::domain::decode;
use crate::error::RenameError;
use crate::page::{
    wait_for, HostPage, Key, Locator, NodeId, PageEvent, Selector, WaitOutcome, WaitPolicy,
};
use std::sync::Arc;

pub const TITLE_CONTROL: &[Selector] = &[
    Selector::new("button.taskItem-titleWrapper"),
    Selector::new(".taskItem-titleWrapper"),
];
pub const ROW_TITLE: Selector = Selector::new(".taskItem-title");
pub const EDIT_BUTTON: Selector = Selector::new(".editableContent-editButton");
pub const EDIT_PANE: Selector = Selector::new(".editableContent");
pub const EDITOR_FIELD: &[Selector] = &[
    Selector::new(r#"input[type="text"]"#),
    Selector::new("textarea"),
    Selector::new(r#"[contenteditable="true"]"#),
];
pub const CLOSE_BUTTON: Selector = Selector::new(".detailFooter-close");

/// Renames a task by clicking through the host page's detail pane
///
/// Every step that depends on the page reacting is bounded by the wait policy, and nothing is
/// written unless both the editor and the row still show the task we started from.
#[derive(Clone)]
pub struct RenameAutomation {
    page: Arc<dyn HostPage>,
    policy: WaitPolicy,
}

impl RenameAutomation {
    pub fn new(page: Arc<dyn HostPage>, policy: WaitPolicy) -> Self {
        Self { page, policy }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Current title text of a task row
    pub fn row_title(&self, row: NodeId) -> Option<String> {
        self.page
            .query(row, &ROW_TITLE)
            .map(|title| self.page.text(title))
    }

    /// Replace the title of `row` with `new_title`
    ///
    /// `expected_base` is the base title captured before the flow started; both the editor and
    /// the row must still decode to it.
    pub async fn rename(
        &self,
        row: NodeId,
        expected_base: &str,
        new_title: &str,
    ) -> Result<(), RenameError> {
        let page = &*self.page;

        let control = Locator::new("title control", TITLE_CONTROL.iter().cloned())
            .find(page, row)
            .ok_or(RenameError::NotFound("title control"))?;
        page.click(control);

        let edit_button = self
            .await_element(page.root(), &Locator::single("edit button", EDIT_BUTTON))
            .await?;
        let pane = page
            .closest(edit_button, &EDIT_PANE)
            .or_else(|| page.parent(edit_button))
            .ok_or(RenameError::NotFound("detail pane"))?;
        page.click(edit_button);

        let editor = self
            .await_element(pane, &Locator::new("editor field", EDITOR_FIELD.iter().cloned()))
            .await?;

        let editor_text = self.editor_text(editor);
        let row_text = self.row_title(row).unwrap_or_default();
        let editor_base = decode(&editor_text).base_title;
        let row_base = decode(&row_text).base_title;
        if editor_base != expected_base || row_base != expected_base {
            tracing::warn!(
                expected = expected_base,
                editor = %editor_base,
                row = %row_base,
                "Detail pane shows a different task, not renaming"
            );
            return Err(RenameError::IdentityMismatch {
                expected: expected_base.to_string(),
                editor: editor_text,
                row: row_text,
            });
        }

        self.commit(editor, new_title);

        match page.query(page.root(), &CLOSE_BUTTON) {
            Some(close) => page.click(close),
            None => tracing::debug!("No close button on detail pane"),
        }

        tracing::debug!(title = new_title, "Task renamed");
        Ok(())
    }

    async fn await_element(
        &self,
        scope: NodeId,
        locator: &Locator,
    ) -> Result<NodeId, RenameError> {
        match wait_for(&*self.page, scope, locator, self.policy).await {
            WaitOutcome::Found(node) => Ok(node),
            WaitOutcome::TimedOut => Err(RenameError::Timeout {
                what: locator.name(),
                waited: self.policy.timeout,
            }),
        }
    }

    fn is_form_control(&self, node: NodeId) -> bool {
        matches!(self.page.tag(node).as_deref(), Some("input") | Some("textarea"))
    }

    fn editor_text(&self, editor: NodeId) -> String {
        if self.is_form_control(editor) {
            self.page.value(editor).unwrap_or_default()
        } else {
            self.page.text(editor)
        }
    }

    /// Write the value and replay the events the host editor listens for
    fn commit(&self, editor: NodeId, new_title: &str) {
        let page = &*self.page;
        if self.is_form_control(editor) {
            page.set_value(editor, new_title);
        } else {
            page.set_text(editor, new_title);
        }
        page.focus(editor);
        page.dispatch(editor, PageEvent::Input);
        page.dispatch(editor, PageEvent::Change);
        page.dispatch(editor, PageEvent::KeyDown(Key::Enter));
        page.dispatch(editor, PageEvent::KeyUp(Key::Enter));
        page.blur(editor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::sim::EditorKind;
    use crate::page::{SimulatedTodoApp, TaskSpec};
    use std::time::Duration;
    use tokio::time::Instant;

    fn fixture() -> (Arc<SimulatedTodoApp>, RenameAutomation) {
        let app = Arc::new(SimulatedTodoApp::new(
            "Work",
            &[
                TaskSpec::new("Write report [1h]"),
                TaskSpec::new("Review PR"),
            ],
        ));
        let automation = RenameAutomation::new(app.clone(), WaitPolicy::default());
        (app, automation)
    }

    #[tokio::test(start_paused = true)]
    async fn test_renames_through_detail_pane() {
        let (app, automation) = fixture();
        let row = app.rows()[0];
        automation
            .rename(row, "Write report", "Write report [1h 23m]")
            .await
            .unwrap();
        assert_eq!(app.title(row), "Write report [1h 23m]");
        assert!(!app.detail_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contenteditable_editor() {
        let (app, automation) = fixture();
        app.set_editor_kind(EditorKind::ContentEditable);
        let row = app.rows()[1];
        automation
            .rename(row, "Review PR", "Review PR [5m]")
            .await
            .unwrap();
        assert_eq!(app.title(row), "Review PR [5m]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_mismatch_writes_nothing() {
        let (app, automation) = fixture();
        app.set_misroute(true);
        let rows = app.rows();

        let err = automation
            .rename(rows[0], "Write report", "Write report [1h 23m]")
            .await
            .unwrap_err();

        assert!(matches!(err, RenameError::IdentityMismatch { ref editor, .. } if editor == "Review PR"));
        assert_eq!(app.titles(), vec!["Write report [1h]", "Review PR"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_edit_button_times_out() {
        let (app, automation) = fixture();
        app.set_edit_affordance(false);
        let started = Instant::now();

        let err = automation
            .rename(app.rows()[1], "Review PR", "Review PR [5m]")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RenameError::Timeout {
                what: "edit button",
                waited: Duration::from_millis(2000)
            }
        );
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(app.title(app.rows()[1]), "Review PR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_late_edit_button() {
        let (app, automation) = fixture();
        app.set_edit_affordance(false);
        let row = app.rows()[1];

        let revealer = app.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            revealer.reveal_edit_button();
        });

        automation
            .rename(row, "Review PR", "Review PR [5m]")
            .await
            .unwrap();
        assert_eq!(app.title(row), "Review PR [5m]");
    }

    #[tokio::test]
    async fn test_row_without_title_control() {
        let (app, automation) = fixture();
        let stray = app.page().append_element(app.page().body(), "div", &[], None);
        let err = automation.rename(stray, "x", "x [1m]").await.unwrap_err();
        assert_eq!(err, RenameError::NotFound("title control"));
    }
}
