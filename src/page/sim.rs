//! A To-Do-like host page for demos and tests.
//!
//! Builds the same markup shape the real task list uses and reacts to clicks and key events the
//! way its title editor does: selecting a task opens a detail pane, the edit button turns the
//! title into an editor and Enter commits it back to the task.

use super::memory::MemoryPage;
use super::{HostPage, InsertPosition, Key, MutationSink, NodeId, PageEvent, Selector};
use crate::domain::decode;
use std::sync::{Mutex, MutexGuard};

const TITLE_WRAPPER: Selector = Selector::new(".taskItem-titleWrapper");
const ROW: Selector = Selector::new(".taskItem-body");
const TITLE: Selector = Selector::new(".taskItem-title");
const EDIT_BUTTON: Selector = Selector::new(".editableContent-editButton");
const EDITABLE: Selector = Selector::new(".editableContent");
const CLOSE_BUTTON: Selector = Selector::new(".detailFooter-close");
const DATE: Selector = Selector::new(".taskItemInfo-date");
const INFO: Selector = Selector::new(".taskItemInfo");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    Today,
    Later,
}

impl DueState {
    fn class(self) -> Option<&'static str> {
        match self {
            DueState::Overdue => Some("overdue"),
            DueState::Today => Some("dueToday"),
            DueState::Later => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DueState::Overdue => "Yesterday",
            DueState::Today => "Today",
            DueState::Later => "Tomorrow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub title: String,
    pub due: Option<DueState>,
    pub recurring: bool,
}

impl TaskSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            due: None,
            recurring: false,
        }
    }

    pub fn due(mut self, due: DueState) -> Self {
        self.due = Some(due);
        self
    }

    pub fn recurring(mut self) -> Self {
        self.recurring = true;
        self
    }
}

/// Which kind of field the edit button reveals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorKind {
    #[default]
    TextInput,
    TextArea,
    ContentEditable,
}

struct SimState {
    app: NodeId,
    list_title: NodeId,
    tasks: NodeId,
    selected: Option<NodeId>,
    details: Option<NodeId>,
    editor: Option<NodeId>,
    misroute: bool,
    edit_affordance: bool,
    editor_kind: EditorKind,
}

pub struct SimulatedTodoApp {
    page: MemoryPage,
    state: Mutex<SimState>,
}

impl SimulatedTodoApp {
    /// A list page with a view toolbar and the given tasks
    pub fn new(list_name: &str, tasks: &[TaskSpec]) -> Self {
        let app = Self::without_toolbar(list_name, tasks);
        app.mount_toolbar();
        app
    }

    /// Same page before the toolbar has rendered
    pub fn without_toolbar(list_name: &str, tasks: &[TaskSpec]) -> Self {
        let page = MemoryPage::new();
        let body = page.body();
        let app = page.append_element(body, "div", &["app"], None);
        page.set_attribute(app, "id", Some("root"));
        let list_title = page.append_element(app, "h2", &["listTitle"], Some(list_name));
        let task_list = page.append_element(app, "div", &["tasks"], None);

        let sim = Self {
            page,
            state: Mutex::new(SimState {
                app,
                list_title,
                tasks: task_list,
                selected: None,
                details: None,
                editor: None,
                misroute: false,
                edit_affordance: true,
                editor_kind: EditorKind::default(),
            }),
        };
        for task in tasks {
            sim.add_task(task);
        }
        sim
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn make(&self, tag: &str, classes: &[&str], text: Option<&str>) -> NodeId {
        let node = self.page.create_element(tag);
        for class in classes {
            self.page.toggle_class(node, class, true);
        }
        if let Some(text) = text {
            self.page.set_text(node, text);
        }
        node
    }

    fn append(&self, parent: NodeId, child: NodeId) -> NodeId {
        self.page.insert(parent, child, InsertPosition::Append);
        child
    }

    /// Render the view toolbar after the list title; returns the list-view button
    pub fn mount_toolbar(&self) -> NodeId {
        let list_title = self.lock().list_title;
        let toolbar = self.make("div", &["toolbar"], None);
        self.page.set_attribute(toolbar, "role", Some("toolbar"));
        let toggle = self.append(toolbar, self.make("div", &["gridViewToggle"], None));
        let group = self.append(toggle, self.make("div", &["toolbarButton-group"], None));
        let button = self.append(
            group,
            self.make("button", &["toolbarButton", "listButton"], Some("List")),
        );
        self.page.insert(list_title, toolbar, InsertPosition::After);
        button
    }

    /// Append a task to the list; returns its row (`.taskItem-body`)
    pub fn add_task(&self, spec: &TaskSpec) -> NodeId {
        let tasks = self.lock().tasks;
        let item = self.make("div", &["taskItem"], None);
        let row = self.append(item, self.make("div", &["taskItem-body"], None));
        let wrapper = self.append(row, self.make("button", &["taskItem-titleWrapper"], None));
        self.append(
            wrapper,
            self.make("span", &["taskItem-title"], Some(&spec.title)),
        );
        let info = self.append(row, self.make("div", &["taskItemInfo"], None));
        if let Some(due) = spec.due {
            self.append(info, self.date_badge(due));
        }
        if spec.recurring {
            self.append(info, self.make("span", &["taskItemInfo-recurring"], None));
        }
        self.page.insert(tasks, item, InsertPosition::Append);
        row
    }

    fn date_badge(&self, due: DueState) -> NodeId {
        let mut classes = vec!["taskItemInfo-date"];
        classes.extend(due.class());
        self.make("span", &classes, Some(due.label()))
    }

    /// Change a task's due date in place
    pub fn set_due(&self, row: NodeId, due: Option<DueState>) {
        let Some(info) = self.page.query(row, &INFO) else {
            return;
        };
        if let Some(date) = self.page.query(info, &DATE) {
            match due {
                Some(due) => {
                    self.page
                        .toggle_class(date, "overdue", due == DueState::Overdue);
                    self.page.toggle_class(date, "dueToday", due == DueState::Today);
                    self.page.set_text(date, due.label());
                }
                None => self.page.remove(date),
            }
        } else if let Some(due) = due {
            let badge = self.date_badge(due);
            self.page.insert(info, badge, InsertPosition::Prepend);
        }
    }

    pub fn page(&self) -> &MemoryPage {
        &self.page
    }

    /// The `#root` application element
    pub fn app_root(&self) -> NodeId {
        self.lock().app
    }

    pub fn rows(&self) -> Vec<NodeId> {
        self.page.query_all(self.page.root(), &ROW)
    }

    /// First row whose title decodes to `base`
    pub fn row_titled(&self, base: &str) -> Option<NodeId> {
        self.rows()
            .into_iter()
            .find(|row| decode(&self.title(*row)).base_title == base)
    }

    /// Current visible title of a row
    pub fn title(&self, row: NodeId) -> String {
        self.page
            .query(row, &TITLE)
            .map(|t| self.page.text(t))
            .unwrap_or_default()
    }

    pub fn titles(&self) -> Vec<String> {
        self.rows().into_iter().map(|row| self.title(row)).collect()
    }

    pub fn detail_open(&self) -> bool {
        self.lock().details.is_some()
    }

    /// Selecting a task opens the detail pane of the next task instead
    pub fn set_misroute(&self, on: bool) {
        self.lock().misroute = on;
    }

    /// Whether the detail pane renders its edit button
    pub fn set_edit_affordance(&self, on: bool) {
        self.lock().edit_affordance = on;
    }

    pub fn set_editor_kind(&self, kind: EditorKind) {
        self.lock().editor_kind = kind;
    }

    /// Render the edit button into an open detail pane that lacks one
    pub fn reveal_edit_button(&self) -> Option<NodeId> {
        let details = self.lock().details?;
        if self.page.query(details, &EDIT_BUTTON).is_some() {
            return None;
        }
        let editable = self.page.query(details, &EDITABLE)?;
        Some(self.append(
            editable,
            self.make("button", &["editableContent-editButton"], None),
        ))
    }

    fn select(&self, row: NodeId) {
        let (target, app, previous, edit_affordance) = {
            let state = self.lock();
            let target = if state.misroute {
                let rows = self.rows();
                let index = rows.iter().position(|r| *r == row).unwrap_or(0);
                rows.get((index + 1) % rows.len().max(1))
                    .copied()
                    .unwrap_or(row)
            } else {
                row
            };
            (target, state.app, state.details, state.edit_affordance)
        };
        if let Some(previous) = previous {
            self.page.remove(previous);
        }

        let title = self.title(target);
        let details = self.make("div", &["details"], None);
        let editable = self.append(details, self.make("div", &["editableContent"], None));
        self.append(
            editable,
            self.make("span", &["editableContent-display"], Some(&title)),
        );
        if edit_affordance {
            self.append(
                editable,
                self.make("button", &["editableContent-editButton"], None),
            );
        }
        let footer = self.append(details, self.make("div", &["detailFooter"], None));
        self.append(footer, self.make("button", &["detailFooter-close"], None));
        self.page.insert(app, details, InsertPosition::Append);

        let mut state = self.lock();
        state.selected = Some(target);
        state.details = Some(details);
        state.editor = None;
    }

    fn open_editor(&self, edit_button: NodeId) {
        let (selected, kind) = {
            let state = self.lock();
            (state.selected, state.editor_kind)
        };
        let Some(selected) = selected else {
            return;
        };
        let Some(editable) = self.page.closest(edit_button, &EDITABLE) else {
            return;
        };
        let title = self.title(selected);
        let editor = match kind {
            EditorKind::TextInput => {
                let input = self.make("input", &[], None);
                self.page.set_attribute(input, "type", Some("text"));
                self.page.set_value(input, &title);
                input
            }
            EditorKind::TextArea => {
                let area = self.make("textarea", &[], None);
                self.page.set_value(area, &title);
                area
            }
            EditorKind::ContentEditable => {
                let div = self.make("div", &[], Some(&title));
                self.page.set_attribute(div, "contenteditable", Some("true"));
                div
            }
        };
        self.append(editable, editor);
        self.lock().editor = Some(editor);
    }

    fn commit(&self, editor: NodeId) {
        let (selected, details) = {
            let state = self.lock();
            if state.editor != Some(editor) {
                return;
            }
            (state.selected, state.details)
        };
        let raw = match self.page.value(editor) {
            Some(value) => value,
            None => self.page.text(editor),
        };
        let committed = raw.trim().to_string();
        if let Some(title) = selected.and_then(|row| self.page.query(row, &TITLE)) {
            self.page.set_text(title, &committed);
        }
        if let Some(display) = details
            .and_then(|d| self.page.query(d, &Selector::new(".editableContent-display")))
        {
            self.page.set_text(display, &committed);
        }
        self.page.remove(editor);
        self.lock().editor = None;
    }

    fn close_details(&self) {
        let details = {
            let mut state = self.lock();
            state.selected = None;
            state.editor = None;
            state.details.take()
        };
        if let Some(details) = details {
            self.page.remove(details);
        }
    }
}

impl HostPage for SimulatedTodoApp {
    fn root(&self) -> NodeId {
        self.page.root()
    }

    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.page.query_all(scope, selector)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.page.matches(node, selector)
    }

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        self.page.closest(node, selector)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.page.parent(node)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.page.tag(node)
    }

    fn text(&self, node: NodeId) -> String {
        self.page.text(node)
    }

    fn set_text(&self, node: NodeId, text: &str) {
        self.page.set_text(node, text)
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.page.value(node)
    }

    fn set_value(&self, node: NodeId, value: &str) {
        self.page.set_value(node, value)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.page.attribute(node, name)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: Option<&str>) {
        self.page.set_attribute(node, name, value)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.page.has_class(node, class)
    }

    fn toggle_class(&self, node: NodeId, class: &str, on: bool) {
        self.page.toggle_class(node, class, on)
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.page.create_element(tag)
    }

    fn insert(&self, target: NodeId, node: NodeId, position: InsertPosition) {
        self.page.insert(target, node, position)
    }

    fn remove(&self, node: NodeId) {
        self.page.remove(node)
    }

    fn click(&self, node: NodeId) {
        self.page.click(node);
        if !self.page.is_connected(node) {
            return;
        }
        if let Some(wrapper) = self.page.closest(node, &TITLE_WRAPPER) {
            if let Some(row) = self.page.closest(wrapper, &ROW) {
                self.select(row);
            }
        } else if let Some(button) = self.page.closest(node, &EDIT_BUTTON) {
            self.open_editor(button);
        } else if self.page.closest(node, &CLOSE_BUTTON).is_some() {
            self.close_details();
        }
    }

    fn dispatch(&self, node: NodeId, event: PageEvent) {
        self.page.dispatch(node, event);
        if event == PageEvent::KeyUp(Key::Enter) {
            self.commit(node);
        }
    }

    fn focus(&self, node: NodeId) {
        self.page.focus(node)
    }

    fn blur(&self, node: NodeId) {
        self.page.blur(node)
    }

    fn subscribe(&self, sink: MutationSink) {
        self.page.subscribe(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn app() -> SimulatedTodoApp {
        SimulatedTodoApp::new(
            "Work",
            &[TaskSpec::new("Write report"), TaskSpec::new("Review PR [15m]")],
        )
    }

    fn edit_title(app: &SimulatedTodoApp, row: NodeId, new_title: &str) {
        let wrapper = app.query(row, &TITLE_WRAPPER).unwrap();
        app.click(wrapper);
        let edit = app.query(app.root(), &EDIT_BUTTON).unwrap();
        app.click(edit);
        let input = app
            .query(app.root(), &Selector::new(r#".editableContent input[type="text"]"#))
            .unwrap();
        assert_eq!(app.value(input).as_deref(), Some(app.title(row).as_str()));
        app.set_value(input, new_title);
        app.dispatch(input, PageEvent::KeyUp(Key::Enter));
    }

    #[test]
    fn test_builds_list_markup() {
        let app = app();
        assert_eq!(app.titles(), vec!["Write report", "Review PR [15m]"]);
        assert_eq!(app.row_titled("Review PR"), app.rows().get(1).copied());
        let title = app.query(app.root(), &Selector::new(".listTitle")).unwrap();
        assert_eq!(app.text(title), "Work");
        assert!(app
            .query(app.root(), &Selector::new(".gridViewToggle .toolbarButton.listButton"))
            .is_some());
    }

    #[test]
    fn test_edit_flow_commits_title() {
        let app = app();
        let row = app.rows()[0];
        edit_title(&app, row, "  Write report [5m] ");
        assert_eq!(app.title(row), "Write report [5m]");

        let close = app.query(app.root(), &CLOSE_BUTTON).unwrap();
        app.click(close);
        assert!(!app.detail_open());
    }

    #[test]
    fn test_misroute_opens_other_task() {
        let app = app();
        app.set_misroute(true);
        let rows = app.rows();
        edit_title(&app, rows[0], "Changed");
        assert_eq!(app.title(rows[0]), "Write report");
        assert_eq!(app.title(rows[1]), "Changed");
    }

    #[test]
    fn test_hidden_edit_affordance_can_be_revealed() {
        let app = app();
        app.set_edit_affordance(false);
        let wrapper = app.query(app.rows()[0], &TITLE_WRAPPER).unwrap();
        app.click(wrapper);
        assert!(app.query(app.root(), &EDIT_BUTTON).is_none());
        assert!(app.reveal_edit_button().is_some());
        assert!(app.reveal_edit_button().is_none());
    }

    #[test]
    fn test_set_due_changes_badge() {
        let app = SimulatedTodoApp::new("Work", &[TaskSpec::new("A").due(DueState::Later)]);
        let row = app.rows()[0];
        let date = app.query(row, &DATE).unwrap();
        assert!(!app.has_class(date, "overdue"));

        app.set_due(row, Some(DueState::Overdue));
        assert!(app.has_class(date, "overdue"));
        app.set_due(row, None);
        assert!(app.query(row, &DATE).is_none());
    }
}
