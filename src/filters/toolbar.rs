use crate::domain::FilterKind;
use crate::page::{HostPage, InsertPosition, Locator, NodeId, Selector};

pub const BUTTON_CLASS: &str = "chronolog-filter-btn";
pub const SELECTED_CLASS: &str = "selectedButton";
pub const FILTER_ATTR: &str = "data-filter";

const BUTTON: Selector = Selector::new(".chronolog-filter-btn");
const LABEL: Selector = Selector::new(".chronolog-filter-label");

/// The list-view button our buttons go next to
fn anchor() -> Locator {
    Locator::new(
        "toolbar anchor",
        [
            Selector::new(".gridViewToggle .toolbarButton.listButton"),
            Selector::new(".toolbarButton"),
            Selector::new(r#"[role="toolbar"] .button"#),
        ],
    )
}

pub fn find_button(page: &dyn HostPage, kind: FilterKind) -> Option<NodeId> {
    page.query_all(page.root(), &BUTTON)
        .into_iter()
        .find(|b| page.attribute(*b, FILTER_ATTR).as_deref() == Some(kind.name()))
}

/// Which filter a clicked element belongs to, if any
pub fn button_kind(page: &dyn HostPage, node: NodeId) -> Option<FilterKind> {
    let button = page.closest(node, &BUTTON)?;
    FilterKind::from_name(&page.attribute(button, FILTER_ATTR)?)
}

/// Reflect a filter's state on its button
pub fn sync_button(page: &dyn HostPage, kind: FilterKind, on: bool) {
    let Some(button) = find_button(page, kind) else {
        return;
    };
    page.toggle_class(button, SELECTED_CLASS, on);
    page.set_attribute(button, "aria-pressed", Some(if on { "true" } else { "false" }));
    if let Some(label) = page.query(button, &LABEL) {
        page.set_text(label, kind.button_label(on));
    }
}

fn build_button(page: &dyn HostPage, kind: FilterKind) -> NodeId {
    let button = page.create_element("button");
    for class in ["button", "toolbarButton", BUTTON_CLASS] {
        page.toggle_class(button, class, true);
    }
    page.set_attribute(button, FILTER_ATTR, Some(kind.name()));
    page.set_attribute(button, "aria-label", Some(kind.button_label(false)));
    page.set_attribute(button, "tabindex", Some("0"));

    let inner = page.create_element("div");
    page.toggle_class(inner, "toolbarButton-inner", true);
    let icon = page.create_element("div");
    page.toggle_class(icon, "toolbarButton-icon", true);
    let glyph = page.create_element("i");
    let glyph_class = match kind {
        FilterKind::Future => "ms-Icon--Filter",
        FilterKind::Recurring => "ms-Icon--RepeatAll",
    };
    for class in ["icon", "ms-Icon", glyph_class] {
        page.toggle_class(glyph, class, true);
    }
    let label = page.create_element("span");
    page.toggle_class(label, "chronolog-filter-label", true);
    page.set_text(label, kind.button_label(false));

    page.insert(icon, glyph, InsertPosition::Append);
    page.insert(inner, icon, InsertPosition::Append);
    page.insert(inner, label, InsertPosition::Append);
    page.insert(button, inner, InsertPosition::Append);
    button
}

/// Put one button per filter after the view-toggle block
///
/// Returns `false` while the toolbar has not rendered yet. Buttons already present are left
/// alone.
pub fn insert_buttons(page: &dyn HostPage) -> bool {
    let Some(anchor) = anchor().find(page, page.root()) else {
        return false;
    };
    let Some(mut after) = page
        .parent(anchor)
        .map(|p| page.parent(p).unwrap_or(p))
    else {
        return false;
    };
    if page.parent(after).is_none() {
        return false;
    }

    for kind in FilterKind::all() {
        if let Some(existing) = find_button(page, *kind) {
            after = page.parent(existing).unwrap_or(after);
            continue;
        }
        let wrapper = page.create_element("div");
        let button = build_button(page, *kind);
        page.insert(wrapper, button, InsertPosition::Append);
        page.insert(after, wrapper, InsertPosition::After);
        tracing::debug!(filter = kind.name(), "Filter button inserted");
        after = wrapper;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{SimulatedTodoApp, TaskSpec};

    #[test]
    fn test_inserts_after_view_toggle_once() {
        let app = SimulatedTodoApp::new("Work", &[TaskSpec::new("A")]);
        assert!(insert_buttons(&app));
        assert!(insert_buttons(&app));

        assert_eq!(app.query_all(app.root(), &BUTTON).len(), 2);
        let future = find_button(&app, FilterKind::Future).unwrap();
        let recurring = find_button(&app, FilterKind::Recurring).unwrap();

        let toggle = app
            .query(app.root(), &Selector::new(".gridViewToggle"))
            .unwrap();
        let toolbar = app.parent(toggle).unwrap();
        let order = app.page().children(toolbar);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], toggle);
        assert_eq!(app.parent(future), Some(order[1]));
        assert_eq!(app.parent(recurring), Some(order[2]));
    }

    #[test]
    fn test_no_toolbar_yet() {
        let app = SimulatedTodoApp::without_toolbar("Work", &[TaskSpec::new("A")]);
        assert!(!insert_buttons(&app));
        app.mount_toolbar();
        assert!(insert_buttons(&app));
    }

    #[test]
    fn test_sync_button_label_and_selection() {
        let app = SimulatedTodoApp::new("Work", &[]);
        insert_buttons(&app);
        let button = find_button(&app, FilterKind::Future).unwrap();
        assert_eq!(app.text(button), "Hide upcoming");

        sync_button(&app, FilterKind::Future, true);
        assert!(app.has_class(button, SELECTED_CLASS));
        assert_eq!(app.text(button), "Show upcoming");

        let label = app.query(button, &LABEL).unwrap();
        assert_eq!(button_kind(&app, label), Some(FilterKind::Future));
        assert_eq!(button_kind(&app, app.root()), None);
    }
}
