use super::selector::{ElementView, SelectorList};
use super::{HostPage, InsertPosition, MutationRecord, MutationSink, NodeId, PageEvent, Selector};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Something a caller did to the page, recorded for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Click(NodeId),
    Event(NodeId, PageEvent),
    Focus(NodeId),
    Blur(NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Document {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    root: NodeId,
    focused: Option<NodeId>,
    sinks: Vec<MutationSink>,
    interactions: Vec<Interaction>,
}

impl Document {
    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(tag));
        id
    }

    fn emit(&mut self, record: MutationRecord) {
        self.sinks.retain(|sink| sink.send(record.clone()).is_ok());
    }

    fn view(&self, id: NodeId) -> Option<NodeView<'_>> {
        self.nodes.get(&id).map(|node| NodeView {
            doc: self,
            node,
        })
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&scope) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.nodes.get(&id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.collect_text(*child, out);
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.nodes.get_mut(&id) {
            n.parent = None;
        }
        self.emit(MutationRecord::ChildRemoved { parent, child: id });
    }

    fn attach(&mut self, parent: NodeId, index: Option<usize>, id: NodeId) {
        let Some(p) = self.nodes.get_mut(&parent) else {
            return;
        };
        match index {
            Some(i) if i <= p.children.len() => p.children.insert(i, id),
            _ => p.children.push(id),
        }
        if let Some(n) = self.nodes.get_mut(&id) {
            n.parent = Some(parent);
        }
        self.emit(MutationRecord::ChildAdded { parent, child: id });
    }
}

struct NodeView<'a> {
    doc: &'a Document,
    node: &'a Node,
}

impl<'a> ElementView for NodeView<'a> {
    fn tag_name(&self) -> &str {
        &self.node.tag
    }

    fn has_class(&self, class: &str) -> bool {
        self.node.classes.iter().any(|c| c == class)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.node.attrs.get(name).map(String::as_str)
    }

    fn parent_element(&self) -> Option<Self> {
        let doc: &'a Document = self.doc;
        self.node.parent.and_then(|p| doc.view(p))
    }
}

/// An in-memory DOM implementing [`HostPage`]
///
/// Interactions (`click`, `dispatch`, `focus`, `blur`) are only recorded; page behaviour
/// belongs to whatever wraps this, such as [`super::SimulatedTodoApp`]. Classes are kept apart
/// from attributes and are not visible through `attribute("class")`.
pub struct MemoryPage {
    doc: Mutex<Document>,
}

impl MemoryPage {
    /// A page with an `html` root and an empty `body`
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: HashMap::new(),
            next_id: 1,
            root: NodeId(0),
            focused: None,
            sinks: Vec::new(),
            interactions: Vec::new(),
        };
        let root = doc.alloc("html");
        doc.root = root;
        let body = doc.alloc("body");
        doc.attach(root, None, body);
        Self {
            doc: Mutex::new(doc),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn body(&self) -> NodeId {
        let doc = self.lock();
        doc.nodes
            .get(&doc.root)
            .and_then(|n| n.children.first().copied())
            .unwrap_or(doc.root)
    }

    /// Create `<tag class="...">text</tag>` as the last child of `parent`
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        classes: &[&str],
        text: Option<&str>,
    ) -> NodeId {
        let mut doc = self.lock();
        let id = doc.alloc(tag);
        if let Some(node) = doc.nodes.get_mut(&id) {
            node.classes = classes.iter().map(|c| c.to_string()).collect();
            if let Some(text) = text {
                node.text = text.to_string();
            }
        }
        doc.attach(parent, None, id);
        id
    }

    /// Whether the node is still attached under the root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let doc = self.lock();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == doc.root {
                return true;
            }
            current = doc.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.lock().focused
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().interactions.clone()
    }

    fn record(&self, interaction: Interaction) {
        self.lock().interactions.push(interaction);
    }

    fn parse(selector: &Selector) -> Option<SelectorList> {
        match SelectorList::parse(selector.as_str()) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unsupported selector");
                None
            }
        }
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPage for MemoryPage {
    fn root(&self) -> NodeId {
        self.lock().root
    }

    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let Some(list) = Self::parse(selector) else {
            return Vec::new();
        };
        let doc = self.lock();
        doc.descendants(scope)
            .into_iter()
            .filter(|id| doc.view(*id).is_some_and(|v| list.matches(&v)))
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let Some(list) = Self::parse(selector) else {
            return false;
        };
        let doc = self.lock();
        doc.view(node).is_some_and(|v| list.matches(&v))
    }

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let list = Self::parse(selector)?;
        let doc = self.lock();
        let mut current = Some(node);
        while let Some(id) = current {
            let view = doc.view(id)?;
            if list.matches(&view) {
                return Some(id);
            }
            current = view.node.parent;
        }
        None
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().nodes.get(&node).and_then(|n| n.parent)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.lock().nodes.get(&node).map(|n| n.tag.clone())
    }

    fn text(&self, node: NodeId) -> String {
        let doc = self.lock();
        let mut out = String::new();
        doc.collect_text(node, &mut out);
        out.trim().to_string()
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let mut doc = self.lock();
        let children = match doc.nodes.get(&node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for child in children {
            doc.detach(child);
        }
        if let Some(n) = doc.nodes.get_mut(&node) {
            n.text = text.to_string();
        }
        doc.emit(MutationRecord::Text { target: node });
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.lock().nodes.get(&node).and_then(|n| n.value.clone())
    }

    fn set_value(&self, node: NodeId, value: &str) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.value = Some(value.to_string());
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(&node)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: Option<&str>) {
        let mut doc = self.lock();
        let Some(n) = doc.nodes.get_mut(&node) else {
            return;
        };
        let changed = match value {
            Some(v) => n.attrs.insert(name.to_string(), v.to_string()).as_deref() != Some(v),
            None => n.attrs.remove(name).is_some(),
        };
        if changed {
            doc.emit(MutationRecord::Attribute {
                target: node,
                name: name.to_string(),
            });
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.lock()
            .nodes
            .get(&node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn toggle_class(&self, node: NodeId, class: &str, on: bool) {
        let mut doc = self.lock();
        let Some(n) = doc.nodes.get_mut(&node) else {
            return;
        };
        let present = n.classes.iter().any(|c| c == class);
        if present == on {
            return;
        }
        if on {
            n.classes.push(class.to_string());
        } else {
            n.classes.retain(|c| c != class);
        }
        doc.emit(MutationRecord::Attribute {
            target: node,
            name: "class".to_string(),
        });
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.lock().alloc(tag)
    }

    fn insert(&self, target: NodeId, node: NodeId, position: InsertPosition) {
        let mut doc = self.lock();
        if !doc.nodes.contains_key(&target) || !doc.nodes.contains_key(&node) || target == node {
            return;
        }
        doc.detach(node);
        match position {
            InsertPosition::Prepend => doc.attach(target, Some(0), node),
            InsertPosition::Append => doc.attach(target, None, node),
            InsertPosition::After => {
                let Some(parent) = doc.nodes.get(&target).and_then(|n| n.parent) else {
                    tracing::debug!(%target, "Cannot insert after a detached node");
                    return;
                };
                let index = doc
                    .nodes
                    .get(&parent)
                    .and_then(|p| p.children.iter().position(|c| *c == target))
                    .map(|i| i + 1);
                doc.attach(parent, index, node);
            }
        }
    }

    fn remove(&self, node: NodeId) {
        let mut doc = self.lock();
        doc.detach(node);
        if doc.focused == Some(node) {
            doc.focused = None;
        }
    }

    fn click(&self, node: NodeId) {
        self.record(Interaction::Click(node));
    }

    fn dispatch(&self, node: NodeId, event: PageEvent) {
        self.record(Interaction::Event(node, event));
    }

    fn focus(&self, node: NodeId) {
        let mut doc = self.lock();
        doc.focused = Some(node);
        doc.interactions.push(Interaction::Focus(node));
    }

    fn blur(&self, node: NodeId) {
        let mut doc = self.lock();
        if doc.focused == Some(node) {
            doc.focused = None;
        }
        doc.interactions.push(Interaction::Blur(node));
    }

    fn subscribe(&self, sink: MutationSink) {
        self.lock().sinks.push(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn sample() -> (MemoryPage, NodeId, NodeId, NodeId) {
        let page = MemoryPage::new();
        let body = page.body();
        let list = page.append_element(body, "div", &["tasks"], None);
        let first = page.append_element(list, "div", &["taskItem"], Some("First"));
        let second = page.append_element(list, "div", &["taskItem", "done"], Some("Second"));
        (page, list, first, second)
    }

    #[test]
    fn test_query_all_in_document_order() {
        let (page, list, first, second) = sample();
        let root = page.root();
        assert_eq!(
            page.query_all(root, &Selector::new(".taskItem")),
            vec![first, second]
        );
        assert_eq!(page.query(root, &Selector::new(".done")), Some(second));
        assert_eq!(page.query(list, &Selector::new(".tasks")), None);
    }

    #[test]
    fn test_text_concatenates_descendants() {
        let (page, list, first, _) = sample();
        page.append_element(first, "span", &[], Some(" [5m]"));
        assert_eq!(page.text(first), "First [5m]");
        assert_eq!(page.text(list), "First [5m]Second");

        page.set_text(first, "Renamed");
        assert_eq!(page.text(first), "Renamed");
    }

    #[test]
    fn test_closest_and_matches() {
        let (page, list, first, _) = sample();
        let span = page.append_element(first, "span", &["title"], None);
        assert_eq!(page.closest(span, &Selector::new(".tasks")), Some(list));
        assert_eq!(page.closest(span, &Selector::new("span")), Some(span));
        assert_eq!(page.closest(span, &Selector::new(".nope")), None);
        assert!(page.matches(span, &Selector::new(".tasks span.title")));
    }

    #[test]
    fn test_insert_positions() {
        let (page, list, first, second) = sample();
        let head = page.create_element("div");
        let middle = page.create_element("div");
        page.insert(list, head, InsertPosition::Prepend);
        page.insert(first, middle, InsertPosition::After);
        assert_eq!(page.children(list), vec![head, first, middle, second]);

        page.remove(middle);
        assert!(!page.is_connected(middle));
        assert_eq!(page.children(list), vec![head, first, second]);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let (page, _, first, _) = sample();
        assert!(page.query_all(page.root(), &Selector::new("div > span")).is_empty());
        assert!(!page.matches(first, &Selector::new("")));
    }

    #[test]
    fn test_mutations_are_published() {
        let (page, list, first, _) = sample();
        let (tx, mut rx) = mpsc::unbounded_channel();
        page.subscribe(tx);

        let added = page.append_element(list, "div", &["taskItem"], None);
        page.toggle_class(first, "is-working", true);
        page.toggle_class(first, "is-working", true);
        page.set_attribute(first, "data-x", Some("1"));

        assert_eq!(
            rx.try_recv().unwrap(),
            MutationRecord::ChildAdded {
                parent: list,
                child: added
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            MutationRecord::Attribute {
                target: first,
                name: "class".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            MutationRecord::Attribute {
                target: first,
                name: "data-x".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_interactions_are_recorded() {
        let (page, _, first, _) = sample();
        page.click(first);
        page.focus(first);
        page.dispatch(first, PageEvent::Input);
        page.blur(first);
        assert_eq!(page.focused(), None);
        assert_eq!(
            page.interactions(),
            vec![
                Interaction::Click(first),
                Interaction::Focus(first),
                Interaction::Event(first, PageEvent::Input),
                Interaction::Blur(first),
            ]
        );
    }
}
