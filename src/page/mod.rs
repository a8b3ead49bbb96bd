//! The host page as seen by chronolog.
//!
//! Everything that touches the task list goes through [`HostPage`]. Lookups are best-effort:
//! a selector that matches nothing yields `None` or an empty list, never an error, because the
//! host markup can change under us at any time.

pub mod locator;
pub mod memory;
pub mod observe;
pub mod selector;
pub mod sim;
pub mod wait;

use std::borrow::Cow;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

pub use locator::Locator;
pub use memory::MemoryPage;
pub use observe::{watch, WatchOptions};
pub use sim::{DueState, SimulatedTodoApp, TaskSpec};
pub use wait::{wait_for, WaitOutcome, WaitPolicy};

/// Opaque handle to an element of the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A CSS selector, interpreted by the page implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Cow<'static, str>);

impl Selector {
    pub const fn new(css: &'static str) -> Self {
        Self(Cow::Borrowed(css))
    }

    pub fn owned(css: impl Into<String>) -> Self {
        Self(Cow::Owned(css.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys we synthesize keyboard events for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
}

/// Events dispatched to page elements, mirroring what the host editor listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Input,
    Change,
    KeyDown(Key),
    KeyUp(Key),
}

/// Where [`HostPage::insert`] places a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// First child of the target
    Prepend,
    /// Last child of the target
    Append,
    /// Next sibling of the target
    After,
}

/// A structural or attribute change on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildAdded { parent: NodeId, child: NodeId },
    ChildRemoved { parent: NodeId, child: NodeId },
    Attribute { target: NodeId, name: String },
    Text { target: NodeId },
}

/// Receiver side is owned by whoever subscribed
pub type MutationSink = UnboundedSender<MutationRecord>;

/// Read/write access to the host page's DOM
pub trait HostPage: Send + Sync {
    /// The document root element
    fn root(&self) -> NodeId;

    /// Descendants of `scope` matching `selector`, in document order
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

    /// First descendant of `scope` matching `selector`
    fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.query_all(scope, selector).into_iter().next()
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool;

    /// `node` itself or its nearest ancestor matching `selector`
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Lower-case tag name; `None` for unknown handles
    fn tag(&self, node: NodeId) -> Option<String>;

    /// Trimmed text content of the node and its descendants
    fn text(&self, node: NodeId) -> String;

    /// Replace the node's children with a single text value
    fn set_text(&self, node: NodeId, text: &str);

    /// Form-control value (`input`, `textarea`)
    fn value(&self, node: NodeId) -> Option<String>;

    fn set_value(&self, node: NodeId, value: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Set or (with `None`) remove an attribute
    fn set_attribute(&self, node: NodeId, name: &str, value: Option<&str>);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn toggle_class(&self, node: NodeId, class: &str, on: bool);

    /// Create a detached element
    fn create_element(&self, tag: &str) -> NodeId;

    /// Attach `node` relative to `target`
    fn insert(&self, target: NodeId, node: NodeId, position: InsertPosition);

    /// Detach `node` and its subtree
    fn remove(&self, node: NodeId);

    fn click(&self, node: NodeId);

    fn dispatch(&self, node: NodeId, event: PageEvent);

    fn focus(&self, node: NodeId);

    fn blur(&self, node: NodeId);

    /// Deliver every subsequent mutation to `sink` until it is closed
    fn subscribe(&self, sink: MutationSink);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::new(".a .b").to_string(), ".a .b");
        assert_eq!(Selector::owned(String::from("div")).as_str(), "div");
        assert_eq!(NodeId(7).to_string(), "#7");
    }
}
