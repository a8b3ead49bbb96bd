use super::{HostPage, NodeId, Selector};

/// Ranked selectors for one logical element; the first selector with a hit wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    name: &'static str,
    selectors: Vec<Selector>,
}

impl Locator {
    pub fn new(name: &'static str, selectors: impl IntoIterator<Item = Selector>) -> Self {
        Self {
            name,
            selectors: selectors.into_iter().collect(),
        }
    }

    pub fn single(name: &'static str, selector: Selector) -> Self {
        Self::new(name, [selector])
    }

    /// Scope every selector under `ancestor` (`".pane"` + `"textarea"` -> `".pane textarea"`)
    pub fn within(&self, ancestor: &str) -> Self {
        Self {
            name: self.name,
            selectors: self
                .selectors
                .iter()
                .map(|s| Selector::owned(format!("{} {}", ancestor, s)))
                .collect(),
        }
    }

    /// Human name used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn find(&self, page: &dyn HostPage, scope: NodeId) -> Option<NodeId> {
        self.selectors.iter().find_map(|s| page.query(scope, s))
    }

    /// All hits of the first selector that has any
    pub fn find_all(&self, page: &dyn HostPage, scope: NodeId) -> Vec<NodeId> {
        self.selectors
            .iter()
            .map(|s| page.query_all(scope, s))
            .find(|hits| !hits.is_empty())
            .unwrap_or_default()
    }

    /// `node` or its nearest ancestor matching any of the selectors, in rank order
    pub fn closest(&self, page: &dyn HostPage, node: NodeId) -> Option<NodeId> {
        self.selectors.iter().find_map(|s| page.closest(node, s))
    }
}
