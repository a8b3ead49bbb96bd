use super::{HostPage, MutationRecord, NodeId, Selector};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Also report the closest matching ancestor of changes made inside it
    /// (attributes, text, added children)
    pub inner_changes: bool,
}

/// Stream elements matching `selector` that appear (or, with `inner_changes`, change) under `root`
///
/// The watcher task ends when the returned receiver is dropped.
pub fn watch(
    page: Arc<dyn HostPage>,
    root: NodeId,
    selector: Selector,
    options: WatchOptions,
) -> UnboundedReceiver<NodeId> {
    let (records_tx, mut records) = mpsc::unbounded_channel();
    let (out, rx) = mpsc::unbounded_channel();
    page.subscribe(records_tx);

    tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            let hits = match record {
                MutationRecord::ChildAdded { parent, child } => {
                    let mut hits = Vec::new();
                    if page.matches(child, &selector) {
                        hits.push(child);
                    }
                    hits.extend(page.query_all(child, &selector));
                    if options.inner_changes {
                        hits.extend(page.closest(parent, &selector));
                    }
                    hits
                }
                MutationRecord::Attribute { target, .. } | MutationRecord::Text { target }
                    if options.inner_changes =>
                {
                    page.closest(target, &selector).into_iter().collect()
                }
                _ => Vec::new(),
            };

            for node in hits {
                if !is_within(&*page, node, root) {
                    continue;
                }
                if out.send(node).is_err() {
                    return;
                }
            }
            if out.is_closed() {
                return;
            }
        }
    });

    rx
}

fn is_within(page: &dyn HostPage, node: NodeId, root: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == root {
            return true;
        }
        current = page.parent(id);
    }
    false
}
