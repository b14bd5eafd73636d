//! The option browser: a listbox view of the mirrored option tree.
//!
//! The browser never reads the tree.  It is attached as the tree's
//! [`TreeObserver`] and rebuilds the listbox purely from the structural
//! events, the way a UI toolkit would keep its widget items in step.
//!
//! Entries are kept per parent, in the order the tree reports.  Soft-deleted
//! and template entries stay in their lists but are marked invisible.

use std::collections::HashMap;

use optree_core::{NodeId, TreeEvent, TreeObserver};
use tracing::trace;

/// One listbox item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub node: NodeId,
    pub name: String,
    pub is_folder: bool,
    pub visible: bool,
}

/// Listbox state built from [`TreeEvent`]s.
#[derive(Debug, Default)]
pub struct OptionBrowser {
    items: HashMap<NodeId, Vec<BrowserEntry>>,
    parents: HashMap<NodeId, NodeId>,
}

impl OptionBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries directly below `parent`, hidden ones included.
    pub fn entries(&self, parent: NodeId) -> &[BrowserEntry] {
        self.items.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the visible entries directly below `parent`.
    pub fn visible_names(&self, parent: NodeId) -> Vec<&str> {
        self.entries(parent)
            .iter()
            .filter(|entry| entry.visible)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    pub fn entry(&self, node: NodeId) -> Option<&BrowserEntry> {
        let parent = self.parents.get(&node)?;
        self.entries(*parent).iter().find(|entry| entry.node == node)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn insert(&mut self, parent: NodeId, position: usize, entry: BrowserEntry) {
        self.parents.insert(entry.node, parent);
        let list = self.items.entry(parent).or_default();
        let at = position.min(list.len());
        list.insert(at, entry);
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.parents.remove(&node) {
            if let Some(list) = self.items.get_mut(&parent) {
                list.retain(|entry| entry.node != node);
            }
        }
        for child in self.items.remove(&node).unwrap_or_default() {
            self.remove(child.node);
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        let Some(parent) = self.parents.get(&node) else { return };
        if let Some(entry) = self.items.get_mut(parent).and_then(|list| list.iter_mut().find(|e| e.node == node)) {
            entry.visible = visible;
        }
    }
}

impl TreeObserver for OptionBrowser {
    fn on_event(&mut self, event: &TreeEvent) {
        trace!(?event, "option browser event");
        match event {
            TreeEvent::Inserted { parent, node, position, name, is_folder, visible } => self.insert(
                *parent,
                *position,
                BrowserEntry { node: *node, name: name.clone(), is_folder: *is_folder, visible: *visible },
            ),
            TreeEvent::Removed { node, .. } => self.remove(*node),
            TreeEvent::VisibilityChanged { node, visible } => self.set_visible(*node, *visible),
        }
    }
}
