//! Structural change feed for option browsers.
//!
//! A tree may have one attached [`TreeObserver`].  The tree reports every
//! structural change to nodes that carry a mirror entry, in the order the
//! changes happen, with the position the entry should take among its
//! *mirrored, non-deleted* siblings.  The observer is a listener only: the
//! tree behaves identically with or without one.

use std::cell::RefCell;
use std::rc::Rc;

use super::node::NodeId;

/// A structural change to a mirrored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node was linked under `parent` at mirror position `position`.
    Inserted {
        parent: NodeId,
        node: NodeId,
        position: usize,
        name: String,
        is_folder: bool,
        visible: bool,
    },
    /// A node (and its whole subtree) was unlinked.
    Removed { parent: Option<NodeId>, node: NodeId },
    /// A node's mirror entry was shown or hidden.
    VisibilityChanged { node: NodeId, visible: bool },
}

/// Receives [`TreeEvent`]s from an [`super::tree::OptionTree`].
#[cfg_attr(test, mockall::automock)]
pub trait TreeObserver {
    fn on_event(&mut self, event: &TreeEvent);
}

/// Lets the embedder keep a handle to the observer it attached.
impl<T: TreeObserver> TreeObserver for Rc<RefCell<T>> {
    fn on_event(&mut self, event: &TreeEvent) {
        self.borrow_mut().on_event(event);
    }
}
