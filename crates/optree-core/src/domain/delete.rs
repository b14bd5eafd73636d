//! Hard and soft deletion.
//!
//! A hard delete unlinks a node and frees it together with its whole subtree,
//! children first.  Every freed id goes stale.  A soft delete only flags the
//! subtree [`OptionFlags::DELETED`] and hides it from the option browser; the
//! nodes stay linked until a later hard delete.

use tracing::{trace, warn};

use super::node::{NodeId, OptionFlags};
use super::observer::TreeEvent;
use super::tree::{OptionTree, TreeError};

/// How loudly a subtree is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FreeMode {
    /// Children are expected to be freed along with their parent.
    Silent,
    /// Children of a non-autocreating tree are reported as orphans.
    Checked,
    /// Every node freed is reported.
    Orphaned,
}

impl OptionTree {
    /// Unlinks `id` and frees its subtree.  Returns the number of nodes freed.
    ///
    /// A registered tree is expected to be empty by the time it is deleted:
    /// if a non-autocreating tree still has children they are logged as
    /// orphans, then freed anyway.  Deleting the root frees everything below
    /// it and keeps the root itself.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] when `id` is already freed.
    pub fn hard_delete(&mut self, id: NodeId) -> Result<usize, TreeError> {
        self.node(id)?;
        if id == self.root() {
            let mut freed = 0;
            for child in self.children(id).to_vec() {
                freed += self.hard_delete(child)?;
            }
            return Ok(freed);
        }
        self.unlink(id);
        Ok(self.free_subtree(id, FreeMode::Checked))
    }

    /// Unlinks and frees `id` and everything below it without diagnostics.
    ///
    /// Returns the number of nodes freed; `0` for stale ids and the root.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if !self.contains(id) || id == self.root() {
            return 0;
        }
        self.unlink(id);
        self.free_subtree(id, FreeMode::Silent)
    }

    /// Soft-deletes `id` and its subtree: flags every node
    /// [`OptionFlags::DELETED`] and [`OptionFlags::TOUCHED`] and hides its
    /// mirror entry.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] when `id` is already freed.
    pub fn mark_deleted(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.node(id)?;
        let mut subtree = vec![id];
        subtree.extend(self.descendants(id));
        for node in subtree {
            self.add_flags(node, OptionFlags::DELETED | OptionFlags::TOUCHED)?;
            self.set_mirror_visible(node, false)?;
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else { return };
        let parent = node.parent.take();
        let mirrored = node.mirror.is_some();

        if let Some(children) = parent.and_then(|p| self.get_mut(p)).and_then(|p| p.children_mut()) {
            children.retain(|child| *child != id);
        }
        if mirrored {
            self.emit(TreeEvent::Removed { parent, node: id });
        }
    }

    fn free_subtree(&mut self, id: NodeId, mode: FreeMode) -> usize {
        let Some(node) = self.get_mut(id) else { return 0 };
        let name = node.name.clone();
        let autocreate = node.flags.contains(OptionFlags::AUTOCREATE);
        let children = node.children_mut().map(std::mem::take).unwrap_or_default();

        if mode == FreeMode::Orphaned {
            warn!(option = %name, "orphaned option");
        }
        let child_mode = match mode {
            FreeMode::Checked if !children.is_empty() && !autocreate => {
                warn!(option = %name, "orphaned unregistered option in subtree");
                FreeMode::Orphaned
            }
            FreeMode::Checked => FreeMode::Silent,
            other => other,
        };

        let mut freed = 0;
        for child in children {
            freed += self.free_subtree(child, child_mode);
        }
        self.release(id);
        trace!(option = %name, freed, "freed option subtree");
        freed + 1
    }
}
