//! Save bookkeeping: touched/must-save flags and the save traversal.
//!
//! The tree does not write files.  A persistence writer calls
//! [`OptionTree::prepare_must_save`] to pick what to save, walks
//! [`OptionTree::save_entries`] to get the entries in output order, and calls
//! [`OptionTree::untouch`] once the save succeeded.

use super::node::{NodeId, OptionFlags};
use super::tree::OptionTree;
use crate::value::format::format_value;
use crate::value::{OptionKind, OptionValue};

/// Which entries get their description printed as a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentPolicy {
    Never,
    /// Suppress comments on non-template autocreating trees.
    TemplatesOnly,
    #[default]
    Always,
}

impl CommentPolicy {
    fn allows(self, is_template: bool, is_autocreate_tree: bool) -> bool {
        match self {
            CommentPolicy::Never => false,
            CommentPolicy::TemplatesOnly => is_template || !is_autocreate_tree,
            CommentPolicy::Always => true,
        }
    }

    /// Policy for the children of a tree.
    fn descend(self, is_template: bool, is_autocreate: bool) -> Self {
        match self {
            CommentPolicy::Always if is_autocreate => CommentPolicy::TemplatesOnly,
            CommentPolicy::TemplatesOnly if !is_template => CommentPolicy::Never,
            other => other,
        }
    }
}

/// What a [`SaveEntry`] stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveItem {
    /// A leaf and its formatted value.
    Value(String),
    /// A soft-deleted leaf that should be written as removed.
    Unset,
    TreeStart,
    TreeEnd,
}

/// One step of the save traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    pub node: NodeId,
    /// Dotted path relative to the traversal root.
    pub path: String,
    pub depth: usize,
    /// Whether the writer should emit the node's description as a comment.
    pub comment: bool,
    pub item: SaveItem,
}

impl OptionTree {
    /// Sets [`OptionFlags::MUST_SAVE`] on every node below `root` that is
    /// touched, deleted or a language option, or on all of them when
    /// `force_all` is set.  Clears it everywhere else.
    pub fn prepare_must_save(&mut self, root: NodeId, force_all: bool) {
        for id in self.descendants(root) {
            let Some(node) = self.get_mut(id) else { continue };
            let selected = force_all
                || node.flags.intersects(OptionFlags::TOUCHED | OptionFlags::DELETED)
                || node.kind() == OptionKind::Language;
            node.flags.set(OptionFlags::MUST_SAVE, selected);
        }
    }

    /// Clears [`OptionFlags::TOUCHED`] below `root`, leaving
    /// [`OptionFlags::MUST_SAVE`] as it is.
    pub fn untouch(&mut self, root: NodeId) {
        for id in self.descendants(root) {
            if let Some(node) = self.get_mut(id) {
                node.flags.remove(OptionFlags::TOUCHED);
            }
        }
    }

    /// Returns `true` when some leaf below `root` is marked must-save.
    pub fn has_saveable_content(&self, root: NodeId) -> bool {
        self.children(root).iter().any(|child| match self.get(*child) {
            Some(node) if node.is_tree() => self.has_saveable_content(*child),
            Some(node) => node.flags.contains(OptionFlags::MUST_SAVE),
            None => false,
        })
    }

    /// Walks the subtree below `root` in output order.
    ///
    /// Hidden nodes, aliases, `_template_` subtrees, trees without saveable
    /// content and leaves without [`OptionFlags::MUST_SAVE`] are skipped, as
    /// are leaves that have no textual value.
    pub fn save_entries(&self, root: NodeId, policy: CommentPolicy) -> Vec<SaveEntry> {
        let mut entries = Vec::new();
        self.collect_save_entries(root, "", 0, policy, &mut entries);
        entries
    }

    fn collect_save_entries(
        &self,
        parent: NodeId,
        prefix: &str,
        depth: usize,
        policy: CommentPolicy,
        out: &mut Vec<SaveEntry>,
    ) {
        for &id in self.children(parent) {
            let Some(node) = self.get(id) else { continue };
            if node.flags.contains(OptionFlags::HIDDEN)
                || matches!(node.value, OptionValue::Alias(_))
                || node.is_template()
            {
                continue;
            }

            let is_tree = node.is_tree();
            let has_content = if is_tree {
                self.has_saveable_content(id)
            } else {
                node.flags.contains(OptionFlags::MUST_SAVE)
            };
            if !has_content {
                continue;
            }

            let is_autocreate = node.flags.contains(OptionFlags::AUTOCREATE);
            let comment = policy.allows(node.is_template(), is_tree && is_autocreate);
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{prefix}.{}", node.name)
            };
            let entry = |item| SaveEntry { node: id, path: path.clone(), depth, comment, item };

            if is_tree {
                out.push(entry(SaveItem::TreeStart));
                let inner = policy.descend(node.is_template(), is_autocreate);
                self.collect_save_entries(id, &path, depth + 1, inner, out);
                out.push(entry(SaveItem::TreeEnd));
            } else if node.flags.contains(OptionFlags::DELETED) {
                out.push(entry(SaveItem::Unset));
            } else if let Some(text) = format_value(&node.value, node.max) {
                out.push(entry(SaveItem::Value(text)));
            }
        }
    }
}
