//! The option tree arena.
//!
//! An [`OptionTree`] owns every node reachable from its root.  Nodes are stored
//! in a slot vector and addressed by generational [`NodeId`]s; freeing a node
//! bumps its slot's generation, so ids held across a delete go stale instead
//! of dangling.
//!
//! # Why an arena? (for beginners)
//!
//! A tree where children point at parents is a cycle, and cycles fight Rust's
//! single-owner model.  Keeping all nodes in one `Vec` owned by the tree and
//! linking them with indices gives every node exactly one owner (the arena),
//! makes parent links free of reference counting, and lets teardown be a plain
//! loop rather than a cycle collection problem.
//!
//! The operations are split across sibling modules, each adding an `impl
//! OptionTree` block: lookup in `resolve`, insertion in `insert`, hooks in
//! `notify`, save bookkeeping in `persist` and teardown in `delete`.

use thiserror::Error;
use tracing::trace;

use super::node::{MirrorState, NodeId, OptionFlags, OptionNode};
use super::observer::{TreeEvent, TreeObserver};
use super::store::ContextId;
use crate::value::ValueError;

/// Whether a lookup may autocreate missing children from templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// Autocreating parents manufacture missing children.
    #[default]
    Normal,
    /// Never modify the tree; missing children are simply not found.
    Strict,
}

/// Errors produced by tree operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// The path, or one of its ancestors, does not resolve.
    #[error("option not found: {0}")]
    NotFound(String),

    /// An autocreating tree has no `_template_` child to clone.
    #[error("cannot autocreate {path}: {parent}._template_ is missing")]
    MissingTemplate { path: String, parent: String },

    /// An alias names a path that does not resolve.
    #[error("{alias} aliased to unknown option {target}")]
    DanglingAlias { alias: String, target: String },

    /// The node is not a tree and cannot hold children.
    #[error("{0} is not an option tree")]
    NotATree(String),

    /// A sibling with the same name already exists.
    #[error("option {name} already exists under {parent}")]
    DuplicateName { name: String, parent: String },

    /// A value of the wrong kind was written.
    #[error("cannot store a {found} value in {expected} option {name}")]
    KindMismatch { name: String, expected: &'static str, found: &'static str },

    /// The id refers to a node that has been freed.
    #[error("stale node id {0}")]
    StaleNode(NodeId),

    /// No overlay tree exists for the context.
    #[error("unknown context {0}")]
    UnknownContext(ContextId),

    #[error(transparent)]
    Value(#[from] ValueError),
}

struct Slot {
    generation: u32,
    node: Option<OptionNode>,
}

/// An arena-backed tree of option nodes.
pub struct OptionTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
    root: NodeId,
    alias_root: Option<NodeId>,
    show_templates: bool,
    observer: Option<Box<dyn TreeObserver>>,
}

impl OptionTree {
    /// Creates a tree whose root is an empty tree node called `root_name`.
    pub fn new(root_name: &str) -> Self {
        Self::with_root(OptionNode::tree(root_name))
    }

    /// Creates a tree around a prepared root node.
    ///
    /// A non-tree root is replaced by an empty tree value so the root can
    /// always hold children.
    pub fn with_root(mut root: OptionNode) -> Self {
        if !root.is_tree() {
            root.value = crate::value::OptionValue::tree();
        }
        root.parent = None;
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            root: NodeId::new(0, 0),
            alias_root: None,
            show_templates: false,
            observer: None,
        };
        tree.root = tree.alloc(root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the node if `id` is still live.
    pub fn get(&self, id: NodeId) -> Option<&OptionNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut OptionNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Like [`get`](Self::get) but with a [`TreeError::StaleNode`] error.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] when the node has been freed.
    pub fn node(&self, id: NodeId) -> Result<&OptionNode, TreeError> {
        self.get(id).ok_or(TreeError::StaleNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut OptionNode, TreeError> {
        self.get_mut(id).ok_or(TreeError::StaleNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Children of `id` in order; empty for leaves and stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(OptionNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(OptionNode::parent)
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|_| id);
        while let Some(node_id) = current {
            chain.push(node_id);
            current = self.parent(node_id);
        }
        chain
    }

    /// Dotted path of `id` relative to the tree root.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        self.path_from(self.root, id)
    }

    /// Dotted path of `id` relative to `ancestor`.
    ///
    /// Returns `Some("")` when `id == ancestor` and `None` when `ancestor` is
    /// not on `id`'s ancestry.
    pub fn path_from(&self, ancestor: NodeId, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        for node_id in self.ancestry(id) {
            if node_id == ancestor {
                names.reverse();
                return Some(names.join("."));
            }
            names.push(self.get(node_id)?.name());
        }
        None
    }

    /// Every node below `id` in pre-order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    // ── Flags, hooks and settings ─────────────────────────────────────────────

    /// Sets `flags` on a node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for freed ids.
    pub fn add_flags(&mut self, id: NodeId, flags: OptionFlags) -> Result<(), TreeError> {
        self.node_mut(id)?.flags.insert(flags);
        Ok(())
    }

    /// Clears `flags` on a node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for freed ids.
    pub fn remove_flags(&mut self, id: NodeId, flags: OptionFlags) -> Result<(), TreeError> {
        self.node_mut(id)?.flags.remove(flags);
        Ok(())
    }

    /// Installs or clears a node's change hook; a previous hook is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for freed ids.
    pub fn set_change_hook(
        &mut self,
        id: NodeId,
        hook: Option<super::node::ChangeHook>,
    ) -> Result<(), TreeError> {
        self.node_mut(id)?.change_hook = hook;
        Ok(())
    }

    /// Tree that alias targets are resolved from.  Defaults to the root.
    pub fn alias_root(&self) -> NodeId {
        self.alias_root.unwrap_or(self.root)
    }

    pub fn set_alias_root(&mut self, id: NodeId) {
        self.alias_root = Some(id);
    }

    /// Whether newly linked `_template_` nodes start visible in the mirror.
    pub fn show_templates(&self) -> bool {
        self.show_templates
    }

    pub fn set_show_templates(&mut self, show: bool) {
        self.show_templates = show;
    }

    /// Shows or hides a node's mirror entry, notifying the observer on change.
    ///
    /// Nodes without a mirror entry are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for freed ids.
    pub fn set_mirror_visible(&mut self, id: NodeId, visible: bool) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        let changed = match node.mirror.as_mut() {
            Some(mirror) if mirror.visible != visible => {
                mirror.visible = visible;
                true
            }
            _ => false,
        };
        if changed {
            self.emit(TreeEvent::VisibilityChanged { node: id, visible });
        }
        Ok(())
    }

    // ── Observer ──────────────────────────────────────────────────────────────

    /// Attaches the structural-change observer, replacing any previous one.
    pub fn attach_observer(&mut self, observer: Box<dyn TreeObserver>) {
        self.observer = Some(observer);
    }

    pub fn detach_observer(&mut self) -> Option<Box<dyn TreeObserver>> {
        self.observer.take()
    }

    pub(crate) fn emit(&mut self, event: TreeEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event);
        }
    }

    /// Position of `id`'s mirror entry among mirrored, non-deleted siblings.
    pub(crate) fn mirror_position(&self, parent: NodeId, id: NodeId) -> usize {
        self.children(parent)
            .iter()
            .take_while(|sibling| **sibling != id)
            .filter(|sibling| {
                self.get(**sibling).is_some_and(|s| {
                    s.mirror.is_some() && !s.flags.contains(OptionFlags::DELETED)
                })
            })
            .count()
    }

    /// Announces a freshly linked node and its mirrored descendants.
    pub(crate) fn announce(&mut self, id: NodeId) {
        if self.observer.is_none() {
            return;
        }
        let mut pending = vec![id];
        pending.extend(self.descendants(id));
        for node_id in pending {
            let Some(node) = self.get(node_id) else { continue };
            let (Some(mirror), Some(parent)) = (node.mirror, node.parent) else { continue };
            let event = TreeEvent::Inserted {
                parent,
                node: node_id,
                position: self.mirror_position(parent, node_id),
                name: node.name.clone(),
                is_folder: node.is_tree(),
                visible: mirror.visible,
            };
            self.emit(event);
        }
    }

    // ── Slot management ───────────────────────────────────────────────────────

    pub(crate) fn alloc(&mut self, node: OptionNode) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId::new(self.slots.len() - 1, 0)
    }

    /// Frees one slot.  Children are not touched; callers free them first.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<OptionNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        trace!(name = %node.name, %id, "released option node");
        Some(node)
    }

    /// Appends `child` to `parent` without ordering, description inheritance
    /// or observer events.  Used while assembling detached copies.
    pub(crate) fn attach_unsorted(&mut self, parent: NodeId, child: NodeId) {
        if let Some(children) = self.get_mut(parent).and_then(OptionNode::children_mut) {
            children.push(child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Initial mirror state for a node about to be linked: templates follow
    /// [`show_templates`](Self::show_templates), everything else starts visible.
    pub(crate) fn initial_mirror(&self, node: &OptionNode) -> Option<MirrorState> {
        node.mirror.map(|_| MirrorState { visible: !node.is_template() || self.show_templates })
    }
}

impl std::fmt::Debug for OptionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionTree")
            .field("root", &self.root)
            .field("live", &self.live)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OptionValue;

    #[test]
    fn test_new_tree_has_only_root() {
        let tree = OptionTree::new("config");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node(tree.root()).map(|n| n.name()), Ok("config"));
        assert_eq!(tree.path_of(tree.root()).as_deref(), Some(""));
    }

    #[test]
    fn test_with_root_forces_tree_value() {
        let tree = OptionTree::with_root(OptionNode::new("odd", OptionValue::Int(1)));
        assert!(tree.node(tree.root()).is_ok_and(|n| n.is_tree()));
    }

    #[test]
    fn test_released_id_goes_stale_and_slot_is_reused() {
        // Arrange
        let mut tree = OptionTree::new("root");
        let first = tree.alloc(OptionNode::new("a", OptionValue::Int(1)));

        // Act
        tree.release(first);
        let second = tree.alloc(OptionNode::new("b", OptionValue::Int(2)));

        // Assert
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(tree.get(first).is_none());
        assert_eq!(tree.node(first).unwrap_err(), TreeError::StaleNode(first));
        assert_eq!(tree.get(second).map(|n| n.name()), Some("b"));
    }

    #[test]
    fn test_path_from_and_ancestry() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let a = tree.alloc(OptionNode::tree("a"));
        tree.attach_unsorted(root, a);
        let b = tree.alloc(OptionNode::new("b", OptionValue::Bool(true)));
        tree.attach_unsorted(a, b);

        assert_eq!(tree.ancestry(b), vec![b, a, root]);
        assert_eq!(tree.path_of(b).as_deref(), Some("a.b"));
        assert_eq!(tree.path_from(a, b).as_deref(), Some("b"));
        assert_eq!(tree.path_from(b, a), None);
    }

    #[test]
    fn test_descendants_are_pre_order() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let a = tree.alloc(OptionNode::tree("a"));
        tree.attach_unsorted(root, a);
        let a1 = tree.alloc(OptionNode::new("a1", OptionValue::Int(0)));
        tree.attach_unsorted(a, a1);
        let b = tree.alloc(OptionNode::new("b", OptionValue::Int(0)));
        tree.attach_unsorted(root, b);

        assert_eq!(tree.descendants(root), vec![a, a1, b]);
    }

    #[test]
    fn test_set_mirror_visible_ignores_unmirrored_nodes() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        assert!(tree.set_mirror_visible(root, false).is_ok());
        assert_eq!(tree.node(root).map(|n| n.mirror()), Ok(None));
    }
}
