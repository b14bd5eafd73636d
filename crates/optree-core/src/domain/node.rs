//! The option node: name, typed value, bounds, flags and links.
//!
//! Nodes live inside an [`OptionTree`] arena and refer to each other through
//! [`NodeId`]s.  A node never owns its parent; the parent link is a plain id
//! that the tree keeps consistent on insert and delete.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::store::ContextId;
use super::tree::OptionTree;
use crate::value::{OptionKind, OptionValue};

/// Reserved name of the clone source under an autocreating tree.
pub const TEMPLATE_NAME: &str = "_template_";

/// Generational handle to a node inside one [`OptionTree`].
///
/// The generation changes every time an arena slot is reused, so an id that
/// outlives its node never silently points at a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index: index as u32, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

bitflags! {
    /// Per-node option flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptionFlags: u16 {
        /// Missing children are cloned from the `_template_` child on lookup.
        const AUTOCREATE = 1 << 0;
        /// Children are kept in `(trees first, name)` order.
        const SORT = 1 << 1;
        /// Children get an entry in the option browser mirror.
        const LISTBOX = 1 << 2;
        /// Not traversable by lookups and never persisted.
        const HIDDEN = 1 << 3;
        /// Soft-deleted: hidden from view, pending a hard delete.
        const DELETED = 1 << 4;
        /// Changed since the last save.
        const TOUCHED = 1 << 5;
        /// Selected for the next save.
        const MUST_SAVE = 1 << 6;
        /// Created at runtime (insert, autocreate, shadow) rather than registered.
        const ALLOC = 1 << 7;
        /// A Bool alias reads and writes the negation of its target.
        const ALIAS_NEGATE = 1 << 8;
    }
}

/// What a change hook tells the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Keep bubbling toward the root.
    Continue,
    /// Stop bubbling here.
    Handled,
}

/// Arguments passed to a change hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookCall {
    /// The context whose tree was written, if any.
    pub context: Option<ContextId>,
    /// The node whose hook is running.
    pub current: NodeId,
    /// The node that was written.  `None` for batch commits.
    pub changed: Option<NodeId>,
}

/// Callback invoked when a node or one of its descendants changes.
///
/// Hooks receive the tree mutably and may read or write any part of it.
pub type ChangeHook = Rc<dyn Fn(&mut OptionTree, &HookCall) -> HookOutcome>;

/// State of a node's entry in the option browser mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorState {
    pub visible: bool,
}

/// A named, typed configuration entry.
pub struct OptionNode {
    pub(crate) name: String,
    pub(crate) value: OptionValue,
    pub(crate) min: i64,
    pub(crate) max: i64,
    pub(crate) flags: OptionFlags,
    pub(crate) caption: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) change_hook: Option<ChangeHook>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) mirror: Option<MirrorState>,
}

impl OptionNode {
    /// Creates a detached node.  Bool nodes default to bounds `(0, 1)`.
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        let (min, max) = match value {
            OptionValue::Bool(_) => (0, 1),
            _ => (0, 0),
        };
        Self {
            name: name.into(),
            value,
            min,
            max,
            flags: OptionFlags::empty(),
            caption: None,
            description: None,
            change_hook: None,
            parent: None,
            mirror: None,
        }
    }

    /// Shorthand for an empty tree node.
    pub fn tree(name: impl Into<String>) -> Self {
        Self::new(name, OptionValue::tree())
    }

    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_flags(mut self, flags: OptionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hook(mut self, hook: ChangeHook) -> Self {
        self.change_hook = Some(hook);
        self
    }

    /// Gives the node an entry in the option browser mirror.
    pub fn mirrored(mut self) -> Self {
        self.mirror = Some(MirrorState { visible: true });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OptionKind {
        self.value.kind()
    }

    pub fn value(&self) -> &OptionValue {
        &self.value
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    pub fn flags(&self) -> OptionFlags {
        self.flags
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn mirror(&self) -> Option<MirrorState> {
        self.mirror
    }

    pub fn has_hook(&self) -> bool {
        self.change_hook.is_some()
    }

    pub fn is_tree(&self) -> bool {
        matches!(self.value, OptionValue::Tree(_))
    }

    pub fn is_template(&self) -> bool {
        self.name == TEMPLATE_NAME
    }

    /// Children in order; empty for every non-tree node.
    pub fn children(&self) -> &[NodeId] {
        match &self.value {
            OptionValue::Tree(children) => children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.value {
            OptionValue::Tree(children) => Some(children),
            _ => None,
        }
    }

    /// Copies value and metadata into a new detached node.
    ///
    /// Tree values come back empty; the copy has no parent and is marked
    /// [`OptionFlags::ALLOC`].  The mirror entry is copied as-is so callers
    /// decide whether the copy is browsable.
    pub(crate) fn detached_copy(&self) -> OptionNode {
        let value = match &self.value {
            OptionValue::Tree(_) => OptionValue::tree(),
            other => other.clone(),
        };
        OptionNode {
            name: self.name.clone(),
            value,
            min: self.min,
            max: self.max,
            flags: self.flags | OptionFlags::ALLOC,
            caption: self.caption.clone(),
            description: self.description.clone(),
            change_hook: self.change_hook.clone(),
            parent: None,
            mirror: self.mirror,
        }
    }
}

impl fmt::Debug for OptionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionNode")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("bounds", &(self.min, self.max))
            .field("flags", &self.flags)
            .field("parent", &self.parent)
            .field("has_hook", &self.change_hook.is_some())
            .field("mirror", &self.mirror)
            .finish()
    }
}
