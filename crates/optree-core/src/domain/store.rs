//! The canonical option tree plus one overlay tree per context.
//!
//! A *context* is anything that wants its own copy of some options (a browsing
//! session, a document, a tab).  Reads in a context look at the overlay first
//! and fall back to the canonical tree; writes in a context materialize the
//! option in the overlay and never touch the canonical value.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use super::node::{NodeId, OptionFlags};
use super::shadow::shadow_of;
use super::tree::{LookupMode, OptionTree, TreeError};
use crate::value::OptionValue;

/// Identifies one overlay context.
pub type ContextId = Uuid;

/// Owns the canonical tree and the overlay trees of every open context.
#[derive(Debug)]
pub struct OptionStore {
    tree: OptionTree,
    config_root: NodeId,
    contexts: HashMap<ContextId, OptionTree>,
}

impl OptionStore {
    /// Wraps a canonical tree.  Paths are resolved from its root until
    /// [`set_config_root`](Self::set_config_root) says otherwise.
    pub fn new(tree: OptionTree) -> Self {
        let config_root = tree.root();
        Self { tree, config_root, contexts: HashMap::new() }
    }

    pub fn tree(&self) -> &OptionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut OptionTree {
        &mut self.tree
    }

    /// The canonical node that overlay roots stand for.
    pub fn config_root(&self) -> NodeId {
        self.config_root
    }

    /// Changes the node paths are resolved from.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a freed id and
    /// [`TreeError::NotATree`] for a leaf.
    pub fn set_config_root(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.tree.node(id)?;
        if !node.is_tree() {
            return Err(TreeError::NotATree(node.name().to_string()));
        }
        self.config_root = id;
        Ok(())
    }

    // ── Contexts ──────────────────────────────────────────────────────────────

    /// Opens a context with a fresh random id.
    pub fn open_context(&mut self) -> ContextId {
        let id = Uuid::new_v4();
        self.open_context_with_id(id);
        id
    }

    /// Opens a context under a caller-chosen id.  Opening an id that is
    /// already open keeps the existing overlay.
    pub fn open_context_with_id(&mut self, id: ContextId) {
        let root_name = self.tree.get(self.config_root).map(|n| n.name().to_string()).unwrap_or_default();
        self.contexts.entry(id).or_insert_with(|| {
            debug!(context = %id, "opened option context");
            OptionTree::new(&root_name)
        });
    }

    /// Closes a context and frees its overlay.  Returns the number of overlay
    /// nodes freed, root excluded.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownContext`] when the context is not open.
    pub fn close_context(&mut self, id: ContextId) -> Result<usize, TreeError> {
        let mut overlay = self.contexts.remove(&id).ok_or(TreeError::UnknownContext(id))?;
        let root = overlay.root();
        let freed = overlay
            .children(root)
            .to_vec()
            .into_iter()
            .map(|child| overlay.remove_subtree(child))
            .sum();
        info!(context = %id, freed, "closed option context");
        Ok(freed)
    }

    pub fn context_tree(&self, id: ContextId) -> Option<&OptionTree> {
        self.contexts.get(&id)
    }

    pub fn context_tree_mut(&mut self, id: ContextId) -> Option<&mut OptionTree> {
        self.contexts.get_mut(&id)
    }

    /// Ids of every open context, in no particular order.
    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.contexts.keys().copied()
    }

    // ── Values ────────────────────────────────────────────────────────────────

    /// Resolves a canonical path below the config root.
    ///
    /// # Errors
    ///
    /// See [`OptionTree::resolve`].
    pub fn resolve(&mut self, path: &str, mode: LookupMode) -> Result<NodeId, TreeError> {
        self.tree.resolve(self.config_root, path, mode)
    }

    /// The node whose kind and bounds govern writes to `path`.  See
    /// [`OptionTree::prototype`]; nothing is autocreated.
    ///
    /// # Errors
    ///
    /// See [`OptionTree::resolve`].
    pub fn prototype(&self, path: &str) -> Result<NodeId, TreeError> {
        self.tree.prototype(self.config_root, path)
    }

    /// Reads an option.  With a context, the overlay copy wins when there is
    /// one; otherwise the canonical value is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownContext`] for a closed context and
    /// resolution or alias errors for the path.
    pub fn get_value(&mut self, path: &str, context: Option<ContextId>) -> Result<OptionValue, TreeError> {
        if let Some(context) = context {
            let overlay = self.contexts.get(&context).ok_or(TreeError::UnknownContext(context))?;
            if let Some(value) = self.overlay_value(overlay, path)? {
                return Ok(value);
            }
        }
        let id = self.resolve(path, LookupMode::Normal)?;
        self.tree.read_value(id)
    }

    fn overlay_value(&self, overlay: &OptionTree, path: &str) -> Result<Option<OptionValue>, TreeError> {
        let Ok(id) = self.tree.lookup(self.config_root, path) else {
            return Ok(None);
        };
        let target = self.tree.indirect(id)?;
        let Some(relative) = self.tree.path_from(self.config_root, target) else {
            return Ok(None);
        };
        let Ok(shadow) = overlay.lookup(overlay.root(), &relative) else {
            return Ok(None);
        };
        let value = overlay.node(shadow)?.value().clone();
        Ok(Some(self.apply_negation(id, target, value)?))
    }

    /// Writes an option.  With a context the value goes to the overlay,
    /// materializing the option there on first write; hooks then run in the
    /// overlay tree.  Returns the number of hooks invoked.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownContext`] for a closed context, resolution
    /// or alias errors for the path and validation errors for the value.
    /// A rejected write autocreates nothing.
    pub fn set_value(
        &mut self,
        path: &str,
        value: OptionValue,
        context: Option<ContextId>,
    ) -> Result<usize, TreeError> {
        if let Some(context) = context {
            if !self.contexts.contains_key(&context) {
                return Err(TreeError::UnknownContext(context));
            }
        }
        let prototype = self.prototype(path)?;
        let prototype_target = self.tree.indirect(prototype)?;
        let checked = self.apply_negation(prototype, prototype_target, value.clone())?;
        self.tree.check_value(prototype_target, &checked)?;

        let id = self.resolve(path, LookupMode::Normal)?;
        let Some(context) = context else {
            return self.tree.set_value(id, value, None);
        };

        let target = self.tree.indirect(id)?;
        let value = self.apply_negation(id, target, value)?;

        let overlay = self.contexts.get_mut(&context).ok_or(TreeError::UnknownContext(context))?;
        let overlay_root = overlay.root();
        let shadow = shadow_of(&self.tree, self.config_root, target, overlay, overlay_root)?;
        overlay.set_value(shadow, value, Some(context))
    }

    /// Makes sure the option at `path` has an overlay copy in `context`.
    ///
    /// # Errors
    ///
    /// Same as [`set_value`](Self::set_value), minus validation.
    pub fn materialize(&mut self, path: &str, context: ContextId) -> Result<NodeId, TreeError> {
        let id = self.resolve(path, LookupMode::Normal)?;
        let target = self.tree.indirect(id)?;
        let overlay = self.contexts.get_mut(&context).ok_or(TreeError::UnknownContext(context))?;
        let overlay_root = overlay.root();
        shadow_of(&self.tree, self.config_root, target, overlay, overlay_root)
    }

    fn apply_negation(&self, alias: NodeId, target: NodeId, value: OptionValue) -> Result<OptionValue, TreeError> {
        let negate = alias != target && self.tree.node(alias)?.flags().contains(OptionFlags::ALIAS_NEGATE);
        Ok(match value {
            OptionValue::Bool(b) if negate => OptionValue::Bool(!b),
            other => other,
        })
    }
}
