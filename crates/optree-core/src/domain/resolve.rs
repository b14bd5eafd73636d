//! Dotted-path lookup, autocreation and alias indirection.
//!
//! A path such as `terminal.xterm.colors` is walked one segment at a time
//! from a starting tree.  Every intermediate node must be a visible tree.
//! When a segment is missing under an [`OptionFlags::AUTOCREATE`] tree and the
//! lookup runs in [`LookupMode::Normal`], the tree's `_template_` child is
//! deep-copied, renamed and linked in its place.

use tracing::{debug, error};

use super::node::{NodeId, OptionFlags, OptionNode, TEMPLATE_NAME};
use super::tree::{LookupMode, OptionTree, TreeError};
use crate::value::OptionValue;

impl OptionTree {
    /// Direct child of `parent` named exactly `name`.  Never creates.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|node| node.name == name))
    }

    /// Strict lookup: resolves `path` below `start` without modifying the tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] when any segment is missing or an
    /// intermediate node is not a visible tree.
    pub fn lookup(&self, start: NodeId, path: &str) -> Result<NodeId, TreeError> {
        let not_found = || TreeError::NotFound(path.to_string());
        let mut current = start;
        for (depth, segment) in path.split('.').enumerate() {
            if depth > 0 {
                self.check_traversable(current).map_err(|_| not_found())?;
            }
            current = self.child(current, segment).ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Resolves `path` below `start`, autocreating missing children from
    /// templates when `mode` is [`LookupMode::Normal`].
    ///
    /// Repeated resolution of the same path returns the same id for as long
    /// as the node lives.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] for an unresolvable path and
    /// [`TreeError::MissingTemplate`] when an autocreating tree has no
    /// `_template_` child.
    pub fn resolve(&mut self, start: NodeId, path: &str, mode: LookupMode) -> Result<NodeId, TreeError> {
        if mode == LookupMode::Strict {
            return self.lookup(start, path);
        }

        let not_found = || TreeError::NotFound(path.to_string());
        let mut current = start;
        let mut consumed = 0;
        for (depth, segment) in path.split('.').enumerate() {
            if depth > 0 {
                self.check_traversable(current).map_err(|_| not_found())?;
                consumed += 1;
            }
            consumed += segment.len();

            current = match self.child(current, segment) {
                Some(found) => found,
                None if !segment.is_empty() && self.is_autocreating(current) => {
                    self.autocreate(current, segment, &path[..consumed])?
                }
                None => return Err(not_found()),
            };
        }
        Ok(current)
    }

    /// Finds the node that carries the kind and bounds a
    /// [`LookupMode::Normal`] resolution of `path` would end on, without
    /// creating anything.
    ///
    /// A segment missing below an autocreating tree is looked up in that
    /// tree's `_template_` instead, so writes can be validated before any
    /// autocreation happens.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn prototype(&self, start: NodeId, path: &str) -> Result<NodeId, TreeError> {
        let not_found = || TreeError::NotFound(path.to_string());
        let mut current = start;
        let mut consumed = 0;
        for (depth, segment) in path.split('.').enumerate() {
            if depth > 0 {
                self.check_traversable(current).map_err(|_| not_found())?;
                consumed += 1;
            }
            consumed += segment.len();

            current = match self.child(current, segment) {
                Some(found) => found,
                None if !segment.is_empty() && self.is_autocreating(current) => self
                    .child(current, TEMPLATE_NAME)
                    .ok_or_else(|| TreeError::MissingTemplate {
                        path: path[..consumed].to_string(),
                        parent: self.path_of(current).unwrap_or_default(),
                    })?,
                None => return Err(not_found()),
            };
        }
        Ok(current)
    }

    /// Follows an alias to the option it names.  Other nodes indirect to
    /// themselves.
    ///
    /// Alias targets are looked up strictly from [`alias_root`](Self::alias_root)
    /// and are never autocreated.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DanglingAlias`] when the target does not resolve.
    pub fn indirect(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let node = self.node(id)?;
        let OptionValue::Alias(target) = &node.value else {
            return Ok(id);
        };
        self.lookup(self.alias_root(), target).map_err(|_| {
            error!(alias = %node.name, target = %target, "alias points at an unknown option");
            TreeError::DanglingAlias { alias: node.name.clone(), target: target.clone() }
        })
    }

    /// Reads a node's value through aliases, applying alias negation.
    ///
    /// # Errors
    ///
    /// Propagates [`indirect`](Self::indirect) errors.
    pub fn read_value(&self, id: NodeId) -> Result<OptionValue, TreeError> {
        let negate = self.node(id)?.flags.contains(OptionFlags::ALIAS_NEGATE);
        let target = self.indirect(id)?;
        let value = self.node(target)?.value.clone();
        Ok(match value {
            OptionValue::Bool(b) if negate && target != id => OptionValue::Bool(!b),
            other => other,
        })
    }

    /// Copies the subtree rooted at `source` into fresh, unlinked nodes.
    ///
    /// The copy keeps child order and is marked [`OptionFlags::ALLOC`]
    /// throughout.  Mirror entries are reset to their initial visibility.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] when `source` has been freed.
    pub(crate) fn deep_copy(&mut self, source: NodeId) -> Result<NodeId, TreeError> {
        let copy_root = self.alloc_copy(source)?;
        let mut pending = vec![(source, copy_root)];
        while let Some((from, to)) = pending.pop() {
            let children = self.children(from).to_vec();
            for child in children {
                let copied = self.alloc_copy(child)?;
                self.attach_unsorted(to, copied);
                pending.push((child, copied));
            }
        }
        Ok(copy_root)
    }

    fn alloc_copy(&mut self, source: NodeId) -> Result<NodeId, TreeError> {
        let mut copy: OptionNode = self.node(source)?.detached_copy();
        copy.mirror = self.initial_mirror(&copy);
        Ok(self.alloc(copy))
    }

    fn check_traversable(&self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node(id)?;
        if !node.is_tree() || node.flags.contains(OptionFlags::HIDDEN) {
            return Err(TreeError::NotATree(node.name.clone()));
        }
        Ok(())
    }

    fn is_autocreating(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.flags.contains(OptionFlags::AUTOCREATE))
    }

    fn autocreate(&mut self, parent: NodeId, name: &str, path: &str) -> Result<NodeId, TreeError> {
        let Some(template) = self.child(parent, TEMPLATE_NAME) else {
            let parent_path = self.path_of(parent).unwrap_or_default();
            error!(%path, parent = %parent_path, "autocreating tree has no _template_");
            return Err(TreeError::MissingTemplate { path: path.to_string(), parent: parent_path });
        };

        let created = self.deep_copy(template)?;
        if let Some(node) = self.get_mut(created) {
            node.name = name.to_string();
        }
        if let Err(err) = self.link(parent, created) {
            self.remove_subtree(created);
            return Err(err);
        }
        debug!(%path, "autocreated option from template");
        Ok(created)
    }
}
