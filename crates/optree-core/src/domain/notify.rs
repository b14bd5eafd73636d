//! Value writes and change-hook dispatch.
//!
//! Every write marks the option [`OptionFlags::TOUCHED`] and then bubbles a
//! change notification from the option toward the root.  Each ancestor with a
//! hook is called in turn until one answers [`HookOutcome::Handled`].
//!
//! The chain is captured before the first hook runs.  Hooks get the tree
//! mutably and may insert or delete nodes; an entry freed by an earlier hook
//! ends the walk instead of being called.

use tracing::{debug, warn};

use super::node::{HookCall, HookOutcome, NodeId, OptionFlags};
use super::store::ContextId;
use super::tree::{LookupMode, OptionTree, TreeError};
use crate::value::{OptionKind, OptionValue};

impl OptionTree {
    /// Validates and stores `value` in `id` (through aliases), then runs
    /// [`option_changed`](Self::option_changed) on the written node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::KindMismatch`] when the value kind differs from
    /// the option's, [`TreeError::Value`] when it fails validation and alias
    /// errors from [`indirect`](Self::indirect).  Nothing is written on error.
    pub fn set_value(
        &mut self,
        id: NodeId,
        value: OptionValue,
        context: Option<ContextId>,
    ) -> Result<usize, TreeError> {
        let negate = self.node(id)?.flags.contains(OptionFlags::ALIAS_NEGATE);
        let target = self.indirect(id)?;
        let value = match value {
            OptionValue::Bool(b) if negate && target != id => OptionValue::Bool(!b),
            other => other,
        };
        self.store_value(target, value)?;
        self.option_changed(target, context)
    }

    /// Replaces a node's value without notifying anybody.
    ///
    /// # Errors
    ///
    /// Same as [`set_value`](Self::set_value), minus alias handling.
    pub(crate) fn store_value(&mut self, id: NodeId, value: OptionValue) -> Result<bool, TreeError> {
        self.check_value(id, &value)?;
        let node = self.node_mut(id)?;
        let changed = node.value != value;
        node.value = value;
        Ok(changed)
    }

    /// Checks that `value` could be stored in `id`: same kind, not a tree,
    /// within bounds.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::KindMismatch`] or [`TreeError::Value`].
    pub fn check_value(&self, id: NodeId, value: &OptionValue) -> Result<(), TreeError> {
        let node = self.node(id)?;
        let (expected, found) = (node.kind(), value.kind());
        if expected != found || found == OptionKind::Tree {
            return Err(TreeError::KindMismatch {
                name: node.name.clone(),
                expected: expected.name(),
                found: found.name(),
            });
        }
        value.validate(node.min, node.max)?;
        Ok(())
    }

    /// Marks `id` touched and bubbles its change hooks.
    ///
    /// Returns the number of hooks invoked.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for freed ids.
    pub fn option_changed(&mut self, id: NodeId, context: Option<ContextId>) -> Result<usize, TreeError> {
        self.add_flags(id, OptionFlags::TOUCHED)?;
        Ok(self.call_change_hooks(id, Some(id), context))
    }

    /// Calls the hooks of `start` and its ancestors until one reports
    /// [`HookOutcome::Handled`].  Returns the number of hooks invoked.
    pub fn call_change_hooks(
        &mut self,
        start: NodeId,
        changed: Option<NodeId>,
        context: Option<ContextId>,
    ) -> usize {
        let chain = self.ancestry(start);
        let mut invoked = 0;
        for current in chain {
            let Some(node) = self.get(current) else {
                debug!(%current, "change hook chain interrupted by a freed option");
                break;
            };
            let Some(hook) = node.change_hook.clone() else { continue };

            invoked += 1;
            let call = HookCall { context, current, changed };
            if hook(self, &call) == HookOutcome::Handled {
                break;
            }
        }
        invoked
    }

    /// Advances a Bool or Int option: Bool flips, Int counts up and wraps past
    /// `max` back to `min`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::KindMismatch`] for any other kind.
    pub fn toggle(&mut self, id: NodeId, context: Option<ContextId>) -> Result<usize, TreeError> {
        let target = self.indirect(id)?;
        let node = self.node(target)?;
        let next = match node.value {
            OptionValue::Bool(b) => OptionValue::Bool(!b),
            OptionValue::Int(n) => {
                let bumped = i64::from(n) + 1;
                let wrapped = if bumped <= node.max { bumped } else { node.min };
                OptionValue::Int(i32::try_from(wrapped).unwrap_or(i32::MIN))
            }
            ref other => {
                return Err(TreeError::KindMismatch {
                    name: node.name.clone(),
                    expected: "Boolean or Integer",
                    found: other.kind().name(),
                })
            }
        };
        self.store_value(target, next)?;
        self.option_changed(target, context)
    }

    /// Writes a batch of values below `root`.
    ///
    /// Every value is checked before anything is written.  Each option whose
    /// value actually changes is marked touched and has its own hook called;
    /// the hook chain then runs once from `root`.  Returns the number of
    /// changed options.
    ///
    /// # Errors
    ///
    /// Returns the first resolution or validation error; the tree is
    /// untouched in that case, and no option has been autocreated.
    pub fn commit_values(
        &mut self,
        root: NodeId,
        values: &[(&str, OptionValue)],
        context: Option<ContextId>,
    ) -> Result<usize, TreeError> {
        for (path, value) in values {
            let prototype = self.prototype(root, path)?;
            self.check_value(prototype, value).inspect_err(|err| {
                warn!(%path, error = %err, "rejected batch value");
            })?;
        }
        let targets = values
            .iter()
            .map(|(path, _)| self.resolve(root, path, LookupMode::Normal))
            .collect::<Result<Vec<_>, _>>()?;

        let mut changed = 0;
        for (id, (_, value)) in targets.into_iter().zip(values) {
            if !self.store_value(id, value.clone())? {
                continue;
            }
            self.add_flags(id, OptionFlags::TOUCHED)?;
            if let Some(hook) = self.get(id).and_then(|node| node.change_hook.clone()) {
                hook(self, &HookCall { context, current: id, changed: None });
            }
            changed += 1;
        }

        self.call_change_hooks(root, None, context);
        Ok(changed)
    }

    /// Reads a batch of values below `root`, in the order of `paths`.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn checkout_values(&mut self, root: NodeId, paths: &[&str]) -> Result<Vec<OptionValue>, TreeError> {
        paths
            .iter()
            .map(|path| {
                let id = self.resolve(root, path, LookupMode::Normal)?;
                Ok(self.node(id)?.value.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::domain::node::{ChangeHook, OptionNode, TEMPLATE_NAME};
    use crate::value::ValueError;

    fn recording_hook(log: &Rc<RefCell<Vec<String>>>, label: &str, outcome: HookOutcome) -> ChangeHook {
        let log = Rc::clone(log);
        let label = label.to_string();
        Rc::new(move |_tree: &mut OptionTree, _call: &HookCall| {
            log.borrow_mut().push(label.clone());
            outcome
        })
    }

    fn chain() -> (OptionTree, NodeId, NodeId, NodeId) {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let a = tree.insert(root, OptionNode::tree("a")).unwrap();
        let b = tree.insert(a, OptionNode::tree("b")).unwrap();
        let c = tree.insert(b, OptionNode::new("c", OptionValue::Int(1)).with_bounds(0, 5)).unwrap();
        (tree, a, b, c)
    }

    #[test]
    fn test_hooks_bubble_until_handled() {
        // Arrange
        let (mut tree, a, b, c) = chain();
        let log = Rc::new(RefCell::new(Vec::new()));
        tree.set_change_hook(c, Some(recording_hook(&log, "c", HookOutcome::Continue))).unwrap();
        tree.set_change_hook(b, Some(recording_hook(&log, "b", HookOutcome::Handled))).unwrap();
        tree.set_change_hook(a, Some(recording_hook(&log, "a", HookOutcome::Continue))).unwrap();

        // Act
        let invoked = tree.set_value(c, OptionValue::Int(2), None).unwrap();

        // Assert
        assert_eq!(invoked, 2);
        assert_eq!(*log.borrow(), vec!["c", "b"]);
        assert!(tree.node(c).unwrap().flags().contains(OptionFlags::TOUCHED));
    }

    #[test]
    fn test_hook_receives_context_and_changed_node() {
        let (mut tree, a, _, c) = chain();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        tree.set_change_hook(
            a,
            Some(Rc::new(move |_: &mut OptionTree, call: &HookCall| {
                *sink.borrow_mut() = Some(*call);
                HookOutcome::Continue
            })),
        )
        .unwrap();
        let context = uuid::Uuid::new_v4();

        tree.set_value(c, OptionValue::Int(4), Some(context)).unwrap();

        assert_eq!(*seen.borrow(), Some(HookCall { context: Some(context), current: a, changed: Some(c) }));
    }

    #[test]
    fn test_hook_that_deletes_an_ancestor_stops_the_walk() {
        let (mut tree, a, b, c) = chain();
        let log = Rc::new(RefCell::new(Vec::new()));
        tree.set_change_hook(
            c,
            Some(Rc::new(move |tree: &mut OptionTree, _: &HookCall| {
                tree.remove_subtree(b);
                HookOutcome::Continue
            })),
        )
        .unwrap();
        tree.set_change_hook(a, Some(recording_hook(&log, "a", HookOutcome::Continue))).unwrap();

        let invoked = tree.option_changed(c, None).unwrap();

        assert_eq!(invoked, 1);
        assert!(log.borrow().is_empty());
        assert!(!tree.contains(c));
    }

    #[test]
    fn test_set_value_rejects_out_of_range_without_writing() {
        let (mut tree, _, _, c) = chain();

        let result = tree.set_value(c, OptionValue::Int(9), None);

        assert_eq!(
            result,
            Err(TreeError::Value(ValueError::OutOfRange { value: 9, min: 0, max: 5 }))
        );
        assert_eq!(tree.node(c).unwrap().value(), &OptionValue::Int(1));
        assert!(!tree.node(c).unwrap().flags().contains(OptionFlags::TOUCHED));
    }

    #[test]
    fn test_set_value_rejects_kind_mismatch() {
        let (mut tree, a, _, c) = chain();
        assert!(matches!(
            tree.set_value(c, OptionValue::Bool(true), None),
            Err(TreeError::KindMismatch { .. })
        ));
        assert!(matches!(
            tree.set_value(a, OptionValue::tree(), None),
            Err(TreeError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_set_value_through_negated_alias() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let target = tree.insert(root, OptionNode::new("show", OptionValue::Bool(true))).unwrap();
        let alias = tree
            .insert(
                root,
                OptionNode::new("hide", OptionValue::Alias("show".into())).with_flags(OptionFlags::ALIAS_NEGATE),
            )
            .unwrap();

        tree.set_value(alias, OptionValue::Bool(true), None).unwrap();

        assert_eq!(tree.node(target).unwrap().value(), &OptionValue::Bool(false));
        assert!(tree.node(target).unwrap().flags().contains(OptionFlags::TOUCHED));
    }

    #[test]
    fn test_toggle_wraps_int_and_flips_bool() {
        let (mut tree, _, b, c) = chain();
        tree.set_value(c, OptionValue::Int(5), None).unwrap();

        tree.toggle(c, None).unwrap();
        assert_eq!(tree.node(c).unwrap().value(), &OptionValue::Int(0));

        let flag = tree.insert(b, OptionNode::new("flag", OptionValue::Bool(false))).unwrap();
        tree.toggle(flag, None).unwrap();
        assert_eq!(tree.node(flag).unwrap().value(), &OptionValue::Bool(true));

        let text = tree.insert(b, OptionNode::new("text", OptionValue::String("x".into()))).unwrap();
        assert!(matches!(tree.toggle(text, None), Err(TreeError::KindMismatch { .. })));
    }

    #[test]
    fn test_commit_values_counts_only_real_changes() {
        // Arrange
        let (mut tree, a, b, c) = chain();
        let flag = tree.insert(b, OptionNode::new("flag", OptionValue::Bool(false))).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        tree.set_change_hook(flag, Some(recording_hook(&log, "flag", HookOutcome::Handled))).unwrap();
        tree.set_change_hook(c, Some(recording_hook(&log, "c", HookOutcome::Handled))).unwrap();
        tree.set_change_hook(a, Some(recording_hook(&log, "a", HookOutcome::Continue))).unwrap();

        // Act
        let changed = tree
            .commit_values(a, &[("b.c", OptionValue::Int(1)), ("b.flag", OptionValue::Bool(true))], None)
            .unwrap();

        // Assert
        assert_eq!(changed, 1);
        assert_eq!(*log.borrow(), vec!["flag", "a"]);
        assert!(!tree.node(c).unwrap().flags().contains(OptionFlags::TOUCHED));
        assert!(tree.node(flag).unwrap().flags().contains(OptionFlags::TOUCHED));
    }

    #[test]
    fn test_commit_values_is_all_or_nothing() {
        let (mut tree, a, b, c) = chain();
        let flag = tree.insert(b, OptionNode::new("flag", OptionValue::Bool(false))).unwrap();

        let result = tree.commit_values(a, &[("b.flag", OptionValue::Bool(true)), ("b.c", OptionValue::Int(99))], None);

        assert!(result.is_err());
        assert_eq!(tree.node(flag).unwrap().value(), &OptionValue::Bool(false));
        assert_eq!(tree.node(c).unwrap().value(), &OptionValue::Int(1));
    }

    #[test]
    fn test_rejected_commit_autocreates_nothing() {
        // Arrange
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let terminal = tree.insert(root, OptionNode::tree("terminal").with_flags(OptionFlags::AUTOCREATE)).unwrap();
        let template = tree.insert(terminal, OptionNode::tree(TEMPLATE_NAME)).unwrap();
        tree.insert(template, OptionNode::new("colors", OptionValue::Int(0)).with_bounds(0, 3)).unwrap();
        let before = tree.len();

        // Act
        let result = tree.commit_values(
            root,
            &[("terminal.xterm.colors", OptionValue::Int(1)), ("terminal.linux.colors", OptionValue::Int(99))],
            None,
        );

        // Assert
        assert!(matches!(result, Err(TreeError::Value(ValueError::OutOfRange { value: 99, .. }))));
        assert_eq!(tree.len(), before);
        assert!(tree.lookup(root, "terminal.xterm").is_err());

        let changed = tree
            .commit_values(
                root,
                &[("terminal.xterm.colors", OptionValue::Int(1)), ("terminal.linux.colors", OptionValue::Int(3))],
                None,
            )
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(tree.len(), before + 4);
    }

    #[test]
    fn test_hook_writing_another_option_keeps_outer_walk() {
        // Arrange
        let (mut tree, a, b, c) = chain();
        let root = tree.root();
        let other = tree.insert(root, OptionNode::new("other", OptionValue::Int(0)).with_bounds(0, 5)).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        tree.set_change_hook(
            b,
            Some(Rc::new(move |tree: &mut OptionTree, _: &HookCall| {
                sink.borrow_mut().push("b".to_string());
                tree.set_value(other, OptionValue::Int(1), None).ok();
                HookOutcome::Continue
            })),
        )
        .unwrap();
        let sink = Rc::clone(&log);
        tree.set_change_hook(
            root,
            Some(Rc::new(move |tree: &mut OptionTree, call: &HookCall| {
                let changed = call.changed.and_then(|id| tree.get(id)).map(|n| n.name().to_string());
                sink.borrow_mut().push(format!("root<-{}", changed.unwrap_or_default()));
                HookOutcome::Continue
            })),
        )
        .unwrap();

        // Act
        let invoked = tree.set_value(c, OptionValue::Int(2), None).unwrap();

        // Assert
        assert_eq!(*log.borrow(), vec!["b", "root<-other", "root<-c"]);
        assert_eq!(invoked, 2);
        assert!(tree.node(a).unwrap().children().contains(&b));
        assert_eq!(tree.node(other).unwrap().value(), &OptionValue::Int(1));
    }

    #[test]
    fn test_checkout_values_reads_in_order() {
        let (mut tree, a, b, _) = chain();
        tree.insert(b, OptionNode::new("flag", OptionValue::Bool(true))).unwrap();

        let values = tree.checkout_values(a, &["b.flag", "b.c"]).unwrap();

        assert_eq!(values, vec![OptionValue::Bool(true), OptionValue::Int(1)]);
        assert!(tree.checkout_values(a, &["b.nope"]).is_err());
    }
}
