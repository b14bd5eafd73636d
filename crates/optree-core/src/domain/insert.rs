//! Linking nodes into a parent tree.
//!
//! Unsorted parents append.  [`OptionFlags::SORT`] parents keep their children
//! in one total order:
//!
//! ```text
//! (class, template-first, name)
//!   class           0 for trees, 1 for everything else
//!   template-first  `_template_` sorts before its same-class siblings
//!   name            byte-wise
//! ```
//!
//! A new node goes after every sibling whose key is less than or equal to its
//! own, so equal keys keep insertion order.

use std::cmp::Ordering;

use tracing::{error, trace};

use super::node::{NodeId, OptionFlags, OptionNode, TEMPLATE_NAME};
use super::tree::{OptionTree, TreeError};

type SortKey<'a> = (u8, bool, &'a [u8]);

fn sort_key(node: &OptionNode) -> SortKey<'_> {
    let class = if node.is_tree() { 0 } else { 1 };
    (class, !node.is_template(), node.name.as_bytes())
}

impl OptionTree {
    /// Inserts a runtime-created node under `parent` and marks it
    /// [`OptionFlags::ALLOC`].
    ///
    /// Any children already listed in `node`'s tree value are dropped; build
    /// subtrees by inserting parents first.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotATree`] when `parent` cannot hold children and
    /// [`TreeError::DuplicateName`] when a sibling already has the name.  The
    /// tree is unchanged on error.
    pub fn insert(&mut self, parent: NodeId, mut node: OptionNode) -> Result<NodeId, TreeError> {
        node.flags.insert(OptionFlags::ALLOC);
        self.insert_node(parent, node)
    }

    /// Inserts `node` keeping its flags as given.
    pub(crate) fn insert_node(&mut self, parent: NodeId, mut node: OptionNode) -> Result<NodeId, TreeError> {
        self.check_insertable(parent, &node.name)?;
        if let Some(children) = node.children_mut() {
            children.clear();
        }
        node.parent = None;
        let id = self.alloc(node);
        self.link(parent, id)?;
        Ok(id)
    }

    /// Links an allocated, detached node (and its subtree) under `parent`.
    ///
    /// Applies the sort order, the template mirror rule and template
    /// description inheritance, then announces the node to the observer.
    pub(crate) fn link(&mut self, parent: NodeId, id: NodeId) -> Result<(), TreeError> {
        let name = self.node(id)?.name.clone();
        self.check_insertable(parent, &name)?;

        let inherited = self.inherited_description(parent, id);
        let position = self.sorted_position(parent, id);
        let mirror = self.initial_mirror(self.node(id)?);

        let node = self.node_mut(id)?;
        node.parent = Some(parent);
        node.mirror = mirror;
        if inherited.is_some() {
            node.description = inherited;
        }
        if let Some(children) = self.get_mut(parent).and_then(OptionNode::children_mut) {
            let position = position.unwrap_or(children.len());
            children.insert(position, id);
        }

        trace!(%name, %parent, "linked option");
        self.announce(id);
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, name: &str) -> Result<(), TreeError> {
        let parent_node = self.node(parent)?;
        if !parent_node.is_tree() {
            error!(parent = %parent_node.name, %name, "cannot insert into a non-tree option");
            return Err(TreeError::NotATree(parent_node.name.clone()));
        }
        if self.child(parent, name).is_some() {
            return Err(TreeError::DuplicateName {
                name: name.to_string(),
                parent: parent_node.name.clone(),
            });
        }
        Ok(())
    }

    /// Description a node linked under an autocreating tree inherits from the
    /// tree's template.
    fn inherited_description(&self, parent: NodeId, id: NodeId) -> Option<String> {
        let node = self.get(id)?;
        let parent_node = self.get(parent)?;
        if node.description.is_some() || !parent_node.flags.contains(OptionFlags::AUTOCREATE) {
            return None;
        }
        let template = self.child(parent, TEMPLATE_NAME)?;
        self.get(template)?.description.clone()
    }

    /// Index to insert `id` at under a sorting parent; `None` means append.
    fn sorted_position(&self, parent: NodeId, id: NodeId) -> Option<usize> {
        let parent_node = self.get(parent)?;
        if !parent_node.flags.contains(OptionFlags::SORT) {
            return None;
        }
        let key = sort_key(self.get(id)?);
        let siblings = parent_node.children();

        let last = siblings.last().and_then(|last| self.get(*last))?;
        if sort_key(last).cmp(&key) != Ordering::Greater {
            return None;
        }

        siblings
            .iter()
            .position(|sibling| self.get(*sibling).is_some_and(|s| sort_key(s) > key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::observer::{MockTreeObserver, TreeEvent};
    use crate::value::OptionValue;

    fn names(tree: &OptionTree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .iter()
            .map(|id| tree.node(*id).unwrap().name().to_string())
            .collect()
    }

    fn sorted_tree() -> (OptionTree, NodeId) {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let parent = tree.insert(root, OptionNode::tree("p").with_flags(OptionFlags::SORT)).unwrap();
        (tree, parent)
    }

    #[test]
    fn test_unsorted_parent_appends() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        tree.insert(root, OptionNode::new("b", OptionValue::Int(0))).unwrap();
        tree.insert(root, OptionNode::new("a", OptionValue::Int(0))).unwrap();
        assert_eq!(names(&tree, root), vec!["b", "a"]);
    }

    #[test]
    fn test_sorted_parent_puts_trees_first_then_names() {
        // Arrange
        let (mut tree, p) = sorted_tree();

        // Act
        tree.insert(p, OptionNode::new("banana", OptionValue::Int(0))).unwrap();
        tree.insert(p, OptionNode::new("apple", OptionValue::Int(0))).unwrap();
        tree.insert(p, OptionNode::tree("config")).unwrap();

        // Assert
        assert_eq!(names(&tree, p), vec!["config", "apple", "banana"]);
    }

    #[test]
    fn test_template_sorts_first_within_its_class() {
        let (mut tree, p) = sorted_tree();
        tree.insert(p, OptionNode::tree("ZZZ")).unwrap();
        tree.insert(p, OptionNode::tree("AAA")).unwrap();
        tree.insert(p, OptionNode::tree(TEMPLATE_NAME)).unwrap();
        tree.insert(p, OptionNode::new("leaf", OptionValue::Int(0))).unwrap();

        assert_eq!(names(&tree, p), vec![TEMPLATE_NAME, "AAA", "ZZZ", "leaf"]);
    }

    #[test]
    fn test_template_leaf_does_not_jump_ahead_of_trees() {
        let (mut tree, p) = sorted_tree();
        tree.insert(p, OptionNode::tree("folder")).unwrap();
        tree.insert(p, OptionNode::new("a", OptionValue::Int(0))).unwrap();
        tree.insert(p, OptionNode::new(TEMPLATE_NAME, OptionValue::Int(0))).unwrap();

        assert_eq!(names(&tree, p), vec!["folder", TEMPLATE_NAME, "a"]);
    }

    #[test]
    fn test_duplicate_name_is_rejected_without_change() {
        let (mut tree, p) = sorted_tree();
        tree.insert(p, OptionNode::new("a", OptionValue::Int(0))).unwrap();
        let before = tree.len();

        let result = tree.insert(p, OptionNode::new("a", OptionValue::Int(1)));

        assert_eq!(result, Err(TreeError::DuplicateName { name: "a".into(), parent: "p".into() }));
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn test_insert_into_leaf_is_rejected() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let leaf = tree.insert(root, OptionNode::new("leaf", OptionValue::Int(0))).unwrap();

        let result = tree.insert(leaf, OptionNode::new("x", OptionValue::Int(0)));

        assert_eq!(result, Err(TreeError::NotATree("leaf".into())));
    }

    #[test]
    fn test_autocreate_children_inherit_template_description() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let auto = tree.insert(root, OptionNode::tree("auto").with_flags(OptionFlags::AUTOCREATE)).unwrap();
        tree.insert(auto, OptionNode::tree(TEMPLATE_NAME).with_description("Per-item settings")).unwrap();

        let plain = tree.insert(auto, OptionNode::tree("one")).unwrap();
        let own = tree.insert(auto, OptionNode::tree("two").with_description("Mine")).unwrap();

        assert_eq!(tree.node(plain).unwrap().description(), Some("Per-item settings"));
        assert_eq!(tree.node(own).unwrap().description(), Some("Mine"));
    }

    #[test]
    fn test_template_mirror_hidden_unless_shown() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let hidden = tree.insert(root, OptionNode::tree(TEMPLATE_NAME).mirrored()).unwrap();
        assert_eq!(tree.node(hidden).unwrap().mirror().map(|m| m.visible), Some(false));

        let mut shown_tree = OptionTree::new("");
        shown_tree.set_show_templates(true);
        let shown_root = shown_tree.root();
        let shown = shown_tree.insert(shown_root, OptionNode::tree(TEMPLATE_NAME).mirrored()).unwrap();
        assert_eq!(shown_tree.node(shown).unwrap().mirror().map(|m| m.visible), Some(true));
    }

    #[test]
    fn test_observer_sees_mirror_positions_skipping_unmirrored_and_deleted() {
        // Arrange
        let (mut tree, p) = sorted_tree();
        let a = tree.insert(p, OptionNode::new("a", OptionValue::Int(0)).mirrored()).unwrap();
        tree.insert(p, OptionNode::new("b", OptionValue::Int(0))).unwrap();
        tree.add_flags(a, OptionFlags::DELETED).unwrap();
        tree.insert(p, OptionNode::new("d", OptionValue::Int(0)).mirrored()).unwrap();

        let mut observer = MockTreeObserver::new();
        observer
            .expect_on_event()
            .withf(|event| matches!(event, TreeEvent::Inserted { name, position: 0, visible: true, .. } if name == "c"))
            .times(1)
            .return_const(());
        tree.attach_observer(Box::new(observer));

        // Act
        tree.insert(p, OptionNode::new("c", OptionValue::Int(0)).mirrored()).unwrap();

        // Assert
        assert_eq!(names(&tree, p), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unmirrored_insert_emits_nothing() {
        let mut tree = OptionTree::new("");
        let root = tree.root();
        let mut observer = MockTreeObserver::new();
        observer.expect_on_event().times(0);
        tree.attach_observer(Box::new(observer));

        tree.insert(root, OptionNode::new("quiet", OptionValue::Int(0))).unwrap();
    }
}
