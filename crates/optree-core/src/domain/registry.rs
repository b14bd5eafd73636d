//! Registering static option tables.
//!
//! Subsystems describe their options as a slice of [`OptionDefinition`]s and
//! register them in one call.  Registered nodes are not marked
//! [`OptionFlags::ALLOC`]; they are owned by the subsystem that registered them
//! and removed again with [`unregister_all`].

use tracing::{debug, error};

use super::node::{ChangeHook, NodeId, OptionFlags, OptionNode};
use super::tree::{LookupMode, OptionTree, TreeError};
use crate::value::{charset, Color, OptionValue, ValueError};

/// Initial value of a registered option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Tree,
    Bool(bool),
    Int(i32),
    Long(i64),
    String(&'static str),
    /// Color name or `#rrggbb`.
    Color(&'static str),
    Command(&'static str),
    /// Dotted path of the target option.
    Alias(&'static str),
    /// Codepage name.
    Codepage(&'static str),
    /// Languages always start at the system language.
    Language,
}

impl DefaultValue {
    fn to_value(self) -> Result<OptionValue, ValueError> {
        Ok(match self {
            DefaultValue::Tree => OptionValue::tree(),
            DefaultValue::Bool(b) => OptionValue::Bool(b),
            DefaultValue::Int(n) => OptionValue::Int(n),
            DefaultValue::Long(n) => OptionValue::Long(n),
            DefaultValue::String(s) => OptionValue::String(s.to_string()),
            DefaultValue::Color(c) => OptionValue::Color(Color::decode(c)?),
            DefaultValue::Command(c) => OptionValue::Command(c.to_string()),
            DefaultValue::Alias(a) => OptionValue::Alias(a.to_string()),
            DefaultValue::Codepage(name) => OptionValue::Codepage(
                charset::codepage_index(name).ok_or_else(|| ValueError::UnknownCodepage(name.to_string()))?,
            ),
            DefaultValue::Language => OptionValue::Language(0),
        })
    }
}

/// A static description of one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDefinition {
    /// Dotted path of the parent, relative to the registration root.  Empty
    /// for direct children of the root.
    pub path: &'static str,
    pub name: &'static str,
    pub caption: Option<&'static str>,
    pub description: Option<&'static str>,
    pub flags: OptionFlags,
    pub min: i64,
    pub max: i64,
    pub default: DefaultValue,
}

impl OptionDefinition {
    pub const fn new(path: &'static str, name: &'static str, default: DefaultValue) -> Self {
        let (min, max) = match default {
            DefaultValue::Bool(_) => (0, 1),
            _ => (0, 0),
        };
        Self { path, name, caption: None, description: None, flags: OptionFlags::empty(), min, max, default }
    }

    pub const fn tree(path: &'static str, name: &'static str) -> Self {
        Self::new(path, name, DefaultValue::Tree)
    }

    pub const fn bounds(mut self, min: i64, max: i64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub const fn flags(mut self, flags: OptionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn caption(mut self, caption: &'static str) -> Self {
        self.caption = Some(caption);
        self
    }

    pub const fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    fn kind_is_alias(&self) -> bool {
        matches!(self.default, DefaultValue::Alias(_))
    }
}

/// Result of [`register_all`].
#[derive(Debug, Default)]
pub struct Registration {
    /// Registered node ids, in definition order.
    pub ids: Vec<NodeId>,
    /// Definitions that could not be registered, with the reason.
    pub failures: Vec<(String, TreeError)>,
}

impl Registration {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registers every definition below `root`.
///
/// A failing definition does not stop the rest: its error is logged and
/// collected in [`Registration::failures`].  Options get a browser mirror
/// entry when `root` or the definition carries [`OptionFlags::LISTBOX`],
/// except aliases, which never do.
pub fn register_all(tree: &mut OptionTree, root: NodeId, definitions: &[OptionDefinition]) -> Registration {
    let listbox_root = tree
        .get(root)
        .is_some_and(|node| node.flags().contains(OptionFlags::LISTBOX));

    let mut registration = Registration::default();
    for definition in definitions {
        let full_path = if definition.path.is_empty() {
            definition.name.to_string()
        } else {
            format!("{}.{}", definition.path, definition.name)
        };
        match register_one(tree, root, definition, listbox_root) {
            Ok(id) => registration.ids.push(id),
            Err(err) => {
                error!(option = %full_path, error = %err, "failed to register option");
                registration.failures.push((full_path, err));
            }
        }
    }
    debug!(registered = registration.ids.len(), failed = registration.failures.len(), "registered option table");
    registration
}

fn register_one(
    tree: &mut OptionTree,
    root: NodeId,
    definition: &OptionDefinition,
    listbox_root: bool,
) -> Result<NodeId, TreeError> {
    let parent = if definition.path.is_empty() {
        root
    } else {
        tree.resolve(root, definition.path, LookupMode::Normal)?
    };

    let value = definition.default.to_value()?;
    let mut node = OptionNode::new(definition.name, value)
        .with_bounds(definition.min, definition.max)
        .with_flags(definition.flags - OptionFlags::ALLOC);
    if let OptionValue::String(text) = &mut node.value {
        truncate_default(text);
    }
    node.value.validate(definition.min, definition.max)?;
    if let Some(caption) = definition.caption {
        node = node.with_caption(caption);
    }
    if let Some(description) = definition.description {
        node = node.with_description(description);
    }
    if !definition.kind_is_alias() && (listbox_root || definition.flags.contains(OptionFlags::LISTBOX)) {
        node = node.mirrored();
    }

    tree.insert_node(parent, node)
}

fn truncate_default(text: &mut String) {
    let limit = crate::value::MAX_STR_LEN - 1;
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
}

/// Deletes the options of a registration in reverse order.  Returns the
/// number of nodes freed.
///
/// Ids already freed (for example together with an earlier parent) are
/// skipped.
pub fn unregister_all(tree: &mut OptionTree, registration: &Registration) -> usize {
    registration
        .ids
        .iter()
        .rev()
        .filter_map(|id| tree.hard_delete(*id).ok())
        .sum()
}

/// Installs change hooks on the options named by dotted paths below `root`.
///
/// A node has at most one hook; registering again replaces it.
///
/// # Errors
///
/// Returns the first path that does not resolve.  Hooks listed before it
/// stay installed.
pub fn register_change_hooks(
    tree: &mut OptionTree,
    root: NodeId,
    hooks: &[(&str, ChangeHook)],
) -> Result<(), TreeError> {
    for (path, hook) in hooks {
        let id = tree.resolve(root, path, LookupMode::Normal).inspect_err(|err| {
            error!(%path, error = %err, "change hook registered for unknown option");
        })?;
        tree.set_change_hook(id, Some(hook.clone()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::domain::node::{HookCall, HookOutcome, TEMPLATE_NAME};

    const TABLE: &[OptionDefinition] = &[
        OptionDefinition::tree("", "document").flags(OptionFlags::SORT).caption("Document"),
        OptionDefinition::new("document", "size", DefaultValue::Int(12)).bounds(1, 72),
        OptionDefinition::new("document", "fg", DefaultValue::Color("black")),
        OptionDefinition::new("document", "charset", DefaultValue::Codepage("utf-8")),
        OptionDefinition::new("", "show_size", DefaultValue::Alias("document.size")),
        OptionDefinition::tree("", "terminal").flags(OptionFlags::AUTOCREATE),
        OptionDefinition::tree("terminal", TEMPLATE_NAME).description("Terminal settings"),
        OptionDefinition::new("terminal._template_", "colors", DefaultValue::Bool(true)),
    ];

    #[test]
    fn test_register_all_builds_the_table() {
        // Arrange
        let mut tree = OptionTree::new("config");
        let root = tree.root();

        // Act
        let registration = register_all(&mut tree, root, TABLE);

        // Assert
        assert!(registration.is_complete());
        assert_eq!(registration.ids.len(), TABLE.len());
        let size = tree.lookup(root, "document.size").unwrap();
        let node = tree.node(size).unwrap();
        assert_eq!(node.bounds(), (1, 72));
        assert!(!node.flags().contains(OptionFlags::ALLOC));
        assert_eq!(tree.read_value(tree.lookup(root, "show_size").unwrap()), Ok(OptionValue::Int(12)));

        let children: Vec<_> = tree
            .children(tree.lookup(root, "document").unwrap())
            .iter()
            .map(|id| tree.node(*id).unwrap().name().to_string())
            .collect();
        assert_eq!(children, vec!["charset", "fg", "size"]);
    }

    #[test]
    fn test_register_all_continues_past_failures() {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        let table = [
            OptionDefinition::new("missing.parent", "x", DefaultValue::Int(1)),
            OptionDefinition::new("", "bad_color", DefaultValue::Color("not-a-color")),
            OptionDefinition::new("", "ok", DefaultValue::Bool(false)),
        ];

        let registration = register_all(&mut tree, root, &table);

        assert_eq!(registration.ids.len(), 1);
        assert_eq!(registration.failures.len(), 2);
        assert_eq!(registration.failures[0].0, "missing.parent.x");
        assert!(tree.lookup(root, "ok").is_ok());
    }

    #[test]
    fn test_default_outside_bounds_fails_registration() {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        let table = [
            OptionDefinition::new("", "unbounded", DefaultValue::Int(12)),
            OptionDefinition::new("", "too_big", DefaultValue::Int(12)).bounds(0, 9),
            OptionDefinition::new("", "fits", DefaultValue::Int(9)).bounds(0, 9),
        ];

        let registration = register_all(&mut tree, root, &table);

        assert_eq!(registration.ids.len(), 1);
        assert_eq!(
            registration.failures[1],
            ("too_big".to_string(), TreeError::Value(ValueError::OutOfRange { value: 12, min: 0, max: 9 }))
        );
        assert!(tree.lookup(root, "unbounded").is_err());
        assert!(tree.lookup(root, "fits").is_ok());
    }

    #[test]
    fn test_listbox_root_mirrors_everything_but_aliases() {
        let mut tree = OptionTree::with_root(OptionNode::tree("config").with_flags(OptionFlags::LISTBOX));
        let root = tree.root();

        register_all(&mut tree, root, TABLE);

        let size = tree.lookup(root, "document.size").unwrap();
        let alias = tree.lookup(root, "show_size").unwrap();
        assert!(tree.node(size).unwrap().mirror().is_some());
        assert!(tree.node(alias).unwrap().mirror().is_none());
    }

    #[test]
    fn test_unregister_all_removes_everything_registered() {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        let registration = register_all(&mut tree, root, TABLE);

        let freed = unregister_all(&mut tree, &registration);

        assert_eq!(freed, TABLE.len());
        assert_eq!(tree.len(), 1);
        assert!(registration.ids.iter().all(|id| !tree.contains(*id)));
    }

    #[test]
    fn test_register_change_hooks_overwrites() {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        register_all(&mut tree, root, TABLE);
        let first: ChangeHook = Rc::new(|_: &mut OptionTree, _: &HookCall| HookOutcome::Continue);
        let second: ChangeHook = Rc::new(|_: &mut OptionTree, _: &HookCall| HookOutcome::Handled);

        register_change_hooks(&mut tree, root, &[("document", first)]).unwrap();
        register_change_hooks(&mut tree, root, &[("document", second)]).unwrap();

        let size = tree.lookup(root, "document.size").unwrap();
        assert_eq!(tree.set_value(size, OptionValue::Int(14), None), Ok(1));
        let third: ChangeHook = Rc::new(|_: &mut OptionTree, _: &HookCall| HookOutcome::Continue);
        assert!(register_change_hooks(&mut tree, root, &[("nope", third)]).is_err());
    }
}
