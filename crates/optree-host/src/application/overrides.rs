//! Writing options from text.
//!
//! Settings files and command bridges deliver values as strings.  The text is
//! parsed against the kind and bounds of the option it lands on (the alias
//! target for aliases) and then written through the store, so hooks run as
//! for any other write.

use std::collections::BTreeMap;

use optree_core::value::parse::parse_value;
use optree_core::{ContextId, OptionStore};
use tracing::{info, warn};

use super::error::HostError;

/// Parses `text` for the option at `path` and writes it.  Returns the number
/// of hooks invoked.
///
/// # Errors
///
/// Returns [`HostError::InvalidValue`] for text that does not parse, and
/// [`HostError::Tree`] for resolution, alias, validation or context errors.
/// Options below autocreating trees are only created once the text parses.
pub fn set_from_text(
    store: &mut OptionStore,
    path: &str,
    text: &str,
    context: Option<ContextId>,
) -> Result<usize, HostError> {
    let id = store.prototype(path)?;
    let tree = store.tree();
    let target = tree.node(tree.indirect(id)?)?;
    let (min, max) = target.bounds();
    let value = parse_value(target.kind(), text, min, max)
        .map_err(|source| HostError::InvalidValue { path: path.to_string(), source })?;
    Ok(store.set_value(path, value, context)?)
}

/// Applies every `path = text` override to the canonical tree.
///
/// A bad override is logged and skipped.  Returns the paths that failed,
/// with the reason.
pub fn apply_overrides(store: &mut OptionStore, overrides: &BTreeMap<String, String>) -> Vec<(String, HostError)> {
    let mut failures = Vec::new();
    for (path, text) in overrides {
        if let Err(err) = set_from_text(store, path, text, None) {
            warn!(option = %path, error = %err, "ignoring settings override");
            failures.push((path.clone(), err));
        }
    }
    info!(applied = overrides.len() - failures.len(), failed = failures.len(), "applied settings overrides");
    failures
}

#[cfg(test)]
mod tests {
    use optree_core::{OptionFlags, OptionNode, OptionTree, OptionValue, ValueError, TEMPLATE_NAME};

    use super::*;

    fn store() -> OptionStore {
        let mut tree = OptionTree::new("config");
        let root = tree.root();
        let document = tree.insert(root, OptionNode::tree("document")).unwrap();
        tree.insert(document, OptionNode::new("margin", OptionValue::Int(3)).with_bounds(0, 9)).unwrap();
        tree.insert(document, OptionNode::new("images", OptionValue::Bool(true))).unwrap();
        tree.insert(
            document,
            OptionNode::new("hide_images", OptionValue::Alias("document.images".into()))
                .with_flags(OptionFlags::ALIAS_NEGATE),
        )
        .unwrap();
        OptionStore::new(tree)
    }

    #[test]
    fn test_set_from_text_parses_against_option_kind() {
        let mut store = store();

        set_from_text(&mut store, "document.margin", "7", None).unwrap();

        assert_eq!(store.get_value("document.margin", None), Ok(OptionValue::Int(7)));
    }

    #[test]
    fn test_set_from_text_through_negated_alias() {
        let mut store = store();

        set_from_text(&mut store, "document.hide_images", "yes", None).unwrap();

        assert_eq!(store.get_value("document.images", None), Ok(OptionValue::Bool(false)));
    }

    #[test]
    fn test_set_from_text_rejects_out_of_range() {
        let mut store = store();

        let err = set_from_text(&mut store, "document.margin", "12", None).unwrap_err();

        assert!(matches!(
            err,
            HostError::InvalidValue { source: ValueError::OutOfRange { value: 12, .. }, .. }
        ));
        assert_eq!(store.get_value("document.margin", None), Ok(OptionValue::Int(3)));
    }

    #[test]
    fn test_unparsable_text_does_not_autocreate() {
        // Arrange
        let mut store = store();
        let root = store.config_root();
        let tree = store.tree_mut();
        let terminal = tree.insert(root, OptionNode::tree("terminal").with_flags(OptionFlags::AUTOCREATE)).unwrap();
        let template = tree.insert(terminal, OptionNode::tree(TEMPLATE_NAME)).unwrap();
        tree.insert(template, OptionNode::new("colors", OptionValue::Int(0)).with_bounds(0, 3)).unwrap();
        let before = store.tree().len();

        // Act
        let err = set_from_text(&mut store, "terminal.xterm.colors", "lots", None).unwrap_err();

        // Assert
        assert!(matches!(err, HostError::InvalidValue { .. }));
        assert_eq!(store.tree().len(), before);
        set_from_text(&mut store, "terminal.xterm.colors", "2", None).unwrap();
        assert_eq!(store.get_value("terminal.xterm.colors", None), Ok(OptionValue::Int(2)));
    }

    #[test]
    fn test_apply_overrides_skips_bad_entries() {
        // Arrange
        let mut store = store();
        let overrides = BTreeMap::from([
            ("document.margin".to_string(), "4".to_string()),
            ("document.missing".to_string(), "1".to_string()),
            ("document.images".to_string(), "maybe".to_string()),
        ]);

        // Act
        let failures = apply_overrides(&mut store, &overrides);

        // Assert
        let failed: Vec<_> = failures.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(failed, vec!["document.images", "document.missing"]);
        assert_eq!(store.get_value("document.margin", None), Ok(OptionValue::Int(4)));
    }
}
