//! Per-context overlay trees.
//!
//! A shadow tree starts empty and gains a copy of a canonical node the first
//! time that node is needed in the context.  Copies are shallow: value,
//! metadata, hook and flags, but no children and no mirror entry.  Once made,
//! a shadow copy never shares storage with its canonical node.

use tracing::debug;

use super::node::{NodeId, OptionFlags};
use super::tree::{OptionTree, TreeError};

/// Returns the shadow of canonical `node`, materializing it and any missing
/// shadow ancestors in `shadow`.
///
/// `canonical_root` maps onto `shadow_root`.  Calling this twice for the same
/// node returns the same shadow id.
///
/// # Errors
///
/// Returns [`TreeError::StaleNode`] for a freed canonical node and
/// [`TreeError::NotFound`] when `node` does not lie under `canonical_root`.
pub fn shadow_of(
    canonical: &OptionTree,
    canonical_root: NodeId,
    node: NodeId,
    shadow: &mut OptionTree,
    shadow_root: NodeId,
) -> Result<NodeId, TreeError> {
    if node == canonical_root {
        return Ok(shadow_root);
    }

    let source = canonical.node(node)?;
    let Some(parent) = source.parent() else {
        return Err(TreeError::NotFound(source.name().to_string()));
    };
    let shadow_parent = shadow_of(canonical, canonical_root, parent, shadow, shadow_root)?;

    if let Some(existing) = shadow.child(shadow_parent, source.name()) {
        return Ok(existing);
    }

    let mut copy = source.detached_copy();
    copy.mirror = None;
    copy.flags.insert(OptionFlags::TOUCHED);
    let id = shadow.alloc(copy);
    shadow.attach_unsorted(shadow_parent, id);

    debug!(option = %source.name(), "materialized shadow option");
    Ok(id)
}
