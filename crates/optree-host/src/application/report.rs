//! Renders the options selected for saving as a readable report.
//!
//! The report is for display only: it shows what a settings writer would
//! persist, one `set path = value` line per option, indented by tree depth
//! and preceded by `##` description comments where the comment policy allows.

use optree_core::{CommentPolicy, NodeId, OptionTree, SaveItem};

/// Renders the save entries below `root`.
///
/// Call [`OptionTree::prepare_must_save`] first; only must-save options
/// appear.  `indent` is the number of spaces per nesting level.
pub fn render_report(tree: &OptionTree, root: NodeId, policy: CommentPolicy, indent: usize) -> String {
    let mut out = String::new();
    for entry in tree.save_entries(root, policy) {
        let pad = " ".repeat(indent * entry.depth);
        let line = match &entry.item {
            SaveItem::TreeStart => format!("# {}", entry.path),
            SaveItem::Value(text) => format!("set {} = {text}", entry.path),
            SaveItem::Unset => format!("unset {}", entry.path),
            SaveItem::TreeEnd => {
                if entry.depth == 0 {
                    out.push('\n');
                }
                continue;
            }
        };
        let description = match entry.comment {
            true => tree.get(entry.node).and_then(|node| node.description()),
            false => None,
        };
        if let Some(description) = description {
            out.push_str(&format!("{pad}## {description}\n"));
        }
        out.push_str(&format!("{pad}{line}\n"));
    }
    out
}
