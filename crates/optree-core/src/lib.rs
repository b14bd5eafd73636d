//! # optree-core
//!
//! A hierarchical, dynamically extensible configuration tree: named, typed
//! options addressed by dotted paths such as `document.colors.link`.
//!
//! This crate has no I/O, no threads and no UI.  Embedders own an
//! [`OptionStore`], register their option tables into it, and read and write
//! values through it.
//!
//! # Concepts (for beginners)
//!
//! - **Option tree** – every option lives in a tree.  Inner nodes are *trees*
//!   (folders); leaves hold a typed value: bool, integer, string, color and a
//!   few more.
//!
//! - **Autocreation** – a tree flagged `AUTOCREATE` holds a `_template_`
//!   child.  Looking up a missing child (`terminal.xterm`) clones the template
//!   under the requested name, so per-item settings spring into existence on
//!   first use.
//!
//! - **Contexts and shadows** – a context (for example one browsing session)
//!   can override options without changing anybody else's view.  Its overrides
//!   live in a separate overlay tree that copies canonical nodes on first
//!   write.
//!
//! - **Change hooks** – a node may carry a callback.  When an option changes,
//!   the callbacks of the option and its ancestors run from the bottom up
//!   until one says it handled the change.
//!
//! - **Persistence flags** – the tree does not read or write files, but it
//!   tracks which options were changed and yields them in save order for a
//!   writer to format.

// `value` holds the typed payloads and their text codecs; `domain` holds the
// tree itself.
pub mod domain;
pub mod value;

// Re-export the most-used types at the crate root so callers can write
// `optree_core::OptionTree` instead of `optree_core::domain::tree::OptionTree`.
pub use domain::node::{
    ChangeHook, HookCall, HookOutcome, MirrorState, NodeId, OptionFlags, OptionNode, TEMPLATE_NAME,
};
pub use domain::observer::{TreeEvent, TreeObserver};
pub use domain::registry::{
    register_all, register_change_hooks, unregister_all, DefaultValue, OptionDefinition, Registration,
};
pub use domain::shadow::shadow_of;
pub use domain::store::{ContextId, OptionStore};
pub use domain::tree::{LookupMode, OptionTree, TreeError};
pub use domain::{CommentPolicy, SaveEntry, SaveItem};
pub use value::{Color, OptionKind, OptionValue, ValueError};
