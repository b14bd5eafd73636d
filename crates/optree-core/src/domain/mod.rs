//! The option tree engine.
//!
//! Everything here is synchronous, single-threaded and free of I/O.  The
//! pieces, leaves first:
//!
//! - **`node`** – the option node, its flags and the change-hook signature.
//! - **`tree`** – the arena that owns nodes and hands out generational ids.
//! - **`resolve`** – dotted-path lookup, template autocreation and aliases.
//! - **`insert`** – sorted and unsorted linking under a parent tree.
//! - **`shadow`** – lazily built per-context overlay trees.
//! - **`notify`** – value writes and ancestor-bubbling change hooks.
//! - **`persist`** – touched/must-save bookkeeping and the save traversal.
//! - **`delete`** – hard and soft deletion.
//! - **`registry`** – registration of static option tables.
//! - **`store`** – the canonical tree plus its context overlays.
//!
//! # Why are the tree operations spread over several files? (for beginners)
//!
//! Rust lets a type have any number of `impl` blocks, in any module of the
//! same crate.  `OptionTree` is declared once in `tree.rs` and each concern
//! adds its own methods in its own file, so a reader looking for "how does
//! deletion work" opens `delete.rs` and nothing else.

pub mod node;
pub mod observer;
pub mod registry;
pub mod shadow;
pub mod store;
pub mod tree;

mod delete;
mod insert;
mod notify;
mod persist;
mod resolve;

pub use persist::{CommentPolicy, SaveEntry, SaveItem};
