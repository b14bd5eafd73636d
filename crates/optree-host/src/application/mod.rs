//! Application layer use cases for the option host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The option tree engine (`optree_core`) knows nothing about terminals,
//! documents or sessions.  This layer wires the engine to the host's own
//! concerns:
//!
//! - **Declare** the host's options as static tables.
//! - **React** to option changes through change hooks that call out to
//!   abstract [`hooks::HostServices`].
//! - **Contain no file system access**: reading settings files belongs to the
//!   infrastructure layer.
//!
//! # Sub-modules
//!
//! - **`builtin`**   – The builtin option table and terminal presets.
//! - **`hooks`**     – The change-hook table and template visibility.
//! - **`overrides`** – Parsing textual values and applying settings overrides.
//! - **`sessions`**  – Open sessions, each with its own option overlay.
//! - **`report`**    – Renders the options selected for saving.

pub mod builtin;
pub mod error;
pub mod hooks;
pub mod overrides;
pub mod report;
pub mod sessions;
