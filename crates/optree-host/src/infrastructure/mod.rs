//! Infrastructure layer for the option host.
//!
//! Contains the outward-facing adapters: the settings file on disk and the
//! command bridge with its option browser.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `optree_core`, but MUST NOT be imported by the `application` layer.

pub mod storage;
pub mod ui_bridge;
