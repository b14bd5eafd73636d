//! Storage infrastructure: the host's settings file.
//!
//! The `config` sub-module reads and writes the TOML settings file in the
//! platform-appropriate directory and falls back to defaults on first run.
//! Option values themselves are not stored here; the settings file only
//! carries textual overrides that the application layer parses.

pub mod config;
