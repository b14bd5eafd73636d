//! The host's builtin option table and the terminal presets.
//!
//! Every subsystem of the host describes its settings here as static
//! [`OptionDefinition`]s.  They are registered once at startup below the
//! store's config root and unregistered again on shutdown.
//!
//! # Autocreated terminals (for beginners)
//!
//! `terminal` is an *autocreating* tree: it only declares a `_template_`
//! child.  The first lookup of `terminal.xterm.colors` clones the template as
//! `terminal.xterm`.  [`register_autocreated_defaults`] pre-creates the
//! well-known terminal types so they start with sensible values instead of
//! the template's zeros.

use optree_core::value::parse::parse_value;
use optree_core::{
    register_all, DefaultValue, LookupMode, OptionDefinition, OptionFlags, OptionStore, Registration,
    TEMPLATE_NAME,
};
use tracing::{debug, info};

use super::error::HostError;

/// Terminal driver types stored in `terminal.*.type`.
pub mod term_type {
    pub const DUMB: i64 = 0;
    pub const VT100: i64 = 1;
    pub const LINUX: i64 = 2;
    pub const KOI8: i64 = 3;
    pub const FBTERM: i64 = 4;
}

/// Color modes stored in `terminal.*.colors`.
pub mod color_mode {
    pub const MONO: i64 = 0;
    pub const COLORS_16: i64 = 1;
    pub const COLORS_88: i64 = 2;
    pub const COLORS_256: i64 = 3;
}

const SORTED: OptionFlags = OptionFlags::SORT;
const AUTOCREATE: OptionFlags = OptionFlags::AUTOCREATE.union(OptionFlags::SORT);

/// Every builtin option, parents before children.
pub const BUILTIN_OPTIONS: &[OptionDefinition] = &[
    // ── config ────────────────────────────────────────────────────────────────
    OptionDefinition::tree("", "config")
        .caption("Configuration system")
        .description("Configuration handling options."),
    OptionDefinition::new("config", "show_template", DefaultValue::Bool(false))
        .caption("Show template")
        .description("Show _template_ options in the option browser."),
    OptionDefinition::new("config", "indentation", DefaultValue::Int(2))
        .bounds(0, 16)
        .caption("Indentation")
        .description("Spaces per nesting level in the settings report."),
    // ── connection ────────────────────────────────────────────────────────────
    OptionDefinition::tree("", "connection")
        .flags(SORTED)
        .caption("Connections")
        .description("Connection options."),
    OptionDefinition::new("connection", "max_connections", DefaultValue::Int(10))
        .bounds(1, 16)
        .description("Maximum number of concurrent connections."),
    OptionDefinition::new("connection", "retries", DefaultValue::Int(3))
        .bounds(0, 16)
        .description("Number of tries to establish a connection."),
    OptionDefinition::new("connection", "receive_timeout", DefaultValue::Int(120))
        .bounds(1, 1800)
        .description("Receive timeout in seconds."),
    OptionDefinition::new("connection", "try_ipv6", DefaultValue::Bool(true))
        .description("Whether to try to connect over IPv6."),
    // ── document ──────────────────────────────────────────────────────────────
    OptionDefinition::tree("", "document")
        .flags(SORTED)
        .caption("Document")
        .description("Document options."),
    OptionDefinition::tree("document", "browse").flags(SORTED).caption("Browsing"),
    OptionDefinition::new("document.browse", "margin_width", DefaultValue::Int(3))
        .bounds(0, 9)
        .description("Horizontal text margin."),
    OptionDefinition::tree("document.browse", "images").flags(SORTED).caption("Images"),
    OptionDefinition::new("document.browse.images", "show_as_links", DefaultValue::Bool(false))
        .description("Display links to images without an alt attribute."),
    OptionDefinition::new(
        "document.browse.images",
        "show_inline",
        DefaultValue::Alias("document.browse.images.show_as_links"),
    )
    .flags(OptionFlags::ALIAS_NEGATE)
    .description("Negated alias of show_as_links."),
    OptionDefinition::tree("document", "cache").flags(SORTED).caption("Cache"),
    OptionDefinition::new("document.cache", "memory_size", DefaultValue::Long(1 << 20))
        .bounds(0, 256 << 20)
        .description("Memory cache size in bytes."),
    OptionDefinition::tree("document", "codepage").caption("Charset"),
    OptionDefinition::new("document.codepage", "assume", DefaultValue::Codepage("iso-8859-1"))
        .description("Default document codepage."),
    OptionDefinition::tree("document", "colors").flags(SORTED).caption("Default color settings"),
    OptionDefinition::new("document.colors", "text", DefaultValue::Color("gray")),
    OptionDefinition::new("document.colors", "background", DefaultValue::Color("black")),
    OptionDefinition::new("document.colors", "link", DefaultValue::Color("blue")),
    OptionDefinition::tree("document", "html").caption("HTML rendering"),
    OptionDefinition::new("document.html", "display_tables", DefaultValue::Bool(true)),
    OptionDefinition::tree("document", "plain").caption("Plain rendering"),
    OptionDefinition::new("document.plain", "compress_empty_lines", DefaultValue::Bool(false)),
    // ── terminal ──────────────────────────────────────────────────────────────
    OptionDefinition::tree("", "terminal")
        .flags(AUTOCREATE)
        .caption("Terminals")
        .description("Terminal options."),
    OptionDefinition::tree("terminal", TEMPLATE_NAME)
        .description("Options specific to this terminal type (according to $TERM value)."),
    OptionDefinition::new("terminal._template_", "type", DefaultValue::Int(0)).bounds(0, 4),
    OptionDefinition::new("terminal._template_", "colors", DefaultValue::Int(0)).bounds(0, 3),
    OptionDefinition::new("terminal._template_", "underline", DefaultValue::Bool(false)),
    OptionDefinition::new("terminal._template_", "italic", DefaultValue::Bool(false)),
    OptionDefinition::new("terminal._template_", "transparency", DefaultValue::Bool(true)),
    OptionDefinition::new("terminal._template_", "utf8_io", DefaultValue::Bool(false)),
    OptionDefinition::new("terminal._template_", "m11_hack", DefaultValue::Bool(false)),
    // ── ui ────────────────────────────────────────────────────────────────────
    OptionDefinition::tree("", "ui")
        .flags(SORTED)
        .caption("User interface")
        .description("User interface options."),
    OptionDefinition::new("ui", "language", DefaultValue::Language)
        .caption("Language")
        .description("Language of user interface."),
    OptionDefinition::new("ui", "show_status_bar", DefaultValue::Bool(true)),
    OptionDefinition::tree("ui", "colors").flags(SORTED).caption("Color settings"),
    OptionDefinition::new("ui.colors", "title", DefaultValue::Color("yellow")),
    OptionDefinition::new("ui.colors", "status", DefaultValue::Color("silver")),
];

/// Preset values for well-known terminal types, as `(path, text)`.
pub const TERMINAL_PRESETS: &[(&str, &str)] = &[
    ("terminal.linux.type", "2"),
    ("terminal.linux.colors", "1"),
    ("terminal.linux.m11_hack", "1"),
    ("terminal.vt100.type", "1"),
    ("terminal.vt110.type", "1"),
    ("terminal.xterm.type", "1"),
    ("terminal.xterm.underline", "1"),
    ("terminal.xterm-color.type", "1"),
    ("terminal.xterm-color.colors", "1"),
    ("terminal.xterm-color.underline", "1"),
    ("terminal.xterm-256color.type", "1"),
    ("terminal.xterm-256color.colors", "3"),
    ("terminal.xterm-256color.underline", "1"),
    ("terminal.rxvt-unicode.type", "1"),
    ("terminal.rxvt-unicode.colors", "2"),
    ("terminal.rxvt-unicode.italic", "1"),
    ("terminal.rxvt-unicode.underline", "1"),
    ("terminal.fbterm.type", "4"),
    ("terminal.fbterm.colors", "3"),
    ("terminal.fbterm.underline", "0"),
];

/// Registers [`BUILTIN_OPTIONS`] below the store's config root.
///
/// # Errors
///
/// Returns [`HostError::Registration`] when any definition failed.  The
/// definitions that did register stay in the tree; the caller still owns
/// them through the error-free part of the table.
pub fn register_builtin_options(store: &mut OptionStore) -> Result<Registration, HostError> {
    let root = store.config_root();
    let registration = register_all(store.tree_mut(), root, BUILTIN_OPTIONS);
    if !registration.is_complete() {
        return Err(HostError::Registration(registration.failures.len()));
    }
    info!(options = registration.ids.len(), "registered builtin options");
    Ok(registration)
}

/// Creates the preset terminal entries and stores their values.
///
/// Preset values are defaults, not user changes: the nodes are left
/// untouched so they are not selected for saving.  Run this before change
/// hooks are installed.  Returns the number of values stored.
///
/// # Errors
///
/// Returns the first resolution or parse failure.
pub fn register_autocreated_defaults(store: &mut OptionStore) -> Result<usize, HostError> {
    let root = store.config_root();
    let tree = store.tree_mut();
    for (path, text) in TERMINAL_PRESETS {
        let id = tree.resolve(root, path, LookupMode::Normal)?;
        let node = tree.node(id)?;
        let (min, max) = node.bounds();
        let value = parse_value(node.kind(), text, min, max)
            .map_err(|source| HostError::InvalidValue { path: (*path).to_string(), source })?;
        tree.set_value(id, value, None)?;
        tree.remove_flags(id, OptionFlags::TOUCHED)?;
    }
    debug!(presets = TERMINAL_PRESETS.len(), "stored terminal presets");
    Ok(TERMINAL_PRESETS.len())
}
