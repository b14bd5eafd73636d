//! Codepage and language tables.
//!
//! Codepage and Language options store an index into one of these tables.
//! The tables are compile-time constants; lookups by name are linear scans,
//! which is fine for a few dozen entries that are only consulted on
//! parse/format.

/// Codepages as `(config name, aliases)`.  The index is the stored value.
pub const CODEPAGES: &[(&str, &[&str])] = &[
    ("us-ascii", &["ascii", "7bit"]),
    ("iso-8859-1", &["latin1", "iso8859-1"]),
    ("iso-8859-2", &["latin2", "iso8859-2"]),
    ("iso-8859-15", &["latin9", "iso8859-15"]),
    ("windows-1250", &["cp1250"]),
    ("windows-1251", &["cp1251"]),
    ("windows-1252", &["cp1252"]),
    ("koi8-r", &["koi8r"]),
    ("cp437", &["ibm437"]),
    ("cp850", &["ibm850"]),
    ("utf-8", &["utf8"]),
];

/// Languages as `(display name, ISO code)`.  Index 0 is the system default.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("System", "system"),
    ("English", "en"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("French", "fr"),
    ("German", "de"),
    ("Italian", "it"),
    ("Polish", "pl"),
    ("Russian", "ru"),
    ("Slovak", "sk"),
    ("Spanish", "es"),
];

/// Finds a codepage index by config name or alias (case-insensitive).
pub fn codepage_index(name: &str) -> Option<usize> {
    let name = name.trim();
    CODEPAGES.iter().position(|(config, aliases)| {
        config.eq_ignore_ascii_case(name) || aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

pub fn codepage_name(index: usize) -> Option<&'static str> {
    CODEPAGES.get(index).map(|(config, _)| *config)
}

/// Finds a language index by display name or ISO code (case-insensitive).
pub fn language_index(name: &str) -> Option<usize> {
    let name = name.trim();
    LANGUAGES
        .iter()
        .position(|(display, iso)| display.eq_ignore_ascii_case(name) || iso.eq_ignore_ascii_case(name))
}

pub fn language_name(index: usize) -> Option<&'static str> {
    LANGUAGES.get(index).map(|(display, _)| *display)
}
