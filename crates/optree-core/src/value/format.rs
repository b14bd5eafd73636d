//! Value formatting for persistence writers.
//!
//! These functions produce the textual form of a single value.  They do not
//! define a file syntax: a writer decides where the text goes.
//!
//! ```text
//! Bool/Int/Long   4096        -> 4k
//!                 3145728     -> 3M
//!                 1000        -> 1000
//! String          say "hi"    -> "say \"hi\""
//! Color           #ff0000     -> red
//! Codepage        index 10    -> utf-8
//! ```

use super::{charset, OptionValue, MAX_STR_LEN};

const KIB: i64 = 1024;
const MIB: i64 = 1024 * 1024;

/// Formats an integer, using a `k`/`M` suffix when it is an exact multiple.
pub fn format_knum(value: i64) -> String {
    if value != 0 && value % MIB == 0 {
        format!("{}M", value / MIB)
    } else if value != 0 && value % KIB == 0 {
        format!("{}k", value / KIB)
    } else {
        value.to_string()
    }
}

/// Quotes a string, escaping `"` and `\` with a backslash.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Formats `value` for persistence.
///
/// `max` is the option's upper bound: string values are cut to `max - 1`
/// bytes (on a character boundary) when it is positive.
///
/// Returns `None` for Tree, Command and Alias values, which have no
/// persisted text of their own.
pub fn format_value(value: &OptionValue, max: i64) -> Option<String> {
    match value {
        OptionValue::Bool(b) => Some(format_knum(i64::from(*b))),
        OptionValue::Int(n) => Some(format_knum(i64::from(*n))),
        OptionValue::Long(n) => Some(format_knum(*n)),
        OptionValue::String(s) => {
            let limit = if max > 0 { max as usize - 1 } else { MAX_STR_LEN - 1 };
            Some(quote(truncate(s, limit)))
        }
        OptionValue::Color(color) => Some(quote(&color.to_config_string())),
        OptionValue::Codepage(index) => charset::codepage_name(*index).map(quote),
        OptionValue::Language(index) => charset::language_name(*index).map(quote),
        OptionValue::Tree(_) | OptionValue::Command(_) | OptionValue::Alias(_) => None,
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
