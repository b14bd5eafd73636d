//! Parsing single values from text.
//!
//! The inverse of [`super::format`] for one value at a time, used by embedders
//! that accept option overrides as strings.  Surrounding quotes on string-like
//! values are optional and stripped; escapes inside them are kept verbatim.

use super::{charset, Color, OptionKind, OptionValue, ValueError};

/// Parses an integer with an optional `k` (×1024) or `M` (×1024²) suffix.
///
/// Accepts decimal, `0x` hex and leading-zero octal like `strtol` with base 0.
///
/// # Errors
///
/// Returns [`ValueError::Parse`] for malformed input or overflow.
pub fn parse_knum(text: &str) -> Result<i64, ValueError> {
    let err = || ValueError::Parse { kind: "number", input: text.to_string() };
    let trimmed = text.trim();

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((i, 'k')) | Some((i, 'K')) => (&trimmed[..i], 1024),
        Some((i, 'm')) | Some((i, 'M')) => (&trimmed[..i], 1024 * 1024),
        _ => (trimmed, 1),
    };

    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, digits.strip_prefix('+').unwrap_or(digits)),
    };

    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| err())?;

    let value = magnitude.checked_mul(multiplier).ok_or_else(err)?;
    Ok(if negative { -value } else { value })
}

/// Parses `text` as a value of `kind`, checking it against `(min, max)`.
///
/// Booleans accept `0`/`1` as well as `true`/`false`/`yes`/`no`/`on`/`off`.
///
/// # Errors
///
/// Returns [`ValueError`] when the text is malformed, out of bounds, or
/// names an unknown color/codepage/language.  Tree, Command and Alias kinds
/// always fail with [`ValueError::NotParsable`].
pub fn parse_value(kind: OptionKind, text: &str, min: i64, max: i64) -> Result<OptionValue, ValueError> {
    let value = match kind {
        OptionKind::Bool => OptionValue::Bool(parse_bool(text)?),
        OptionKind::Int => {
            let n = parse_knum(text)?;
            let n = i32::try_from(n)
                .map_err(|_| ValueError::OutOfRange { value: n, min, max })?;
            OptionValue::Int(n)
        }
        OptionKind::Long => OptionValue::Long(parse_knum(text)?),
        OptionKind::String => OptionValue::String(unquote(text).to_string()),
        OptionKind::Color => OptionValue::Color(Color::decode(unquote(text))?),
        OptionKind::Codepage => {
            let name = unquote(text);
            let index = charset::codepage_index(name)
                .ok_or_else(|| ValueError::UnknownCodepage(name.to_string()))?;
            OptionValue::Codepage(index)
        }
        OptionKind::Language => {
            let name = unquote(text);
            let index = charset::language_index(name)
                .ok_or_else(|| ValueError::UnknownLanguage(name.to_string()))?;
            OptionValue::Language(index)
        }
        OptionKind::Tree | OptionKind::Command | OptionKind::Alias => {
            return Err(ValueError::NotParsable(kind.name()))
        }
    };
    value.validate(min, max)?;
    Ok(value)
}

fn parse_bool(text: &str) -> Result<bool, ValueError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ValueError::Parse { kind: "bool", input: text.to_string() }),
    }
}

/// Strips one pair of surrounding double quotes.
fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_knum_suffixes() {
        assert_eq!(parse_knum("4k"), Ok(4096));
        assert_eq!(parse_knum("2M"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_knum("-3"), Ok(-3));
    }

    #[test]
    fn test_parse_knum_hex_and_octal() {
        assert_eq!(parse_knum("0x1f"), Ok(31));
        assert_eq!(parse_knum("010"), Ok(8));
        assert_eq!(parse_knum("0"), Ok(0));
    }

    #[test]
    fn test_parse_knum_rejects_trailing_garbage() {
        assert!(parse_knum("12abc").is_err());
        assert!(parse_knum("").is_err());
    }

    #[test]
    fn test_parse_int_checks_bounds() {
        assert_eq!(parse_value(OptionKind::Int, "5", 0, 10), Ok(OptionValue::Int(5)));
        assert!(matches!(
            parse_value(OptionKind::Int, "50", 0, 10),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_parse_bool_words() {
        assert_eq!(parse_value(OptionKind::Bool, "yes", 0, 1), Ok(OptionValue::Bool(true)));
        assert_eq!(parse_value(OptionKind::Bool, "0", 0, 1), Ok(OptionValue::Bool(false)));
        assert!(parse_value(OptionKind::Bool, "maybe", 0, 1).is_err());
    }

    #[test]
    fn test_parse_string_strips_quotes() {
        assert_eq!(
            parse_value(OptionKind::String, "\"hello\"", 0, 0),
            Ok(OptionValue::String("hello".into()))
        );
    }

    #[test]
    fn test_parse_codepage_and_language_names() {
        assert_eq!(
            parse_value(OptionKind::Codepage, "utf-8", 0, 0),
            Ok(OptionValue::Codepage(charset::codepage_index("utf-8").unwrap()))
        );
        assert!(parse_value(OptionKind::Language, "Klingon", 0, 0).is_err());
    }

    #[test]
    fn test_structural_kinds_are_not_parsable() {
        assert_eq!(
            parse_value(OptionKind::Tree, "x", 0, 0),
            Err(ValueError::NotParsable("Folder"))
        );
    }
}
