//! Typed option values.
//!
//! Every option node carries exactly one [`OptionValue`].  The variant *is* the
//! node's kind: there is no separate kind field that could disagree with the
//! stored value, and only the [`OptionValue::Tree`] variant owns children.
//!
//! # Why a closed enum? (for beginners)
//!
//! The set of option kinds is fixed.  Modelling it as an `enum` means every
//! per-kind operation (validate, format, parse, copy) is a `match` that the
//! compiler checks for exhaustiveness.  Adding an eleventh kind later would
//! turn every forgotten case into a compile error instead of a runtime surprise.

pub mod charset;
pub mod color;
pub mod format;
pub mod parse;

use thiserror::Error;

use crate::domain::node::NodeId;

pub use color::Color;

/// Maximum byte length of a string option when its `max` bound is unset.
pub const MAX_STR_LEN: usize = 1024;

/// The closed set of option kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Tree,
    Bool,
    Int,
    Long,
    String,
    Color,
    Command,
    Alias,
    Codepage,
    Language,
}

impl OptionKind {
    /// Human-readable kind name, as shown by option managers.
    pub fn name(&self) -> &'static str {
        match self {
            OptionKind::Tree => "Folder",
            OptionKind::Bool => "Boolean",
            OptionKind::Int => "Integer",
            OptionKind::Long => "Longint",
            OptionKind::String => "String",
            OptionKind::Color => "Color",
            OptionKind::Command => "Special",
            OptionKind::Alias => "Alias",
            OptionKind::Codepage => "Codepage",
            OptionKind::Language => "Language",
        }
    }

    /// Returns `true` for the kinds whose value is range-checked against `(min, max)`.
    pub fn is_bounded(&self) -> bool {
        matches!(self, OptionKind::Bool | OptionKind::Int | OptionKind::Long)
    }
}

/// Errors raised while validating, parsing or decoding a single value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value falls outside the option's `(min, max)` bounds.
    #[error("value {value} outside bounds [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },

    /// A string value is not shorter than the option's length cap.
    #[error("string of {len} bytes exceeds limit of {max}")]
    TooLong { len: usize, max: usize },

    /// The text could not be parsed as a value of the given kind.
    #[error("cannot parse {input:?} as {kind}")]
    Parse { kind: &'static str, input: String },

    /// The color name or hex code is not recognised.
    #[error("unknown color: {0}")]
    UnknownColor(String),

    /// The codepage name or index is not in the codepage table.
    #[error("unknown codepage: {0}")]
    UnknownCodepage(String),

    /// The language name or index is not in the language table.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// Tree, Command and Alias values have no textual form.
    #[error("{0} options have no parsable value")]
    NotParsable(&'static str),
}

/// The value held by an option node.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Ordered, owned children of a tree node.
    Tree(Vec<NodeId>),
    Bool(bool),
    Int(i32),
    Long(i64),
    String(String),
    Color(Color),
    /// Name of the action a command option triggers.
    Command(String),
    /// Dotted path of the aliased option.
    Alias(String),
    /// Index into [`charset::CODEPAGES`].
    Codepage(usize),
    /// Index into [`charset::LANGUAGES`].
    Language(usize),
}

impl OptionValue {
    /// An empty children collection.
    pub fn tree() -> Self {
        OptionValue::Tree(Vec::new())
    }

    /// Returns the kind this value belongs to.
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Tree(_) => OptionKind::Tree,
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Long(_) => OptionKind::Long,
            OptionValue::String(_) => OptionKind::String,
            OptionValue::Color(_) => OptionKind::Color,
            OptionValue::Command(_) => OptionKind::Command,
            OptionValue::Alias(_) => OptionKind::Alias,
            OptionValue::Codepage(_) => OptionKind::Codepage,
            OptionValue::Language(_) => OptionKind::Language,
        }
    }

    /// Returns the numeric view of Bool/Int/Long values.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            OptionValue::Bool(b) => Some(i64::from(*b)),
            OptionValue::Int(n) => Some(i64::from(*n)),
            OptionValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) | OptionValue::Command(s) | OptionValue::Alias(s) => Some(s),
            _ => None,
        }
    }

    /// Checks the value against an option's bounds.
    ///
    /// Bool/Int/Long must lie in `[min, max]`.  Strings must be strictly
    /// shorter than `max` when `max` is positive, and shorter than
    /// [`MAX_STR_LEN`] otherwise.  Codepage and language indices must exist in
    /// their tables.
    ///
    /// # Errors
    ///
    /// Returns the matching [`ValueError`] variant when a check fails.
    pub fn validate(&self, min: i64, max: i64) -> Result<(), ValueError> {
        match self {
            OptionValue::Bool(_) | OptionValue::Int(_) | OptionValue::Long(_) => {
                let value = self.as_number().unwrap_or_default();
                if value < min || value > max {
                    return Err(ValueError::OutOfRange { value, min, max });
                }
                Ok(())
            }
            OptionValue::String(s) => {
                let limit = if max > 0 { max as usize } else { MAX_STR_LEN };
                if s.len() >= limit {
                    return Err(ValueError::TooLong { len: s.len(), max: limit });
                }
                Ok(())
            }
            OptionValue::Codepage(index) => charset::codepage_name(*index)
                .map(|_| ())
                .ok_or_else(|| ValueError::UnknownCodepage(index.to_string())),
            OptionValue::Language(index) => charset::language_name(*index)
                .map(|_| ())
                .ok_or_else(|| ValueError::UnknownLanguage(index.to_string())),
            OptionValue::Tree(_)
            | OptionValue::Color(_)
            | OptionValue::Command(_)
            | OptionValue::Alias(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(OptionValue::tree().kind(), OptionKind::Tree);
        assert_eq!(OptionValue::Bool(true).kind(), OptionKind::Bool);
        assert_eq!(OptionValue::Long(5).kind(), OptionKind::Long);
        assert_eq!(OptionValue::Alias("a.b".into()).kind(), OptionKind::Alias);
        assert_eq!(OptionValue::Language(0).kind(), OptionKind::Language);
    }

    #[test]
    fn test_validate_rejects_int_above_max() {
        let result = OptionValue::Int(11).validate(0, 10);
        assert_eq!(result, Err(ValueError::OutOfRange { value: 11, min: 0, max: 10 }));
    }

    #[test]
    fn test_validate_accepts_bounds_inclusive() {
        assert!(OptionValue::Int(0).validate(0, 10).is_ok());
        assert!(OptionValue::Int(10).validate(0, 10).is_ok());
        assert!(OptionValue::Bool(true).validate(0, 1).is_ok());
    }

    #[test]
    fn test_validate_string_must_be_shorter_than_max() {
        assert!(OptionValue::String("abc".into()).validate(0, 4).is_ok());
        assert_eq!(
            OptionValue::String("abcd".into()).validate(0, 4),
            Err(ValueError::TooLong { len: 4, max: 4 })
        );
    }

    #[test]
    fn test_validate_string_without_max_uses_default_cap() {
        let long = "x".repeat(MAX_STR_LEN);
        assert!(OptionValue::String(long).validate(0, 0).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_codepage_index() {
        assert!(OptionValue::Codepage(10_000).validate(0, 0).is_err());
        assert!(OptionValue::Codepage(0).validate(0, 0).is_ok());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OptionKind::Tree.name(), "Folder");
        assert_eq!(OptionKind::Command.name(), "Special");
        assert!(OptionKind::Long.is_bounded());
        assert!(!OptionKind::Color.is_bounded());
    }
}
