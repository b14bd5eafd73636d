//! RGB colors and the color name table.
//!
//! Color options accept either a known name (`"navy"`) or a hex code
//! (`"#000080"`, `"#008"`, or the same digits without the leading `#`).
//! When formatted back, a color that exactly matches a table entry is written
//! by name; everything else is written as `#rrggbb`.

use super::ValueError;

/// A decoded 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0xRRGGBB`.
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parses `rgb` or `rrggbb` hex digits, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');

        fn digit(c: u8) -> Option<u8> {
            match c {
                b'0'..=b'9' => Some(c - b'0'),
                b'a'..=b'f' => Some(c - b'a' + 10),
                b'A'..=b'F' => Some(c - b'A' + 10),
                _ => None,
            }
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => {
                let r = digit(bytes[0])?;
                let g = digit(bytes[1])?;
                let b = digit(bytes[2])?;
                Some(Self::rgb((r << 4) | r, (g << 4) | g, (b << 4) | b))
            }
            6 => {
                let byte = |i: usize| Some((digit(bytes[i])? << 4) | digit(bytes[i + 1])?);
                Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => None,
        }
    }

    /// Decodes a color name or hex code.
    ///
    /// Names are matched case-insensitively.  A string starting with `#` is
    /// always treated as hex; anything else is tried as a name first.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::UnknownColor`] when neither form matches.
    pub fn decode(text: &str) -> Result<Self, ValueError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('#') {
            if let Some(color) = color_by_name(trimmed) {
                return Ok(color);
            }
        }
        Self::from_hex(trimmed).ok_or_else(|| ValueError::UnknownColor(text.to_string()))
    }

    /// Returns the table name of this color, if it has one.
    pub fn name(self) -> Option<&'static str> {
        COLOR_NAMES
            .iter()
            .find(|(_, rgb)| *rgb == self.to_u32())
            .map(|(name, _)| *name)
    }

    /// Formats the color the way it is persisted: a name when exact, hex otherwise.
    pub fn to_config_string(self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
        }
    }
}

fn color_by_name(name: &str) -> Option<Color> {
    COLOR_NAMES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, rgb)| Color::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, *rgb as u8))
}

/// Known color names, in lookup order.  First match wins when formatting, so
/// aliases with the same RGB value (`aqua`/`cyan`) resolve to the earlier name.
const COLOR_NAMES: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xffffff),
    ("silver", 0xc0c0c0),
    ("gray", 0x808080),
    ("maroon", 0x800000),
    ("red", 0xff0000),
    ("purple", 0x800080),
    ("fuchsia", 0xff00ff),
    ("magenta", 0xff00ff),
    ("green", 0x008000),
    ("lime", 0x00ff00),
    ("olive", 0x808000),
    ("yellow", 0xffff00),
    ("navy", 0x000080),
    ("blue", 0x0000ff),
    ("teal", 0x008080),
    ("aqua", 0x00ffff),
    ("cyan", 0x00ffff),
    ("darkgray", 0xa9a9a9),
    ("darkblue", 0x00008b),
    ("darkred", 0x8b0000),
    ("lightgray", 0xd3d3d3),
    ("lightblue", 0xadd8e6),
    ("orange", 0xffa500),
    ("brown", 0xa52a2a),
];
