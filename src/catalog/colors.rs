//! Bitmask encoding for card colors
//!
//! The `colors` column stores a set of colors as a sum of per-color powers of
//! two, so the search layer can express subset/superset/intersection checks
//! with plain bitwise arithmetic. Colorless is the absence of any bit: the
//! column is NULL, never 0b100000.

use std::collections::BTreeSet;

/// The five primary colors, with their fixed bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    Red,
    Green,
    White,
    Blue,
    Black,
}

impl Color {
    /// All colors, in bit order.
    pub const ALL: [Color; 5] = [
        Color::Red,
        Color::Green,
        Color::White,
        Color::Blue,
        Color::Black,
    ];

    /// The bit value of this color in the stored mask.
    pub fn bit(self) -> i64 {
        match self {
            Color::Red => 1,
            Color::Green => 2,
            Color::White => 4,
            Color::Blue => 8,
            Color::Black => 16,
        }
    }

    /// The color name as it appears in the snapshot data.
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::White => "White",
            Color::Blue => "Blue",
            Color::Black => "Black",
        }
    }

    /// Parse a snapshot color name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Color> {
        match name {
            "Red" => Some(Color::Red),
            "Green" => Some(Color::Green),
            "White" => Some(Color::White),
            "Blue" => Some(Color::Blue),
            "Black" => Some(Color::Black),
            _ => None,
        }
    }
}

/// Encode a set of colors as a bitmask sum. The empty set encodes to 0;
/// callers store that as NULL (colorless).
pub fn encode<I>(colors: I) -> i64
where
    I: IntoIterator<Item = Color>,
{
    colors.into_iter().map(Color::bit).sum()
}

/// Decode a bitmask back into the set of colors it represents.
///
/// Inverse of [`encode`]; the search layer itself works directly on the
/// encoded integers.
pub fn decode(mask: i64) -> BTreeSet<Color> {
    Color::ALL
        .iter()
        .copied()
        .filter(|color| mask & color.bit() != 0)
        .collect()
}
