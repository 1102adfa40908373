//! Conversion statistics and previews for a piece of text.

use crate::glyph_map::GlyphMap;
use serde::{Deserialize, Serialize};

/// How much of a text the Balaram table touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Number of characters in the text.
    pub total_chars: usize,
    /// Number of characters that are table keys.
    pub converted_chars: usize,
    /// `converted_chars / total_chars` as a percentage, rounded to 2 places.
    pub conversion_rate: f64,
}

impl ConversionStats {
    /// Compute statistics for `text` against the Balaram table.
    pub fn of(text: &str) -> Self {
        let map = GlyphMap::global();
        let total_chars = text.chars().count();
        let converted_chars = text.chars().filter(|&c| map.contains(c)).count();

        let conversion_rate = if total_chars > 0 {
            let rate = converted_chars as f64 / total_chars as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_chars,
            converted_chars,
            conversion_rate,
        }
    }
}

/// A truncated before/after view of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub original: String,
    pub converted: String,
    pub has_changes: bool,
}

/// Preview the conversion of the first `max_chars` characters of `text`.
///
/// Truncated input gets a trailing `...`.
pub fn preview(text: &str, max_chars: usize) -> Preview {
    if text.is_empty() {
        return Preview {
            original: String::new(),
            converted: String::new(),
            has_changes: false,
        };
    }

    let mut original: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        original.push_str("...");
    }

    let converted = GlyphMap::global().map_text(&original);
    let has_changes = converted != original;

    Preview {
        original,
        converted,
        has_changes,
    }
}
