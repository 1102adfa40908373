//! Run-level text conversion.

use crate::glyph_map::GlyphMap;
use unicode_normalization::UnicodeNormalization;

/// Converts the text of one run from Balaram to Unicode.
#[derive(Debug, Clone)]
pub struct TextConverter {
    map: &'static GlyphMap,
    /// Compose to NFC before mapping.
    compose: bool,
}

impl Default for TextConverter {
    fn default() -> Self {
        Self {
            map: GlyphMap::global(),
            compose: false,
        }
    }
}

impl TextConverter {
    /// Create a converter using the Balaram table, without composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether text is composed to NFC before mapping.
    ///
    /// Decomposed input such as `a` + U+030A never matches the precomposed
    /// table keys. Composition can shorten the text, so it is off by default.
    pub fn with_compose(mut self, compose: bool) -> Self {
        self.compose = compose;
        self
    }

    /// Whether NFC composition is enabled.
    pub fn composes(&self) -> bool {
        self.compose
    }

    /// Convert a piece of text.
    pub fn convert_text(&self, text: &str) -> String {
        if self.compose {
            let composed: String = text.nfc().collect();
            self.map.map_text(&composed)
        } else {
            self.map.map_text(text)
        }
    }

    /// Number of characters in `text` that would change under the table.
    pub fn count_changes(&self, text: &str) -> usize {
        let changed = |c: &char| self.map.map_char(*c) != *c;
        if self.compose {
            text.nfc().filter(changed).count()
        } else {
            text.chars().filter(changed).count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_plain_mapping() {
        let converter = TextConverter::new();
        assert!(!converter.composes());
        assert_eq!(converter.convert_text("Kåñëa"), "Kṛṣṇa");
    }

    #[test]
    fn test_decomposed_input_without_compose_is_untouched() {
        let converter = TextConverter::new();
        // "a" followed by COMBINING RING ABOVE
        let decomposed = "Ka\u{030A}ñëa";
        assert_eq!(converter.convert_text(decomposed), "Ka\u{030A}ṣṇa");
    }

    #[test]
    fn test_compose_reaches_table_keys() {
        let converter = TextConverter::new().with_compose(true);
        let decomposed = "Ka\u{030A}n\u{0303}e\u{0308}a";
        assert_eq!(converter.convert_text(decomposed), "Kṛṣṇa");
    }

    #[test]
    fn test_count_changes() {
        let converter = TextConverter::new();
        assert_eq!(converter.count_changes("Kåñëa"), 3);
        assert_eq!(converter.count_changes("it's"), 0);
        assert_eq!(converter.count_changes(""), 0);
    }
}
