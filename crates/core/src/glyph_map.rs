//! The fixed Balaram glyph table.
//!
//! Balaram is an 8-bit font that draws ordinary accented Latin code points
//! (`å`, `ñ`, `ë`, ...) as Indic diacritic letters. The document text itself
//! is not Unicode transliteration until each of those code points is swapped
//! for the letter the font was drawing. The swap is strictly one code point
//! for one code point; anything not in the table passes through unchanged.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Every Balaram source code point paired with its Unicode target.
pub const BALARAM_TABLE: &[(char, char)] = &[
    // Lowercase
    ('ä', 'ā'), // long a
    ('é', 'ī'), // long i
    ('ü', 'ū'), // long u
    ('å', 'ṛ'), // vocalic r
    ('è', 'ṝ'), // long vocalic r
    ('ì', 'ṅ'), // velar nasal
    ('ï', 'ñ'), // palatal nasal
    ('ö', 'ṭ'), // retroflex t
    ('ò', 'ḍ'), // retroflex d
    ('ë', 'ṇ'), // retroflex n
    ('ç', 'ś'), // palatal s
    ('à', 'ṁ'), // anusvara
    ('ù', 'ḥ'), // visarga
    ('ÿ', 'ḷ'), // vocalic l
    ('û', 'ḹ'), // long vocalic l
    ('ý', 'ẏ'), // y with dot above
    ('ñ', 'ṣ'), // retroflex s
    // Uppercase
    ('Ä', 'Ā'),
    ('É', 'Ī'),
    ('Ü', 'Ū'),
    ('Å', 'Ṛ'),
    ('È', 'Ṝ'),
    ('Ì', 'Ṅ'),
    ('Ï', 'Ñ'),
    ('Ö', 'Ṭ'),
    ('Ò', 'Ḍ'),
    ('Ë', 'Ṇ'),
    ('Ç', 'Ś'),
    ('À', 'Ṁ'),
    ('Ù', 'Ḥ'),
    ('ß', 'Ḷ'),
    ('Ý', 'Ẏ'),
    ('Ñ', 'Ṣ'),
    // Special
    ('~', 'ɱ'),
    ('\'', '\''),
    ('\u{2026}', '\u{2026}'), // ellipsis
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
];

/// Process-wide table, built on first use.
static GLYPH_MAP: LazyLock<GlyphMap> = LazyLock::new(GlyphMap::balaram);

/// Immutable single-code-point substitution table.
///
/// Lookups are total: a character without an entry maps to itself.
#[derive(Debug, Clone)]
pub struct GlyphMap {
    entries: HashMap<char, char>,
}

impl GlyphMap {
    /// Build the Balaram table.
    pub fn balaram() -> Self {
        Self::from_pairs(BALARAM_TABLE.iter().copied())
    }

    /// Build a table from arbitrary pairs. Later pairs win on duplicate keys.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// The shared Balaram table.
    pub fn global() -> &'static GlyphMap {
        &GLYPH_MAP
    }

    /// Table entry for `c`, if any.
    pub fn get(&self, c: char) -> Option<char> {
        self.entries.get(&c).copied()
    }

    /// Whether `c` is a key of the table.
    pub fn contains(&self, c: char) -> bool {
        self.entries.contains_key(&c)
    }

    /// Map one code point, falling back to identity.
    pub fn map_char(&self, c: char) -> char {
        self.get(c).unwrap_or(c)
    }

    /// Map every code point of `text`, keeping order and length.
    pub fn map_text(&self, text: &str) -> String {
        text.chars().map(|c| self.map_char(c)).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(source, target)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }
}

impl Default for GlyphMap {
    fn default() -> Self {
        Self::balaram()
    }
}

/// Map one Balaram code point to Unicode.
pub fn map_char(c: char) -> char {
    GLYPH_MAP.map_char(c)
}

/// Map every code point of `text` from Balaram to Unicode.
pub fn map_text(text: &str) -> String {
    GLYPH_MAP.map_text(text)
}

/// Whether `c` changes under the Balaram table.
pub fn is_balaram(c: char) -> bool {
    GLYPH_MAP.get(c).is_some_and(|target| target != c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_pair_maps_to_its_target() {
        for &(source, target) in BALARAM_TABLE {
            assert_eq!(map_char(source), target, "mapping of {:?}", source);
        }

        let mut pairs: Vec<(char, char)> = GlyphMap::global().iter().collect();
        let mut table = BALARAM_TABLE.to_vec();
        pairs.sort_unstable();
        table.sort_unstable();
        assert_eq!(pairs, table);
    }

    #[test]
    fn test_table_has_no_duplicate_keys() {
        assert_eq!(BALARAM_TABLE.len(), 40);
        assert_eq!(GlyphMap::global().len(), BALARAM_TABLE.len());
    }

    #[test]
    fn test_unmapped_characters_pass_through() {
        for c in ['a', 'Z', '0', ' ', '\n', '\t', '.', ',', '-', 'ā', 'ṛ', 'ś', 'अ', '😀'] {
            assert_eq!(map_char(c), c);
        }
    }

    #[test]
    fn test_sanskrit_names() {
        let input = "Håñi Kåñëa Håñi Kåñëa, Kåñëa Kåñëa Håñi Håñi";
        let expected = "Hṛṣi Kṛṣṇa Hṛṣi Kṛṣṇa, Kṛṣṇa Kṛṣṇa Hṛṣi Hṛṣi";
        assert_eq!(map_text(input), expected);
    }

    #[test]
    fn test_uppercase_and_specials() {
        assert_eq!(map_text("ÇRÉLA PRABHUPÄDA"), "ŚRĪLA PRABHUPĀDA");
        assert_eq!(map_text("sa~sära"), "saɱsāra");
        assert_eq!(map_text("\u{201C}Om\u{201D} \u{2018}tat\u{2019}"), "\"Om\" 'tat'");
        assert_eq!(map_text("wait\u{2026}"), "wait\u{2026}");
    }

    #[test]
    fn test_map_text_preserves_length() {
        let input = "Çré Kåñëa Caitanya, Prabhu Nityänanda\u{2026} “ok”";
        let output = map_text(input);
        assert_eq!(input.chars().count(), output.chars().count());
    }

    #[test]
    fn test_untouched_characters_keep_order() {
        let input = "xåyñz";
        let output = map_text(input);
        let kept: String = output.chars().filter(|c| c.is_ascii()).collect();
        assert_eq!(kept, "xyz");
    }

    #[test]
    fn test_converted_text_is_stable() {
        // ñ is both a source (retroflex s) and a target (palatal nasal), so
        // this only holds for text without it.
        let converted = map_text("Çré Kåñëa Caitanya Mahäprabhu");
        assert_eq!(map_text(&converted), converted);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(map_text(""), "");
    }

    #[test]
    fn test_is_balaram() {
        assert!(is_balaram('å'));
        assert!(is_balaram('\u{2019}'));
        assert!(!is_balaram('\''));
        assert!(!is_balaram('\u{2026}'));
        assert!(!is_balaram('a'));
    }

    #[test]
    fn test_custom_table() {
        let map = GlyphMap::from_pairs([('x', 'y')]);
        assert_eq!(map.map_text("axb"), "ayb");
        assert!(map.contains('x'));
        assert!(!map.contains('å'));
    }
}
