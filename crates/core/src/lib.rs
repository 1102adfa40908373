//! Core character table, text conversion, and conversion bookkeeping
//! for turning Balaram-font text into Unicode transliteration.

pub mod converter;
pub mod error;
pub mod glyph_map;
pub mod stats;
pub mod summary;

pub use converter::TextConverter;
pub use error::{Error, Result};
pub use glyph_map::{is_balaram, map_char, map_text, GlyphMap, BALARAM_TABLE};
pub use stats::{preview, ConversionStats, Preview};
pub use summary::{ConversionSummary, SkippedElement};
