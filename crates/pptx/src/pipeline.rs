//! Byte-level operations for callers: unlock a package, convert its text.
//!
//! Both operations take and return whole PPTX packages and never fail; a
//! package that cannot be processed comes back unchanged.

use crate::document::Presentation;
use crate::unlock::Unlocker;
use crate::walker::Walker;
use balaram_core::{ConversionSummary, Result, TextConverter};

/// Remove edit protection, returning the input unchanged when that is not possible.
pub fn unlock(bytes: &[u8]) -> Vec<u8> {
    Unlocker::new().unlock(bytes).bytes
}

/// Convert every Balaram run with the default converter.
pub fn convert(bytes: &[u8]) -> (Vec<u8>, ConversionSummary) {
    Converter::default().convert(bytes)
}

/// Converts the text of whole packages.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    text: TextConverter,
}

impl Converter {
    pub fn new(text: TextConverter) -> Self {
        Self { text }
    }

    /// Convert a package.
    ///
    /// When the package cannot be read or written, the input is returned and
    /// `summary.fallback` says why.
    pub fn convert(&self, bytes: &[u8]) -> (Vec<u8>, ConversionSummary) {
        match self.try_convert(bytes) {
            Ok(converted) => converted,
            Err(e) => {
                log::warn!("Conversion skipped, returning input unchanged: {}", e);
                (bytes.to_vec(), ConversionSummary::fallback(e.to_string()))
            }
        }
    }

    /// Convert a package, surfacing read and write errors.
    pub fn try_convert(&self, bytes: &[u8]) -> Result<(Vec<u8>, ConversionSummary)> {
        let mut presentation = Presentation::from_bytes(bytes)?;
        let summary = Walker::new(self.text.clone()).convert_document(&mut presentation);

        if !presentation.slides().iter().any(|s| s.is_modified()) {
            return Ok((bytes.to_vec(), summary));
        }
        Ok((presentation.to_bytes()?, summary))
    }
}
