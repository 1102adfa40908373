//! Per-document conversion bookkeeping.

use serde::{Deserialize, Serialize};

/// Tally of one document conversion.
///
/// Conversion is best-effort: a shape that cannot be converted is skipped and
/// listed in `skipped` while the rest of the document is still processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Slides visited.
    pub slides: usize,
    /// Shapes visited, nested shapes included.
    pub shapes_visited: usize,
    /// Pictures passed over without inspection.
    pub pictures_skipped: usize,
    /// Text frames visited, table cells included.
    pub text_frames: usize,
    /// Runs visited.
    pub runs_visited: usize,
    /// Runs whose text changed.
    pub runs_converted: usize,
    /// Characters replaced across all runs.
    pub chars_converted: usize,
    /// Shapes and parts left untouched because of an error.
    pub skipped: Vec<SkippedElement>,
    /// Set when the whole document was returned unchanged.
    pub fallback: Option<String>,
}

impl ConversionSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary for a document that could not be processed at all.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            fallback: Some(reason.into()),
            ..Self::default()
        }
    }

    /// The number of runs that were rewritten.
    pub fn conversion_count(&self) -> usize {
        self.runs_converted
    }

    /// Number of skipped elements.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Record a skipped element.
    pub fn skip(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedElement {
            location: location.into(),
            reason: reason.into(),
        });
    }

    /// Add `other` into `self`. Skipped entries keep their order, `other`'s last.
    pub fn merge(&mut self, other: ConversionSummary) {
        self.slides += other.slides;
        self.shapes_visited += other.shapes_visited;
        self.pictures_skipped += other.pictures_skipped;
        self.text_frames += other.text_frames;
        self.runs_visited += other.runs_visited;
        self.runs_converted += other.runs_converted;
        self.chars_converted += other.chars_converted;
        self.skipped.extend(other.skipped);
        if self.fallback.is_none() {
            self.fallback = other.fallback;
        }
    }
}

/// A shape or part that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedElement {
    /// Where the element lives, e.g. `slide 3 / Table 2`.
    pub location: String,
    /// Why it was skipped.
    pub reason: String,
}
