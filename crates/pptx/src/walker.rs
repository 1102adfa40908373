//! Document tree walker: applies the text converter to every run.

use crate::document::{Presentation, Slide};
use crate::shape::{Shape, TextCarrier, TextFrame};
use balaram_core::{ConversionSummary, Result, TextConverter};

/// Walks slides, shapes, groups, and tables, converting run text in place.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    converter: TextConverter,
}

impl Walker {
    /// Create a walker with the given converter.
    pub fn new(converter: TextConverter) -> Self {
        Self { converter }
    }

    /// Convert every run of every slide.
    ///
    /// A shape that cannot be converted is left untouched and listed in the
    /// summary; the rest of the document is still converted.
    pub fn convert_document(&self, presentation: &mut Presentation) -> ConversionSummary {
        let mut summary = ConversionSummary::new();
        summary.skipped.extend(presentation.unreadable().iter().cloned());

        for slide in presentation.slides_mut() {
            summary.merge(self.convert_slide(slide));
        }

        log::debug!(
            "Converted {} of {} runs across {} slides ({} skipped)",
            summary.runs_converted,
            summary.runs_visited,
            summary.slides,
            summary.skipped_count()
        );
        summary
    }

    /// Convert one slide.
    pub fn convert_slide(&self, slide: &mut Slide) -> ConversionSummary {
        let mut summary = ConversionSummary::new();
        summary.slides = 1;
        let location = format!("slide {}", slide.number);

        let shapes = match slide.shapes_mut() {
            Ok(shapes) => shapes,
            Err(e) => {
                log::warn!("Skipping {}: {}", location, e);
                summary.skip(location, e.to_string());
                return summary;
            }
        };

        for shape in shapes {
            self.visit(shape, &location, &mut summary);
        }

        if summary.runs_converted > 0 {
            slide.mark_modified();
        }
        summary
    }

    fn visit(&self, shape: Result<Shape<'_>>, location: &str, summary: &mut ConversionSummary) {
        let shape = match shape {
            Ok(shape) => shape,
            Err(e) => {
                log::warn!("Skipping shape on {}: {}", location, e);
                summary.skip(location, e.to_string());
                return;
            }
        };
        summary.shapes_visited += 1;

        match shape {
            Shape::Picture(_) => summary.pictures_skipped += 1,
            Shape::Opaque(_) => {}
            Shape::TextCarrier(mut carrier) => {
                if let Err(e) = self.convert_carrier(&mut carrier, summary) {
                    log::warn!("Skipping '{}' on {}: {}", carrier.info.name, location, e);
                    summary.skip(format!("{} / {}", location, carrier.info.name), e.to_string());
                }
            }
            Shape::Table(mut table) => {
                for cell in table.cells_mut() {
                    if let Err(e) = self.convert_carrier(cell, summary) {
                        log::warn!("Skipping '{}' on {}: {}", cell.info.name, location, e);
                        summary.skip(format!("{} / {}", location, cell.info.name), e.to_string());
                    }
                }
            }
            Shape::Group(group) => {
                let group_location = format!("{} / {}", location, group.info.name);
                for child in group.shapes {
                    self.visit(child, &group_location, summary);
                }
            }
        }
    }

    fn convert_carrier(
        &self,
        carrier: &mut TextCarrier<'_>,
        summary: &mut ConversionSummary,
    ) -> Result<()> {
        match carrier.frame.as_mut() {
            Some(frame) => self.convert_frame(frame, summary),
            None => Ok(()),
        }
    }

    /// Convert the runs of one frame. Nothing is written unless every run
    /// could be read.
    fn convert_frame(
        &self,
        frame: &mut TextFrame<'_>,
        summary: &mut ConversionSummary,
    ) -> Result<()> {
        summary.text_frames += 1;
        if frame.text()?.trim().is_empty() {
            return Ok(());
        }

        let mut updates = Vec::with_capacity(frame.run_count());
        for run in frame.runs_mut() {
            let text = run.text()?;
            let converted = self.converter.convert_text(&text);
            let changed = self.converter.count_changes(&text);
            updates.push((converted != text).then_some((converted, changed)));
        }

        for (run, update) in frame.runs_mut().zip(updates) {
            summary.runs_visited += 1;
            if let Some((converted, changed)) = update {
                run.set_text(&converted);
                summary.runs_converted += 1;
                summary.chars_converted += changed;
            }
        }
        Ok(())
    }
}

/// Convert a presentation with the default converter.
pub fn convert_document(presentation: &mut Presentation) -> ConversionSummary {
    Walker::default().convert_document(presentation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures::{group, picture, pptx, slide_xml, table, text_shape};
    use crate::package::Package;

    fn run_texts(presentation: &mut Presentation) -> Vec<String> {
        let mut texts = Vec::new();
        for slide in presentation.slides_mut() {
            for shape in slide.shapes_mut().unwrap() {
                collect(shape.unwrap(), &mut texts);
            }
        }
        texts
    }

    fn collect(shape: Shape<'_>, texts: &mut Vec<String>) {
        let mut push = |carrier: &mut TextCarrier<'_>| {
            if let Some(frame) = carrier.frame.as_mut() {
                for run in frame.runs_mut() {
                    texts.push(run.text().unwrap());
                }
            }
        };
        match shape {
            Shape::TextCarrier(mut c) => push(&mut c),
            Shape::Table(mut t) => t.cells_mut().for_each(push),
            Shape::Group(g) => {
                for child in g.shapes {
                    collect(child.unwrap(), texts);
                }
            }
            Shape::Picture(_) | Shape::Opaque(_) => {}
        }
    }

    #[test]
    fn test_converts_runs_in_place() {
        let bytes = pptx(
            &[text_shape(2, "Title 1", &[&["Håñi ", "Kåñëa"], &["Räma"]])],
            false,
        );
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.slides, 1);
        assert_eq!(summary.runs_visited, 3);
        assert_eq!(summary.runs_converted, 3);
        assert_eq!(summary.chars_converted, 6);
        assert_eq!(run_texts(&mut presentation), vec!["Hṛṣi ", "Kṛṣṇa", "Rāma"]);
        assert!(presentation.slides()[0].is_modified());
    }

    #[test]
    fn test_visits_nested_groups_and_tables() {
        let nested = group(
            10,
            "Outer",
            &[
                text_shape(11, "A", &[&["å"]]),
                picture(12, "Pic in group"),
                group(
                    13,
                    "Inner",
                    &[table(14, "T", &[&["ñ", "ë"]]), picture(15, "Deep pic")].concat(),
                ),
            ]
            .concat(),
        );
        let shapes = [picture(2, "Top pic"), text_shape(3, "B", &[&["ç"]]), nested].concat();
        let bytes = pptx(&[shapes], false);
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.runs_visited, 4);
        assert_eq!(summary.runs_converted, 4);
        assert_eq!(summary.pictures_skipped, 3);
        // 3 top-level + Outer's 3 children + Inner's 2 children
        assert_eq!(summary.shapes_visited, 8);
        assert_eq!(run_texts(&mut presentation), vec!["ś", "ṛ", "ṣ", "ṇ"]);
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let bytes = pptx(
            &[text_shape(2, "Body", &[&["Hello ", "world"], &["again"]])],
            false,
        );
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.runs_visited, 3);
        assert_eq!(summary.conversion_count(), 0);
        assert!(!presentation.slides()[0].is_modified());
        assert_eq!(run_texts(&mut presentation), vec!["Hello ", "world", "again"]);

        let out = Package::from_bytes(&presentation.to_bytes().unwrap()).unwrap();
        let original = Package::from_bytes(&bytes).unwrap();
        assert_eq!(
            out.part("ppt/slides/slide1.xml"),
            original.part("ppt/slides/slide1.xml")
        );
    }

    #[test]
    fn test_whitespace_frame_is_short_circuited() {
        let bytes = pptx(&[text_shape(2, "Blank", &[&["  "], &[""]])], false);
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);
        assert_eq!(summary.text_frames, 1);
        assert_eq!(summary.runs_visited, 0);
    }

    #[test]
    fn test_bad_shape_does_not_stop_the_slide() {
        let broken = r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Broken"/></p:nvSpPr><p:txBody><a:p><a:r><a:rPr/></a:r></a:p></p:txBody></p:sp>"#;
        let shapes = [
            text_shape(2, "Before", &[&["å"]]),
            broken.to_string(),
            text_shape(3, "After", &[&["ñ"]]),
        ]
        .concat();
        let bytes = pptx(&[shapes], false);
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.runs_converted, 2);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped[0].location, "slide 1");
        assert!(summary.skipped[0].reason.contains("Broken"));
    }

    #[test]
    fn test_bad_run_text_leaves_frame_untouched() {
        // The second run holds an undefined entity, so neither run is rewritten.
        let shape = r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Odd"/></p:nvSpPr><p:txBody><a:p><a:r><a:t>Kåñëa</a:t></a:r><a:r><a:t>&bogus;</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let bytes = pptx(&[shape.to_string()], false);
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.runs_converted, 0);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped[0].location, "slide 1 / Odd");
    }

    #[test]
    fn test_bad_table_cell_is_named() {
        let bad_cell = table(4, "Table 1", &[&["å", "&bogus;"]]);
        let good = text_shape(5, "Body", &[&["ë"]]);
        let bytes = pptx(&[[bad_cell, good].concat()], false);
        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        let summary = convert_document(&mut presentation);

        assert_eq!(summary.runs_converted, 2);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped[0].location, "slide 1 / Table 1 cell (1, 2)");
    }

    #[test]
    fn test_slide_without_shape_tree_is_skipped() {
        let xml = slide_xml("").replace("p:spTree", "p:other");
        let mut slide = Slide::parse(4, "ppt/slides/slide4.xml", xml.as_bytes()).unwrap();
        let summary = Walker::default().convert_slide(&mut slide);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped[0].location, "slide 4");
    }
}
