//! Presentation document model: a package plus its parsed slides.

use crate::package::Package;
use crate::parser::slide_order;
use crate::shape::{classify_children, Shape};
use crate::xml::{XmlDocument, XmlElement};
use balaram_core::{Error, Result, SkippedElement};

/// One slide part.
#[derive(Debug)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,
    /// Part name inside the package.
    pub part_name: String,
    xml: XmlDocument,
    modified: bool,
}

impl Slide {
    /// Parse a slide part.
    pub fn parse(number: usize, part_name: impl Into<String>, data: &[u8]) -> Result<Self> {
        Ok(Self {
            number,
            part_name: part_name.into(),
            xml: XmlDocument::parse(data)?,
            modified: false,
        })
    }

    fn sp_tree(&mut self) -> Result<&mut XmlElement> {
        let part_name = &self.part_name;
        self.xml
            .root
            .find_path_mut(&["cSld", "spTree"])
            .ok_or_else(|| Error::CorruptedPart(format!("{} has no p:spTree", part_name)))
    }

    /// The slide's top-level shapes, each classified independently.
    pub fn shapes_mut(&mut self) -> Result<Vec<Result<Shape<'_>>>> {
        Ok(classify_children(self.sp_tree()?))
    }

    /// Flag the slide for re-serialization.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Serialize the slide part.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.xml.to_bytes()
    }
}

/// A presentation read from PPTX bytes.
#[derive(Debug)]
pub struct Presentation {
    package: Package,
    slides: Vec<Slide>,
    /// Slide parts that could not be read; they are written back untouched.
    unreadable: Vec<SkippedElement>,
}

impl Presentation {
    /// Read a presentation from PPTX bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    /// Read the slides of an already opened package.
    pub fn from_package(package: Package) -> Result<Self> {
        let order = slide_order(&package)?;
        let mut slides = Vec::with_capacity(order.len());
        let mut unreadable = Vec::new();

        for (idx, part_name) in order.into_iter().enumerate() {
            let number = idx + 1;
            let parsed = package
                .part(&part_name)
                .ok_or_else(|| Error::MissingPart(part_name.clone()))
                .and_then(|data| Slide::parse(number, part_name.as_str(), data));

            match parsed {
                Ok(slide) => slides.push(slide),
                Err(e) => {
                    log::warn!("Skipping slide {} ({}): {}", number, part_name, e);
                    unreadable.push(SkippedElement {
                        location: format!("slide {} ({})", number, part_name),
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!("Read {} slides", slides.len());
        Ok(Self {
            package,
            slides,
            unreadable,
        })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    /// Slides that could not be read.
    pub fn unreadable(&self) -> &[SkippedElement] {
        &self.unreadable
    }

    /// The underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Write the presentation. Only modified slides are re-serialized.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut package = self.package.clone();
        for slide in self.slides.iter().filter(|s| s.is_modified()) {
            package.set_part(&slide.part_name, slide.to_bytes()?);
        }
        package.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures::{picture, pptx, text_shape};

    #[test]
    fn test_reads_slides_in_order() {
        let bytes = pptx(
            &[
                text_shape(2, "First", &[&["one"]]),
                text_shape(2, "Second", &[&["two"]]),
            ],
            false,
        );
        let presentation = Presentation::from_bytes(&bytes).unwrap();
        let names: Vec<&str> = presentation
            .slides()
            .iter()
            .map(|s| s.part_name.as_str())
            .collect();
        assert_eq!(names, vec!["ppt/slides/slide1.xml", "ppt/slides/slide2.xml"]);
        assert_eq!(presentation.slides()[1].number, 2);
        assert!(presentation.unreadable().is_empty());
    }

    #[test]
    fn test_unmodified_presentation_keeps_parts() {
        let bytes = pptx(&[picture(2, "Picture 1")], false);
        let presentation = Presentation::from_bytes(&bytes).unwrap();
        let out = Package::from_bytes(&presentation.to_bytes().unwrap()).unwrap();
        let original = Package::from_bytes(&bytes).unwrap();

        let names: Vec<&str> = out.part_names().collect();
        let original_names: Vec<&str> = original.part_names().collect();
        assert_eq!(names, original_names);
        for name in original_names {
            assert_eq!(out.part(name), original.part(name), "part {}", name);
        }
    }

    #[test]
    fn test_unreadable_slide_is_recorded() {
        let bytes = crate::package::fixtures::zip_bytes(&[
            (
                "ppt/presentation.xml",
                crate::package::fixtures::presentation_xml(1, false).as_bytes(),
            ),
            (
                "ppt/_rels/presentation.xml.rels",
                crate::package::fixtures::presentation_rels(1).as_bytes(),
            ),
            ("ppt/slides/slide1.xml", b"<p:sld><unclosed></p:sld>".as_slice()),
        ]);
        let presentation = Presentation::from_bytes(&bytes).unwrap();
        assert!(presentation.slides().is_empty());
        assert_eq!(presentation.unreadable().len(), 1);
        assert!(presentation.unreadable()[0].location.contains("slide 1"));
    }

    #[test]
    fn test_latin1_slide_is_written_back_untouched() {
        use crate::package::fixtures::{presentation_rels, presentation_xml, slide_xml, zip_bytes};

        let mut latin1 = br#"<?xml version="1.0" encoding="ISO-8859-1"?><p:sld xmlns:a="urn:a" xmlns:p="urn:p"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>K"#.to_vec();
        latin1.push(0xE5);
        latin1.extend_from_slice(br#"a</a:t></a:r><a:r><a:t>sa~s</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#);
        let utf8 = slide_xml(&text_shape(2, "Title", &[&["Räma"]]));

        let presentation_part = presentation_xml(2, false);
        let rels = presentation_rels(2);
        let bytes = zip_bytes(&[
            ("ppt/presentation.xml", presentation_part.as_bytes()),
            ("ppt/_rels/presentation.xml.rels", rels.as_bytes()),
            ("ppt/slides/slide1.xml", latin1.as_slice()),
            ("ppt/slides/slide2.xml", utf8.as_bytes()),
        ]);

        let mut presentation = Presentation::from_bytes(&bytes).unwrap();
        assert_eq!(presentation.slides().len(), 1);
        assert_eq!(presentation.unreadable().len(), 1);

        let summary = crate::walker::convert_document(&mut presentation);
        assert_eq!(summary.conversion_count(), 1);
        assert_eq!(summary.skipped_count(), 1);
        assert!(summary.skipped[0].location.contains("slide1.xml"));

        let out = Package::from_bytes(&presentation.to_bytes().unwrap()).unwrap();
        assert_eq!(out.part("ppt/slides/slide1.xml"), Some(latin1.as_slice()));
        let converted = String::from_utf8(out.part("ppt/slides/slide2.xml").unwrap().to_vec()).unwrap();
        assert!(converted.contains("<a:t>Rāma</a:t>"));
    }

    #[test]
    fn test_slide_without_shape_tree() {
        let mut slide = Slide::parse(1, "ppt/slides/slide1.xml", b"<p:sld><p:cSld/></p:sld>").unwrap();
        assert!(matches!(slide.shapes_mut(), Err(Error::CorruptedPart(_))));
    }
}
