//! Slide discovery for PPTX packages.

use crate::package::Package;
use balaram_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// The main presentation part.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Relationships of the main presentation part.
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Get the ordered list of slide part names.
///
/// Order comes from `p:sldIdLst` in the presentation part, resolved through
/// its relationships. When the list is missing or unreadable, slides are
/// ordered by the number in their relationship id or file name.
pub fn slide_order(package: &Package) -> Result<Vec<String>> {
    let rels = package
        .part(PRESENTATION_RELS_PART)
        .ok_or_else(|| Error::MissingPart(PRESENTATION_RELS_PART.to_string()))?;
    let slide_rels = read_slide_relationships(rels)?;

    let listed = match package.part(PRESENTATION_PART) {
        Some(xml) => read_slide_id_list(xml).unwrap_or_else(|e| {
            log::warn!("Could not read slide list, using numeric order: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    if listed.is_empty() {
        return Ok(numeric_order(slide_rels));
    }

    let targets: HashMap<&str, &str> = slide_rels
        .iter()
        .map(|(id, target)| (id.as_str(), target.as_str()))
        .collect();

    let mut order = Vec::with_capacity(listed.len());
    for rel_id in &listed {
        match targets.get(rel_id.as_str()) {
            Some(target) => order.push(target.to_string()),
            None => log::warn!("Slide list references unknown relationship {}", rel_id),
        }
    }

    Ok(order)
}

/// Read `(Id, resolved part name)` of every slide relationship.
fn read_slide_relationships(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut slides = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                let target = attribute(e, b"Target").unwrap_or_default();
                let id = attribute(e, b"Id").unwrap_or_default();

                if rel_type.ends_with("/slide") && !target.is_empty() {
                    slides.push((id, resolve_target("ppt", &target)));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Read the relationship ids of `p:sldIdLst/p:sldId`, in document order.
fn read_slide_id_list(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    let mut buf = Vec::new();
    let mut in_list = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = true,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = false,
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_list && e.local_name().as_ref() == b"sldId" =>
            {
                // The relationship id is the prefixed `r:id`; the bare `id` is numeric.
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() != b"id" && a.key.local_name().as_ref() == b"id")
                    .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Order slide relationships by the number in their id or target.
fn numeric_order(mut slides: Vec<(String, String)>) -> Vec<String> {
    slides.sort_by_key(|(id, target)| {
        let number = extract_slide_number(target).or_else(|| extract_slide_number(id));
        (number.is_none(), number, target.clone())
    });
    slides.into_iter().map(|(_, target)| target).collect()
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures::{presentation_rels, presentation_xml, zip_bytes};

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("ppt", "/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
    }

    #[test]
    fn test_order_follows_slide_id_list() {
        // The list puts rId3 (slide2) before rId2 (slide1).
        let presentation = presentation_xml(2, false).replace(
            r#"<p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/>"#,
            r#"<p:sldId id="257" r:id="rId3"/><p:sldId id="256" r:id="rId2"/>"#,
        );
        let rels = presentation_rels(2);
        let bytes = zip_bytes(&[
            (PRESENTATION_PART, presentation.as_bytes()),
            (PRESENTATION_RELS_PART, rels.as_bytes()),
        ]);
        let package = Package::from_bytes(&bytes).unwrap();

        assert_eq!(
            slide_order(&package).unwrap(),
            vec!["ppt/slides/slide2.xml", "ppt/slides/slide1.xml"]
        );
    }

    #[test]
    fn test_numeric_fallback_without_slide_list() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide10.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/>
</Relationships>"#;
        let bytes = zip_bytes(&[(PRESENTATION_RELS_PART, rels.as_bytes())]);
        let package = Package::from_bytes(&bytes).unwrap();

        assert_eq!(
            slide_order(&package).unwrap(),
            vec!["ppt/slides/slide2.xml", "ppt/slides/slide10.xml"]
        );
    }

    #[test]
    fn test_missing_relationships_part() {
        let bytes = zip_bytes(&[("ppt/presentation.xml", b"<p:presentation/>".as_slice())]);
        let package = Package::from_bytes(&bytes).unwrap();
        assert!(matches!(slide_order(&package), Err(Error::MissingPart(_))));
    }
}
