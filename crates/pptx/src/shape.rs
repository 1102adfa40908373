//! Typed views over the shapes of a slide.
//!
//! A shape tree element is classified into one variant of [`Shape`]. Text
//! carriers and tables are validated while they are classified, so a shape
//! either yields complete mutable access to all of its runs or an error and
//! no access at all.

use crate::xml::XmlElement;
use balaram_core::{Error, Result};

/// `graphicData` URI of a table frame.
const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// Identity of a shape from its `cNvPr` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeInfo {
    pub id: Option<u32>,
    pub name: String,
}

impl ShapeInfo {
    fn of(element: &XmlElement) -> Self {
        let c_nv_pr = element
            .elements()
            .find(|e| e.local_name().starts_with("nv"))
            .and_then(|nv| nv.child("cNvPr"));

        let id = c_nv_pr
            .and_then(|c| c.attr("id"))
            .and_then(|id| id.parse().ok());
        let name = c_nv_pr
            .and_then(|c| c.attr("name"))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match id {
                Some(id) => format!("<{} #{}>", element.local_name(), id),
                None => format!("<{}>", element.local_name()),
            });

        Self { id, name }
    }
}

/// A shape on a slide or inside a group.
#[derive(Debug)]
pub enum Shape<'a> {
    /// Image; never inspected.
    Picture(ShapeInfo),
    /// A shape with an optional text frame.
    TextCarrier(TextCarrier<'a>),
    Table(Table<'a>),
    Group(Group<'a>),
    /// Connectors, charts, diagrams, OLE frames, and alternate content.
    Opaque(ShapeInfo),
}

impl<'a> Shape<'a> {
    /// Classify a shape tree child.
    ///
    /// Returns `None` for children that are not shapes (group properties,
    /// extension lists).
    pub fn classify(element: &'a mut XmlElement) -> Option<Result<Shape<'a>>> {
        let kind = element.local_name().to_string();
        let shape = match kind.as_str() {
            "pic" => Ok(Shape::Picture(ShapeInfo::of(element))),
            "sp" => TextCarrier::from_shape(element).map(Shape::TextCarrier),
            "grpSp" => Ok(Shape::Group(Group::from_element(element))),
            "graphicFrame" => classify_frame(element),
            "cxnSp" | "contentPart" | "AlternateContent" => {
                Ok(Shape::Opaque(ShapeInfo::of(element)))
            }
            _ => return None,
        };
        Some(shape)
    }

    /// Identity of the shape.
    pub fn info(&self) -> &ShapeInfo {
        match self {
            Shape::Picture(info) | Shape::Opaque(info) => info,
            Shape::TextCarrier(carrier) => &carrier.info,
            Shape::Table(table) => &table.info,
            Shape::Group(group) => &group.info,
        }
    }
}

fn classify_frame(element: &mut XmlElement) -> Result<Shape<'_>> {
    let info = ShapeInfo::of(element);
    let is_table = element
        .find_path(&["graphic", "graphicData"])
        .and_then(|data| data.attr("uri"))
        == Some(TABLE_URI);

    if !is_table {
        return Ok(Shape::Opaque(info));
    }

    match element.find_path_mut(&["graphic", "graphicData", "tbl"]) {
        Some(tbl) => Table::from_tbl(info, tbl).map(Shape::Table),
        None => Err(Error::malformed(info.name, "table frame without a:tbl")),
    }
}

/// A shape that may hold text.
#[derive(Debug)]
pub struct TextCarrier<'a> {
    pub info: ShapeInfo,
    /// `None` when the shape has no `txBody`.
    pub frame: Option<TextFrame<'a>>,
}

impl<'a> TextCarrier<'a> {
    fn from_shape(element: &'a mut XmlElement) -> Result<Self> {
        let info = ShapeInfo::of(element);
        Self::with_body(info, element)
    }

    /// Build a carrier from an element whose `txBody` child is the frame.
    fn with_body(info: ShapeInfo, element: &'a mut XmlElement) -> Result<Self> {
        let frame = match element.child_mut("txBody") {
            Some(body) => Some(TextFrame::from_body(&info, body)?),
            None => None,
        };
        Ok(Self { info, frame })
    }
}

/// The paragraphs of one `txBody`.
#[derive(Debug)]
pub struct TextFrame<'a> {
    pub paragraphs: Vec<Paragraph<'a>>,
}

impl<'a> TextFrame<'a> {
    fn from_body(info: &ShapeInfo, body: &'a mut XmlElement) -> Result<Self> {
        let paragraphs = body
            .elements_mut()
            .filter(|e| e.local_name() == "p")
            .map(|p| Paragraph::from_element(info, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { paragraphs })
    }

    /// Text of all runs, paragraphs separated by newlines.
    pub fn text(&self) -> Result<String> {
        let mut out = String::new();
        for (i, paragraph) in self.paragraphs.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for run in &paragraph.runs {
                out.push_str(&run.text()?);
            }
        }
        Ok(out)
    }

    /// Total number of runs.
    pub fn run_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.runs.len()).sum()
    }

    /// All runs, in order.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run<'a>> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

/// The runs of one `a:p`.
#[derive(Debug)]
pub struct Paragraph<'a> {
    pub runs: Vec<Run<'a>>,
}

impl<'a> Paragraph<'a> {
    fn from_element(info: &ShapeInfo, paragraph: &'a mut XmlElement) -> Result<Self> {
        let runs = paragraph
            .elements_mut()
            .filter(|e| e.local_name() == "r")
            .map(|r| {
                r.child_mut("t")
                    .map(|t| Run { t })
                    .ok_or_else(|| Error::malformed(info.name.as_str(), "run without a:t"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { runs })
    }
}

/// One `a:r`; only its `a:t` text is reachable.
#[derive(Debug)]
pub struct Run<'a> {
    t: &'a mut XmlElement,
}

impl Run<'_> {
    /// The run's text.
    pub fn text(&self) -> Result<String> {
        self.t.text()
    }

    /// Replace the run's text. Formatting is untouched.
    pub fn set_text(&mut self, text: &str) {
        self.t.set_text(text);
    }
}

/// A table frame.
#[derive(Debug)]
pub struct Table<'a> {
    pub info: ShapeInfo,
    pub rows: Vec<Vec<TextCarrier<'a>>>,
}

impl<'a> Table<'a> {
    fn from_tbl(info: ShapeInfo, tbl: &'a mut XmlElement) -> Result<Self> {
        let mut rows = Vec::new();
        for (r, row) in tbl
            .elements_mut()
            .filter(|e| e.local_name() == "tr")
            .enumerate()
        {
            let cells = row
                .elements_mut()
                .filter(|e| e.local_name() == "tc")
                .enumerate()
                .map(|(c, cell)| {
                    let cell_info = ShapeInfo {
                        id: None,
                        name: format!("{} cell ({}, {})", info.name, r + 1, c + 1),
                    };
                    TextCarrier::with_body(cell_info, cell)
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(Self { info, rows })
    }

    /// All cells, row by row.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TextCarrier<'a>> {
        self.rows.iter_mut().flatten()
    }
}

/// A group shape and its classified children.
#[derive(Debug)]
pub struct Group<'a> {
    pub info: ShapeInfo,
    /// Children in document order; each one classified independently.
    pub shapes: Vec<Result<Shape<'a>>>,
}

impl<'a> Group<'a> {
    fn from_element(element: &'a mut XmlElement) -> Self {
        let info = ShapeInfo::of(element);
        let shapes = classify_children(element);
        Self { info, shapes }
    }
}

/// Classify every shape child of a shape tree or group.
pub fn classify_children(container: &mut XmlElement) -> Vec<Result<Shape<'_>>> {
    container.elements_mut().filter_map(Shape::classify).collect()
}
