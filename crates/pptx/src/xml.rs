//! Round-trip XML tree for presentation parts.
//!
//! Text and attribute values are stored exactly as they appear in the part
//! (still escaped), so a tree that is parsed and written back without edits
//! keeps its content, prefixes, and declaration. Only text replaced through
//! [`XmlElement::set_text`] is escaped again.

use balaram_core::{Error, Result};
use quick_xml::escape::{partial_escape, unescape};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    /// Declaration content without the `<?` `?>` delimiters.
    Declaration(String),
    DocType(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let event = match self {
            XmlNode::Element(e) => return e.write_to(writer),
            XmlNode::Text(t) => Event::Text(BytesText::from_escaped(t.as_str())),
            XmlNode::CData(c) => Event::CData(BytesCData::new(c.as_str())),
            XmlNode::Comment(c) => Event::Comment(BytesText::from_escaped(c.as_str())),
            XmlNode::ProcessingInstruction(p) => Event::PI(BytesText::from_escaped(p.as_str())),
            XmlNode::Declaration(d) => {
                Event::Decl(BytesDecl::from_start(BytesStart::from_content(d.as_str(), 3)))
            }
            XmlNode::DocType(d) => Event::DocType(BytesText::from_escaped(d.as_str())),
        };
        writer.write_event(event).map_err(xml_error)
    }
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `p:sp`.
    pub name: String,
    /// Attributes as written, values still escaped.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Whether the element was written as `<x/>`.
    pub self_closing: bool,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    fn from_start(start: &BytesStart, self_closing: bool) -> Result<Self> {
        let name = utf8(start.name().as_ref())?;

        let mut attributes = Vec::new();
        for attr in start.attributes().with_checks(false) {
            let attr = attr
                .map_err(|e| Error::XmlError(format!("Bad attribute on <{}>: {}", name, e)))?;
            attributes.push((utf8(attr.key.as_ref())?, utf8(&attr.value)?));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            self_closing,
        })
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Raw (escaped) value of the attribute whose qualified name is `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Child elements, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// First child element with the given local name, mutably.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Follow a chain of local names down the first match at each level.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    /// Mutable variant of [`find_path`](Self::find_path).
    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// Unescaped concatenation of the element's direct text children.
    pub fn text(&self) -> Result<String> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => {
                    let text = unescape(t).map_err(|e| {
                        Error::XmlError(format!("Bad text in <{}>: {}", self.name, e))
                    })?;
                    out.push_str(&text);
                }
                XmlNode::CData(c) => out.push_str(c),
                _ => {}
            }
        }
        Ok(out)
    }

    /// Replace the element's text content, keeping child elements.
    pub fn set_text(&mut self, text: &str) {
        self.children
            .retain(|c| !matches!(c, XmlNode::Text(_) | XmlNode::CData(_)));
        if !text.is_empty() {
            self.children.insert(0, XmlNode::Text(partial_escape(text).into_owned()));
        }
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            // A value written between single quotes may hold a bare `"`.
            let value = value.replace('"', "&quot;");
            start.push_attribute((key.as_bytes(), value.as_bytes()));
        }

        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        } else {
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(self.name.as_str())))
                .map_err(xml_error)?;
        }

        Ok(())
    }
}

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Declaration, comments, and whitespace before the root.
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    /// Anything after the root.
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Parse a part.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);

        let mut buf = Vec::new();
        // Open elements; finished top-level nodes go to `nodes`.
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut nodes: Vec<XmlNode> = Vec::new();

        loop {
            buf.clear();
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            let node = match event {
                Event::Start(ref e) => {
                    stack.push(XmlElement::from_start(e, false)?);
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => XmlNode::Element(element),
                    None => return Err(Error::XmlError("Unbalanced end tag".into())),
                },
                Event::Empty(ref e) => XmlNode::Element(XmlElement::from_start(e, true)?),
                Event::Text(ref t) => XmlNode::Text(utf8(t)?),
                Event::CData(ref c) => XmlNode::CData(utf8(c)?),
                Event::Comment(ref c) => XmlNode::Comment(utf8(c)?),
                Event::PI(ref p) => XmlNode::ProcessingInstruction(utf8(p)?),
                Event::Decl(ref d) => {
                    check_encoding(d)?;
                    XmlNode::Declaration(utf8(d)?)
                }
                Event::DocType(ref d) => XmlNode::DocType(utf8(d)?),
                Event::Eof => break,
            };

            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => nodes.push(node),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::XmlError(format!("Unclosed element <{}>", open.name)));
        }

        let mut roots = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_element().is_some())
            .map(|(i, _)| i);
        let index = match (roots.next(), roots.next()) {
            (Some(index), None) => index,
            (None, _) => return Err(Error::XmlError("No root element".into())),
            (Some(_), Some(_)) => return Err(Error::XmlError("Multiple root elements".into())),
        };

        let epilog = nodes.split_off(index + 1);
        let root = match nodes.pop() {
            Some(XmlNode::Element(root)) => root,
            _ => return Err(Error::XmlError("No root element".into())),
        };

        Ok(Self {
            prolog: nodes,
            root,
            epilog,
        })
    }

    /// Serialize the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            node.write_to(&mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        for node in &self.epilog {
            node.write_to(&mut writer)?;
        }
        Ok(writer.into_inner())
    }
}

/// Extract the local name from a potentially prefixed name.
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// Decode raw part bytes. Parts are rewritten as UTF-8, so anything else is refused.
fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::XmlError(format!("Content is not UTF-8: {}", e)))
}

/// Refuse parts that declare an encoding other than UTF-8.
fn check_encoding(decl: &BytesDecl) -> Result<()> {
    match decl.encoding() {
        Some(Ok(encoding)) if !encoding.eq_ignore_ascii_case(b"UTF-8") => {
            Err(Error::XmlError(format!(
                "Unsupported encoding '{}'",
                String::from_utf8_lossy(&encoding)
            )))
        }
        Some(Err(e)) => Err(Error::XmlError(format!("Bad declaration: {}", e))),
        _ => Ok(()),
    }
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}
