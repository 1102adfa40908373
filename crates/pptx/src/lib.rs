//! PPTX (Office Open XML) support for Balaram-to-Unicode conversion.
//!
//! A .pptx file is a ZIP package of XML parts. This crate reads the package,
//! walks every slide's shape tree converting run text in place, and removes
//! the presentation's edit restriction.

pub mod document;
pub mod package;
pub mod parser;
pub mod pipeline;
pub mod shape;
pub mod unlock;
pub mod walker;
pub mod xml;

pub use document::{Presentation, Slide};
pub use package::Package;
pub use pipeline::{convert, unlock, Converter};
pub use shape::{Group, Paragraph, Run, Shape, ShapeInfo, Table, TextCarrier, TextFrame};
pub use unlock::{strip_modify_verifier, UnlockOutcome, UnlockStatus, Unlocker};
pub use walker::{convert_document, Walker};
pub use xml::{XmlDocument, XmlElement, XmlNode};
