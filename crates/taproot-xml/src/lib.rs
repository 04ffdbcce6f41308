//! A small attributed element tree used as the persisted form of Taproot state.
//!
//! Components serialize themselves into an [`Element`] and never touch XML
//! directly. Parsing goes through `roxmltree`, writing through `quick-xml`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("failed to parse XML: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("failed to write XML: {message}")]
    Write { message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A named node with ordered attributes, child elements and optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Element::add_child`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.add_child(child);
        self
    }

    /// Sets an attribute, replacing an existing value but keeping its position.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let position = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(position).1)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// All direct children with the given element name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First direct child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Parses a document and returns its root element.
    ///
    /// Whitespace-only text between elements is dropped.
    pub fn parse(text: &str) -> Result<Element, XmlError> {
        let document = roxmltree::Document::parse(text)?;
        Ok(from_node(document.root_element()))
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Element, XmlError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| XmlError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Element::parse(&text)
    }

    /// Serializes the element as an indented UTF-8 document.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        String::from_utf8(out).map_err(|err| XmlError::Write {
            message: err.to_string(),
        })
    }

    pub fn write_to(&self, out: impl Write) -> Result<(), XmlError> {
        let mut xml = Writer::new_with_indent(out, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        write_element(&mut xml, self)
    }

    /// Writes the document to `path`, creating parent directories as needed.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), XmlError> {
        let path = path.as_ref();
        let save_error = |source| XmlError::Save {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(save_error)?;
        }
        let text = self.to_xml_string()?;
        fs::write(path, text).map_err(save_error)
    }
}

fn from_node(node: roxmltree::Node<'_, '_>) -> Element {
    let mut element = Element::new(node.tag_name().name());
    for attribute in node.attributes() {
        element
            .attributes
            .push((attribute.name().to_owned(), attribute.value().to_owned()));
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            element.children.push(from_node(child));
        } else if child.is_text() {
            if let Some(chunk) = child.text() {
                text.push_str(chunk);
            }
        }
    }
    if !text.trim().is_empty() {
        element.text = Some(text);
    }
    element
}

fn write_element<W: Write>(xml: &mut Writer<W>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return xml.write_event(Event::Empty(start)).map_err(write_error);
    }

    xml.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = &element.text {
        xml.write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
    }
    for child in &element.children {
        write_element(xml, child)?;
    }
    xml.write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl std::fmt::Display) -> XmlError {
    XmlError::Write {
        message: err.to_string(),
    }
}
