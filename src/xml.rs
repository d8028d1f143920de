// src/xml.rs
//! Small XML element tree used for descriptor import and export.
//!
//! Parsing and writing go through `quick-xml`. Element and attribute names
//! are matched without regard to ASCII case.

use std::fmt::Display;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DescriptorError, Result};
use crate::util::{self, ParseInt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /* ── attributes ── */

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets or replaces an attribute, keeping insertion order.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Integer attribute in canonical form: `0x` hex padded to `hex_width`
    /// digits, or decimal when `hex_width` is `None`.
    pub fn set_int_attribute<T: Into<u64>>(&mut self, name: &str, value: T, hex_width: Option<usize>) {
        let value = value.into();
        let text = match hex_width {
            Some(width) => util::hexa(value, width),
            None => value.to_string(),
        };
        self.set_attribute(name, text);
    }

    /// Reads an integer attribute, decimal or `0x` hex.
    ///
    /// A missing optional attribute yields `default`. A missing required
    /// attribute, a value that does not parse, or one outside
    /// `min..=max` is an error.
    pub fn int_attribute<T>(&self, name: &str, required: bool, default: T, min: T, max: T) -> Result<T>
    where
        T: ParseInt + PartialOrd + Display,
    {
        let Some(text) = self.attribute(name) else {
            if required {
                return Err(DescriptorError::MissingAttribute {
                    element: self.name.clone(),
                    attribute: name.to_string(),
                });
            }
            return Ok(default);
        };
        match util::to_integer::<T>(text) {
            Some(v) if v >= min && v <= max => Ok(v),
            _ => Err(DescriptorError::InvalidAttribute {
                element: self.name.clone(),
                attribute: name.to_string(),
                value: text.to_string(),
            }),
        }
    }

    /* ── content ── */

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.has_name(name))
    }

    pub fn add_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Element text decoded as hex digits (whitespace allowed).
    pub fn hex_text(&self) -> Result<Vec<u8>> {
        util::hex_decode(&self.text).ok_or_else(|| DescriptorError::InvalidHex(self.text.trim().to_string()))
    }

    /// Hex content of child `name`, between `min_size` and `max_size` bytes.
    /// A missing optional child yields an empty vector.
    pub fn hex_text_child(&self, name: &str, required: bool, min_size: usize, max_size: usize) -> Result<Vec<u8>> {
        let Some(child) = self.child(name) else {
            if required {
                return Err(DescriptorError::UnexpectedElement {
                    expected: name.to_string(),
                    found: format!("no child in <{}>", self.name),
                });
            }
            return Ok(Vec::new());
        };
        let data = child.hex_text()?;
        if data.len() < min_size || data.len() > max_size {
            return Err(DescriptorError::InvalidAttribute {
                element: self.name.clone(),
                attribute: name.to_string(),
                value: format!("{} bytes", data.len()),
            });
        }
        Ok(data)
    }

    pub fn add_hex_text_child(&mut self, name: &str, data: &[u8]) {
        let mut child = Element::new(name);
        child.set_text(util::hex_encode(data));
        self.add_child(child);
    }

    /* ── text form ── */

    /// Parses a document and returns its root element.
    pub fn parse(text: &str) -> Result<Element> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Self::from_start(&e)?),
                Event::Empty(e) => {
                    let el = Self::from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Event::End(_) => {
                    let Some(el) = stack.pop() else {
                        return Err(DescriptorError::Xml("unbalanced end tag".into()));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {} // declaration, comments, processing instructions
            }
        }
        Err(DescriptorError::Xml("no root element".into()))
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Element> {
        let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()));
        for attr in e.attributes() {
            let attr = attr.map_err(|err| DescriptorError::Xml(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            el.attributes.push((key, value));
        }
        Ok(el)
    }

    /// Indented XML text for this element and its children.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| DescriptorError::Xml(e.to_string()))
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        if self.text.is_empty() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}
