//! XML parsing utilities for SpreadsheetML parts (workbook, relationships, styles, worksheets)
//! Provides a pull reader wrapper and helper traits for attribute and text processing

use crate::error::TableError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Streaming XML reader that reuses one event buffer for the whole part.
/// Only the events of the current element are held in memory.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader configured for SpreadsheetML parts
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // <mergeCell ref=".."/> and <c r=".."/> arrive as Start + End pairs
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, TableError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(TableError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, TableError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, TableError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, TableError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, TableError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => TableError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => TableError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML start tags providing attribute access by name
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TableError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, TableError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TableError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, TableError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for accumulating text content across XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a text or CDATA event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), TableError>;

    /// Appends text content from a general reference (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), TableError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), TableError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), TableError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Drives an `XmlReader` to the end of the document, dispatching events to the given arms.
/// Unmatched events are ignored; `break` inside an arm stops early.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::name::QName;
    use std::io::Cursor;

    fn reader(xml: &str) -> XmlReader<Cursor<Vec<u8>>> {
        XmlReader::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[test]
    fn empty_elements_are_expanded() -> Result<(), TableError> {
        let mut reader = reader(r#"<mergeCells><mergeCell ref="A1:B2"/></mergeCells>"#);
        let mut starts = 0;
        let mut ends = 0;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == QName(b"mergeCell") => {
                assert_eq!(event.get_attribute_value("ref")?.as_deref(), Some("A1:B2"));
                starts += 1;
            }
            Event::End(event) if event.name() == QName(b"mergeCell") => ends += 1,
        });
        assert_eq!((starts, ends), (1, 1));
        Ok(())
    }

    #[test]
    fn attribute_parsing() -> Result<(), TableError> {
        let mut reader = reader(r#"<row r="42" spans="x"/>"#);
        let mut row = None;
        let mut spans_failed = false;
        match_xml_events!(reader => {
            Event::Start(event) => {
                row = event.parse_attribute_value::<usize>("r")?;
                spans_failed = event.parse_attribute_value::<usize>("spans").is_err();
            }
        });
        assert_eq!(row, Some(42));
        assert!(spans_failed);
        Ok(())
    }

    #[test]
    fn text_with_references() -> Result<(), TableError> {
        let mut reader = reader("<t>A&amp;B&#x4E2D;&#25991;</t>");
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "A&B中文");
        Ok(())
    }
}
