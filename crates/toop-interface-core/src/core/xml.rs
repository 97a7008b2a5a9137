// crates/toop-interface-core/src/core/xml.rs
// ============================================================================
// Module: TOOP Interface XML Codec
// Description: Serde-backed XML marshalling for message payloads.
// Purpose: Convert payload structs to and from UTF-8 XML documents.
// Dependencies: quick-xml, serde
// ============================================================================

//! ## Overview
//! Every payload carried in a signed container is an XML document. The codec
//! writes an XML declaration followed by the payload under a caller-chosen root
//! element, and reads any root element back into the target type.
//!
//! The deserializer trims whitespace at the edges of text nodes before
//! resolving character references. Edge whitespace and carriage returns are
//! therefore written as character references so every string survives a
//! write/read cycle unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// XML declaration prepended to every serialized payload.
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// MIME type recorded for XML payload entries.
pub const XML_MIME_TYPE: &str = "application/xml";

/// Characters the deserializer treats as trimmable whitespace.
const XML_WHITESPACE: &[char] = &[' ', '\t', '\n', '\r'];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// XML marshalling errors.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Serialization failed.
    #[error("xml serialization failed: {0}")]
    Serialize(String),
    /// Payload bytes are not UTF-8.
    #[error("xml payload is not utf-8: {0}")]
    Encoding(String),
    /// Deserialization failed.
    #[error("xml deserialization failed: {0}")]
    Deserialize(String),
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Serializes a payload into UTF-8 XML bytes under `root`.
///
/// # Errors
///
/// Returns [`XmlError::Serialize`] when the value cannot be represented as XML.
pub fn to_xml_bytes<T: Serialize>(root: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let body = quick_xml::se::to_string_with_root(root, value)
        .map_err(|err| XmlError::Serialize(err.to_string()))?;
    let mut out = Vec::with_capacity(XML_DECLARATION.len() + body.len());
    out.extend_from_slice(XML_DECLARATION.as_bytes());
    out.extend_from_slice(&protect_text_edges(&body)?);
    Ok(out)
}

/// Deserializes UTF-8 XML bytes into a payload.
///
/// # Errors
///
/// Returns [`XmlError`] when the bytes are not UTF-8 or not a valid document
/// for `T`.
pub fn from_xml_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, XmlError> {
    let text = std::str::from_utf8(bytes).map_err(|err| XmlError::Encoding(err.to_string()))?;
    from_xml_str(text)
}

/// Deserializes an XML string into a payload.
///
/// # Errors
///
/// Returns [`XmlError::Deserialize`] when the document does not match `T`.
pub fn from_xml_str<T: DeserializeOwned>(text: &str) -> Result<T, XmlError> {
    quick_xml::de::from_str(text).map_err(|err| XmlError::Deserialize(err.to_string()))
}

// ============================================================================
// SECTION: Text Protection
// ============================================================================

/// Rewrites every text node so its edge whitespace cannot be trimmed on read.
fn protect_text_edges(body: &str) -> Result<Vec<u8>, XmlError> {
    let mut reader = Reader::from_str(body);
    let mut writer = Writer::new(Vec::with_capacity(body.len()));
    loop {
        let event = reader.read_event().map_err(|err| XmlError::Serialize(err.to_string()))?;
        let event = match event {
            Event::Eof => break,
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)
                    .map_err(|err| XmlError::Serialize(err.to_string()))?;
                Event::Text(BytesText::from_escaped(escape_edge_whitespace(raw)))
            }
            other => other,
        };
        writer.write_event(event).map_err(|err| XmlError::Serialize(err.to_string()))?;
    }
    Ok(writer.into_inner())
}

/// Escapes leading and trailing whitespace and every carriage return.
fn escape_edge_whitespace(raw: &str) -> String {
    let core_start = raw.len() - raw.trim_start_matches(XML_WHITESPACE).len();
    let core_end = raw.trim_end_matches(XML_WHITESPACE).len().max(core_start);
    let mut out = String::with_capacity(raw.len() + 16);
    for (index, ch) in raw.char_indices() {
        let edge = index < core_start || index >= core_end;
        match ch {
            '\r' => out.push_str("&#xD;"),
            ' ' if edge => out.push_str("&#x20;"),
            '\t' if edge => out.push_str("&#x9;"),
            '\n' if edge => out.push_str("&#xA;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
