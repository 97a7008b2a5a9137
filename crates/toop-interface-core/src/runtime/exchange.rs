// crates/toop-interface-core/src/runtime/exchange.rs
// ============================================================================
// Module: Signed Message Exchange
// Description: Build and parse signed request/response containers.
// Purpose: Wrap TOOP envelopes into signed containers for transport.
// Dependencies: crate::runtime::{bundle, container}, crate::core::{message, xml}
// ============================================================================

//! ## Overview
//! Two builders implement [`SignedMessageBuilder`]:
//! - [`EnvelopeMessageBuilder`] writes the envelope directly as a single
//!   `TOOPRequest` / `TOOPResponse` entry.
//! - [`BundleMessageBuilder`] is the legacy path: it places the envelope into
//!   the `TOOPDataRequest` / `TOOPDataResponse` bundle slot.
//!
//! The parse helpers accept either layout, preferring the envelope entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::core::message::ProtocolError;
use crate::core::message::ToopRequest;
use crate::core::message::ToopResponse;
use crate::core::xml::XML_MIME_TYPE;
use crate::core::xml::from_xml_bytes;
use crate::core::xml::to_xml_bytes;
use crate::interfaces::SignedMessageBuilder;
use crate::runtime::bundle::BundleError;
use crate::runtime::bundle::MessageBundleBuilder;
use crate::runtime::bundle::TOOP_DATA_REQUEST_ENTRY;
use crate::runtime::bundle::TOOP_DATA_RESPONSE_ENTRY;
use crate::runtime::container::ContainerError;
use crate::runtime::container::SignedContainerReader;
use crate::runtime::container::SignedContainerWriter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Container entry name of a request envelope.
pub const TOOP_REQUEST_ENTRY: &str = "TOOPRequest";
/// Container entry name of a response envelope.
pub const TOOP_RESPONSE_ENTRY: &str = "TOOPResponse";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signed message build/parse errors.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The message violates a known protocol rule.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// XML marshalling failed.
    #[error("message xml error: {0}")]
    Xml(String),
    /// Container I/O or format failure.
    #[error("message container error: {0}")]
    Container(String),
}

impl From<ContainerError> for MessageError {
    fn from(err: ContainerError) -> Self {
        Self::Container(err.to_string())
    }
}

impl From<BundleError> for MessageError {
    fn from(err: BundleError) -> Self {
        Self::Container(err.to_string())
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds containers holding the envelope as its own entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeMessageBuilder;

impl SignedMessageBuilder for EnvelopeMessageBuilder {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn build_request(
        &self,
        request: &ToopRequest,
        key: &SigningKey,
    ) -> Result<Vec<u8>, MessageError> {
        request.validate()?;
        let bytes = to_xml_bytes(TOOP_REQUEST_ENTRY, request)
            .map_err(|err| MessageError::Xml(err.to_string()))?;
        let mut writer = SignedContainerWriter::new(Vec::new());
        writer.add_entry(TOOP_REQUEST_ENTRY, XML_MIME_TYPE, &bytes)?;
        Ok(writer.sign(key)?)
    }

    fn build_response(
        &self,
        response: &ToopResponse,
        key: &SigningKey,
    ) -> Result<Vec<u8>, MessageError> {
        response.validate()?;
        let bytes = to_xml_bytes(TOOP_RESPONSE_ENTRY, response)
            .map_err(|err| MessageError::Xml(err.to_string()))?;
        let mut writer = SignedContainerWriter::new(Vec::new());
        writer.add_entry(TOOP_RESPONSE_ENTRY, XML_MIME_TYPE, &bytes)?;
        Ok(writer.sign(key)?)
    }
}

/// Legacy builder placing the envelope into a message bundle slot.
///
/// Kept for peers that still read `TOOPDataRequest` / `TOOPDataResponse`;
/// new code should use [`EnvelopeMessageBuilder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleMessageBuilder;

impl SignedMessageBuilder for BundleMessageBuilder {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn build_request(
        &self,
        request: &ToopRequest,
        key: &SigningKey,
    ) -> Result<Vec<u8>, MessageError> {
        request.validate()?;
        let mut out = Vec::new();
        MessageBundleBuilder::new()
            .toop_data_request(request.clone())
            .sign_with_key(&mut out, key)?;
        Ok(out)
    }

    fn build_response(
        &self,
        response: &ToopResponse,
        key: &SigningKey,
    ) -> Result<Vec<u8>, MessageError> {
        response.validate()?;
        let mut out = Vec::new();
        MessageBundleBuilder::new()
            .toop_data_response(response.clone())
            .sign_with_key(&mut out, key)?;
        Ok(out)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a request from container bytes.
///
/// Returns `Ok(None)` when the container holds no recognized request entry.
///
/// # Errors
///
/// Returns [`MessageError`] when the container cannot be opened or the request
/// entry cannot be decoded.
pub fn parse_request_container(bytes: &[u8]) -> Result<Option<ToopRequest>, MessageError> {
    let reader = SignedContainerReader::open(bytes)?;
    parse_request_reader(&reader)
}

/// Parses a request from an opened container.
///
/// # Errors
///
/// Returns [`MessageError::Xml`] when the request entry cannot be decoded.
pub fn parse_request_reader(
    reader: &SignedContainerReader,
) -> Result<Option<ToopRequest>, MessageError> {
    decode_first(reader, &[TOOP_REQUEST_ENTRY, TOOP_DATA_REQUEST_ENTRY])
}

/// Parses a response from container bytes.
///
/// Returns `Ok(None)` when the container holds no recognized response entry.
///
/// # Errors
///
/// Returns [`MessageError`] when the container cannot be opened or the
/// response entry cannot be decoded.
pub fn parse_response_container(bytes: &[u8]) -> Result<Option<ToopResponse>, MessageError> {
    let reader = SignedContainerReader::open(bytes)?;
    parse_response_reader(&reader)
}

/// Parses a response from an opened container.
///
/// # Errors
///
/// Returns [`MessageError::Xml`] when the response entry cannot be decoded.
pub fn parse_response_reader(
    reader: &SignedContainerReader,
) -> Result<Option<ToopResponse>, MessageError> {
    decode_first(reader, &[TOOP_RESPONSE_ENTRY, TOOP_DATA_RESPONSE_ENTRY])
}

/// Decodes the first present entry among `names`.
fn decode_first<T: serde::de::DeserializeOwned>(
    reader: &SignedContainerReader,
    names: &[&str],
) -> Result<Option<T>, MessageError> {
    for name in names {
        if let Some(bytes) = reader.entry(name) {
            let value =
                from_xml_bytes(bytes).map_err(|err| MessageError::Xml(format!("{name}: {err}")))?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
