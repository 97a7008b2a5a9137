// crates/toop-interface-core/src/runtime/bundle.rs
// ============================================================================
// Module: Message Bundle
// Description: Legacy four-slot payload bundle and its sign/parse builder.
// Purpose: Map named payload slots to named signed-container entries.
// Dependencies: crate::runtime::{container, keystore}, crate::core::xml
// ============================================================================

//! ## Overview
//! A [`MessageBundle`] holds up to four independent payloads. Signing writes one
//! container entry per populated slot under a fixed name; parsing reads the
//! recognized entries back and ignores anything else.
//! Invariants:
//! - Entry names are fixed per slot (see [`BundleSlot::entry_name`]).
//! - Parsing does not verify the signature and aborts on the first entry that
//!   fails to deserialize.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;
use std::path::Path;

use ed25519_dalek::SigningKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::member_state::MsDataRequest;
use crate::core::member_state::MsDataResponse;
use crate::core::message::ToopRequest;
use crate::core::message::ToopResponse;
use crate::core::xml::XML_MIME_TYPE;
use crate::core::xml::from_xml_bytes;
use crate::core::xml::to_xml_bytes;
use crate::runtime::container::ContainerError;
use crate::runtime::container::SignedContainerReader;
use crate::runtime::container::SignedContainerWriter;
use crate::runtime::keystore::Keystore;
use crate::runtime::keystore::KeystoreError;

// ============================================================================
// SECTION: Slots
// ============================================================================

/// Container entry name of the member-state data request.
pub const MS_DATA_REQUEST_ENTRY: &str = "MSDataRequest";
/// Container entry name of the member-state data response.
pub const MS_DATA_RESPONSE_ENTRY: &str = "MSDataResponse";
/// Container entry name of the legacy TOOP data request.
pub const TOOP_DATA_REQUEST_ENTRY: &str = "TOOPDataRequest";
/// Container entry name of the legacy TOOP data response.
pub const TOOP_DATA_RESPONSE_ENTRY: &str = "TOOPDataResponse";

/// Named bundle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleSlot {
    /// Member-state data request.
    MsDataRequest,
    /// Member-state data response.
    MsDataResponse,
    /// TOOP data request.
    ToopDataRequest,
    /// TOOP data response.
    ToopDataResponse,
}

impl BundleSlot {
    /// All slots in signing order.
    pub const ALL: [Self; 4] =
        [Self::MsDataRequest, Self::MsDataResponse, Self::ToopDataRequest, Self::ToopDataResponse];

    /// Returns the container entry name for the slot.
    #[must_use]
    pub const fn entry_name(self) -> &'static str {
        match self {
            Self::MsDataRequest => MS_DATA_REQUEST_ENTRY,
            Self::MsDataResponse => MS_DATA_RESPONSE_ENTRY,
            Self::ToopDataRequest => TOOP_DATA_REQUEST_ENTRY,
            Self::ToopDataResponse => TOOP_DATA_RESPONSE_ENTRY,
        }
    }

    /// Resolves a container entry name to a slot.
    #[must_use]
    pub fn from_entry_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.entry_name() == name)
    }
}

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Four-slot payload bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBundle {
    /// Member-state data request.
    pub ms_data_request: Option<MsDataRequest>,
    /// Member-state data response.
    pub ms_data_response: Option<MsDataResponse>,
    /// TOOP data request.
    pub toop_data_request: Option<ToopRequest>,
    /// TOOP data response.
    pub toop_data_response: Option<ToopResponse>,
}

impl MessageBundle {
    /// Returns the populated slots in signing order.
    #[must_use]
    pub fn populated_slots(&self) -> Vec<BundleSlot> {
        BundleSlot::ALL.into_iter().filter(|slot| self.is_populated(*slot)).collect()
    }

    /// Returns true when `slot` holds a payload.
    #[must_use]
    pub const fn is_populated(&self, slot: BundleSlot) -> bool {
        match slot {
            BundleSlot::MsDataRequest => self.ms_data_request.is_some(),
            BundleSlot::MsDataResponse => self.ms_data_response.is_some(),
            BundleSlot::ToopDataRequest => self.toop_data_request.is_some(),
            BundleSlot::ToopDataResponse => self.toop_data_response.is_some(),
        }
    }

    /// Returns true when no slot is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ms_data_request.is_none()
            && self.ms_data_response.is_none()
            && self.toop_data_request.is_none()
            && self.toop_data_response.is_none()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bundle sign/parse errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Serialization or container I/O failed.
    #[error("bundle io error: {0}")]
    Io(String),
    /// Container could not be opened or an entry could not be decoded.
    #[error("bundle format error: {0}")]
    Format(String),
    /// Key material is missing or invalid.
    #[error("bundle signing error: {0}")]
    Signing(String),
}

impl From<ContainerError> for BundleError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Io(_) | ContainerError::Hash(_) => Self::Io(err.to_string()),
            ContainerError::Format(_)
            | ContainerError::InvalidEntryName(_)
            | ContainerError::DuplicateEntry(_)
            | ContainerError::TooLarge {
                ..
            } => Self::Format(err.to_string()),
        }
    }
}

impl From<KeystoreError> for BundleError {
    fn from(err: KeystoreError) -> Self {
        Self::Signing(err.to_string())
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder that assembles, signs, and parses message bundles.
#[derive(Debug, Clone, Default)]
pub struct MessageBundleBuilder {
    /// Bundle under construction.
    bundle: MessageBundle,
}

impl MessageBundleBuilder {
    /// Creates a builder with all slots empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the member-state data request slot.
    #[must_use]
    pub fn ms_data_request(mut self, payload: MsDataRequest) -> Self {
        self.bundle.ms_data_request = Some(payload);
        self
    }

    /// Sets the member-state data response slot.
    #[must_use]
    pub fn ms_data_response(mut self, payload: MsDataResponse) -> Self {
        self.bundle.ms_data_response = Some(payload);
        self
    }

    /// Sets the TOOP data request slot.
    #[must_use]
    pub fn toop_data_request(mut self, payload: ToopRequest) -> Self {
        self.bundle.toop_data_request = Some(payload);
        self
    }

    /// Sets the TOOP data response slot.
    #[must_use]
    pub fn toop_data_response(mut self, payload: ToopResponse) -> Self {
        self.bundle.toop_data_response = Some(payload);
        self
    }

    /// Returns the bundle without signing it.
    #[must_use]
    pub fn build(self) -> MessageBundle {
        self.bundle
    }

    /// Signs the populated slots into `output_sink` with the first key of the
    /// keystore at `keystore_path`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Signing`] when the key material is invalid or
    /// missing, and [`BundleError::Io`] when serialization or writing fails.
    pub fn sign<W: Write>(
        self,
        output_sink: W,
        keystore_path: &Path,
        keystore_password: &str,
        key_password: &str,
    ) -> Result<MessageBundle, BundleError> {
        let keystore = Keystore::load(keystore_path, keystore_password)?;
        let key = keystore.signing_key(None, key_password)?;
        self.sign_with_key(output_sink, &key)
    }

    /// Signs the populated slots into `output_sink` with an unlocked key.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Io`] when serialization or writing fails.
    pub fn sign_with_key<W: Write>(
        self,
        output_sink: W,
        key: &SigningKey,
    ) -> Result<MessageBundle, BundleError> {
        let mut writer = SignedContainerWriter::new(output_sink);
        let bundle = &self.bundle;
        if let Some(payload) = &bundle.ms_data_request {
            add_payload(&mut writer, BundleSlot::MsDataRequest, payload)?;
        }
        if let Some(payload) = &bundle.ms_data_response {
            add_payload(&mut writer, BundleSlot::MsDataResponse, payload)?;
        }
        if let Some(payload) = &bundle.toop_data_request {
            add_payload(&mut writer, BundleSlot::ToopDataRequest, payload)?;
        }
        if let Some(payload) = &bundle.toop_data_response {
            add_payload(&mut writer, BundleSlot::ToopDataResponse, payload)?;
        }
        writer.sign(key)?;
        Ok(self.bundle)
    }

    /// Parses a signed container into a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Format`] when the container cannot be opened or
    /// a recognized entry cannot be decoded.
    pub fn parse<R: Read>(input_source: R) -> Result<MessageBundle, BundleError> {
        let reader = SignedContainerReader::open(input_source)?;
        Self::parse_reader(&reader)
    }

    /// Parses the payload entries of an opened container into a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Format`] when a recognized entry cannot be
    /// decoded.
    pub fn parse_reader(reader: &SignedContainerReader) -> Result<MessageBundle, BundleError> {
        let mut bundle = MessageBundle::default();
        for entry in reader.entries() {
            let Some(slot) = BundleSlot::from_entry_name(&entry.name) else {
                continue;
            };
            match slot {
                BundleSlot::MsDataRequest => {
                    bundle.ms_data_request = Some(decode_payload(slot, &entry.bytes)?);
                }
                BundleSlot::MsDataResponse => {
                    bundle.ms_data_response = Some(decode_payload(slot, &entry.bytes)?);
                }
                BundleSlot::ToopDataRequest => {
                    bundle.toop_data_request = Some(decode_payload(slot, &entry.bytes)?);
                }
                BundleSlot::ToopDataResponse => {
                    bundle.toop_data_response = Some(decode_payload(slot, &entry.bytes)?);
                }
            }
        }
        Ok(bundle)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes one slot payload and appends it to the container.
fn add_payload<W: Write, T: Serialize>(
    writer: &mut SignedContainerWriter<W>,
    slot: BundleSlot,
    payload: &T,
) -> Result<(), BundleError> {
    let bytes = to_xml_bytes(slot.entry_name(), payload)
        .map_err(|err| BundleError::Io(format!("{}: {err}", slot.entry_name())))?;
    writer.add_entry(slot.entry_name(), XML_MIME_TYPE, &bytes)?;
    Ok(())
}

/// Deserializes one slot payload.
fn decode_payload<T: DeserializeOwned>(slot: BundleSlot, bytes: &[u8]) -> Result<T, BundleError> {
    from_xml_bytes(bytes)
        .map_err(|err| BundleError::Format(format!("{}: {err}", slot.entry_name())))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use ed25519_dalek::SigningKey;

    use super::BundleError;
    use super::BundleSlot;
    use super::MessageBundleBuilder;
    use crate::core::member_state::MsDataRequest;
    use crate::runtime::container::SignedContainerReader;
    use crate::runtime::container::SignedContainerWriter;
    use crate::runtime::keystore::Keystore;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[9; 32])
    }

    #[test]
    fn slot_names_round_trip() {
        for slot in BundleSlot::ALL {
            assert_eq!(BundleSlot::from_entry_name(slot.entry_name()), Some(slot));
        }
        assert_eq!(BundleSlot::from_entry_name("TOOPRequest"), None);
    }

    #[test]
    fn only_unrecognized_entries_parse_to_empty_bundle() {
        let mut writer = SignedContainerWriter::new(Vec::new());
        writer.add_entry("Attachment", "application/pdf", b"%PDF").unwrap();
        writer.add_entry("Notes", "text/plain", b"hello").unwrap();
        let bytes = writer.sign(&key()).unwrap();
        let bundle = MessageBundleBuilder::parse(bytes.as_slice()).unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn undecodable_recognized_entry_aborts_parse() {
        let mut writer = SignedContainerWriter::new(Vec::new());
        writer.add_entry("MSDataRequest", "application/xml", b"<MSDataRequest/>").unwrap();
        let bytes = writer.sign(&key()).unwrap();
        assert!(matches!(
            MessageBundleBuilder::parse(bytes.as_slice()),
            Err(BundleError::Format(_))
        ));
    }

    #[test]
    fn sign_with_keystore_path_writes_verifiable_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.toml");
        let mut keystore = Keystore::new("store").unwrap();
        let verifying = keystore.generate_key("only", "key").unwrap();
        keystore.save(&path).unwrap();

        let mut out = Vec::new();
        let bundle = MessageBundleBuilder::new()
            .ms_data_request(MsDataRequest::new("SE/1234"))
            .sign(&mut out, &path, "store", "key")
            .unwrap();
        assert_eq!(bundle.populated_slots(), vec![BundleSlot::MsDataRequest]);

        let reader = SignedContainerReader::open(out.as_slice()).unwrap();
        assert!(reader.verify(Some(&verifying)).is_pass());
    }

    #[test]
    fn sign_with_wrong_key_password_is_signing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.toml");
        let mut keystore = Keystore::new("store").unwrap();
        keystore.generate_key("only", "key").unwrap();
        keystore.save(&path).unwrap();

        let result = MessageBundleBuilder::new()
            .ms_data_request(MsDataRequest::new("SE/1234"))
            .sign(Vec::new(), &path, "store", "wrong");
        assert!(matches!(result, Err(BundleError::Signing(_))));

        let missing = MessageBundleBuilder::new().sign(
            Vec::new(),
            &dir.path().join("absent.toml"),
            "store",
            "key",
        );
        assert!(matches!(missing, Err(BundleError::Signing(_))));
    }
}
