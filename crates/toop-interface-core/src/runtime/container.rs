// crates/toop-interface-core/src/runtime/container.rs
// ============================================================================
// Module: Signed Container Writer and Reader
// Description: Tar-based signed containers with manifest and Ed25519 signature.
// Purpose: Write payload entries, sign them, read them back, verify on demand.
// Dependencies: crate::core::{container, hashing}, ed25519-dalek, tar
// ============================================================================

//! ## Overview
//! [`SignedContainerWriter`] appends payload entries to a tar stream and, on
//! [`SignedContainerWriter::sign`], appends the manifest and the signature
//! before finishing the archive. [`SignedContainerReader`] loads every entry
//! into memory and exposes payloads in archive order.
//! Invariants:
//! - Opening a container never checks the signature; [`SignedContainerReader::verify`]
//!   is the explicit verification step.
//! - A container without a manifest fails to open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier;
use ed25519_dalek::VerifyingKey;
use tar::Archive;
use tar::Builder;
use tar::EntryType;
use tar::Header;
use thiserror::Error;

use crate::core::container::CONTAINER_FORMAT_VERSION;
use crate::core::container::ContainerManifest;
use crate::core::container::ContainerSignature;
use crate::core::container::EntryRecord;
use crate::core::container::MANIFEST_PATH;
use crate::core::container::RESERVED_PREFIX;
use crate::core::container::SIGNATURE_PATH;
use crate::core::container::SIGNATURE_SCHEME;
use crate::core::container::VerificationReport;
use crate::core::container::VerificationStatus;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::hash_bytes;
use crate::core::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum total entry bytes accepted when opening a container.
pub const MAX_CONTAINER_BYTES: u64 = 32 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signed container errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Underlying stream failure.
    #[error("container io error: {0}")]
    Io(String),
    /// Archive or metadata is malformed.
    #[error("invalid container: {0}")]
    Format(String),
    /// Entry name is empty, unsafe, or reserved.
    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),
    /// Entry name was added twice.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),
    /// Manifest hashing failed.
    #[error("container hashing error: {0}")]
    Hash(String),
    /// Container exceeds [`MAX_CONTAINER_BYTES`].
    #[error("container exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Streaming writer for signed containers.
pub struct SignedContainerWriter<W: Write> {
    /// Tar builder over the output sink.
    builder: Builder<W>,
    /// Digest algorithm for the manifest.
    algorithm: HashAlgorithm,
    /// Manifest records in insertion order.
    entries: Vec<EntryRecord>,
    /// Names already written.
    names: BTreeSet<String>,
}

impl<W: Write> SignedContainerWriter<W> {
    /// Creates a writer targeting `sink`.
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self {
            builder: Builder::new(sink),
            algorithm: DEFAULT_HASH_ALGORITHM,
            entries: Vec::new(),
            names: BTreeSet::new(),
        }
    }

    /// Appends a named payload entry.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] when the name is invalid, reserved, or
    /// duplicated, or when writing to the sink fails.
    pub fn add_entry(
        &mut self,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<(), ContainerError> {
        validate_entry_name(name)?;
        if name.starts_with(RESERVED_PREFIX) {
            return Err(ContainerError::InvalidEntryName(format!(
                "{name} uses the reserved {RESERVED_PREFIX} prefix"
            )));
        }
        if !self.names.insert(name.to_string()) {
            return Err(ContainerError::DuplicateEntry(name.to_string()));
        }
        append_bytes(&mut self.builder, name, bytes)?;
        self.entries.push(EntryRecord {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            hash: hash_bytes(self.algorithm, bytes),
        });
        Ok(())
    }

    /// Returns the payload entry names written so far.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Writes the manifest and signature, finishes the archive, and returns
    /// the sink.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] when hashing or writing fails.
    pub fn sign(mut self, key: &SigningKey) -> Result<W, ContainerError> {
        let root_hash = hash_canonical_json(self.algorithm, &self.entries)
            .map_err(|err| ContainerError::Hash(err.to_string()))?;
        let manifest = ContainerManifest {
            version: CONTAINER_FORMAT_VERSION,
            hash_algorithm: self.algorithm,
            entries: std::mem::take(&mut self.entries),
            root_hash,
        };
        let manifest_bytes =
            canonical_json_bytes(&manifest).map_err(|err| ContainerError::Hash(err.to_string()))?;
        let signature = key.sign(&manifest_bytes);
        let signature_entry = ContainerSignature {
            scheme: SIGNATURE_SCHEME.to_string(),
            key_id: BASE64.encode(key.verifying_key().to_bytes()),
            signature: BASE64.encode(signature.to_bytes()),
        };
        let signature_bytes = canonical_json_bytes(&signature_entry)
            .map_err(|err| ContainerError::Hash(err.to_string()))?;
        append_bytes(&mut self.builder, MANIFEST_PATH, &manifest_bytes)?;
        append_bytes(&mut self.builder, SIGNATURE_PATH, &signature_bytes)?;
        self.builder.into_inner().map_err(|err| ContainerError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Payload entry loaded from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Entry name.
    pub name: String,
    /// Entry bytes.
    pub bytes: Vec<u8>,
}

/// In-memory reader for signed containers.
#[derive(Debug, Clone)]
pub struct SignedContainerReader {
    /// Payload entries in archive order.
    entries: Vec<ContainerEntry>,
    /// Parsed manifest.
    manifest: ContainerManifest,
    /// Parsed signature, when present.
    signature: Option<ContainerSignature>,
}

impl SignedContainerReader {
    /// Reads a container from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] when the archive is malformed, exceeds
    /// [`MAX_CONTAINER_BYTES`], or has no readable manifest.
    pub fn open<R: Read>(source: R) -> Result<Self, ContainerError> {
        let mut archive = Archive::new(source);
        let mut entries: Vec<ContainerEntry> = Vec::new();
        let mut manifest_bytes = None;
        let mut signature_bytes = None;
        let mut total_bytes = 0u64;
        for entry in archive.entries().map_err(|err| ContainerError::Io(err.to_string()))? {
            let mut entry = entry.map_err(|err| ContainerError::Format(err.to_string()))?;
            if entry.header().entry_type() != EntryType::Regular {
                return Err(ContainerError::Format(
                    "containers may only hold regular entries".to_string(),
                ));
            }
            let name = {
                let path = entry.path().map_err(|err| ContainerError::Format(err.to_string()))?;
                path.to_str()
                    .ok_or_else(|| ContainerError::Format("entry name is not utf-8".to_string()))?
                    .to_string()
            };
            total_bytes = total_bytes
                .checked_add(entry.size())
                .ok_or_else(|| ContainerError::Format("container size overflow".to_string()))?;
            if total_bytes > MAX_CONTAINER_BYTES {
                return Err(ContainerError::TooLarge {
                    size: total_bytes,
                    limit: MAX_CONTAINER_BYTES,
                });
            }
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(|err| ContainerError::Io(err.to_string()))?;
            match name.as_str() {
                MANIFEST_PATH => manifest_bytes = Some(bytes),
                SIGNATURE_PATH => signature_bytes = Some(bytes),
                other if other.starts_with(RESERVED_PREFIX) => {}
                _ => {
                    validate_entry_name(&name)?;
                    if entries.iter().any(|existing| existing.name == name) {
                        return Err(ContainerError::DuplicateEntry(name));
                    }
                    entries.push(ContainerEntry {
                        name,
                        bytes,
                    });
                }
            }
        }
        let manifest_bytes = manifest_bytes
            .ok_or_else(|| ContainerError::Format(format!("missing {MANIFEST_PATH}")))?;
        let manifest: ContainerManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|err| ContainerError::Format(format!("invalid manifest: {err}")))?;
        let signature = signature_bytes
            .map(|bytes| serde_json::from_slice::<ContainerSignature>(&bytes))
            .transpose()
            .map_err(|err| ContainerError::Format(format!("invalid signature entry: {err}")))?;
        Ok(Self {
            entries,
            manifest,
            signature,
        })
    }

    /// Returns payload entries in archive order.
    #[must_use]
    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    /// Returns the bytes of a named payload entry.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|entry| entry.name == name).map(|entry| entry.bytes.as_slice())
    }

    /// Returns the parsed manifest.
    #[must_use]
    pub const fn manifest(&self) -> &ContainerManifest {
        &self.manifest
    }

    /// Returns the parsed signature entry, when present.
    #[must_use]
    pub const fn signature(&self) -> Option<&ContainerSignature> {
        self.signature.as_ref()
    }

    /// Verifies entry digests, the manifest root hash, and the signature.
    ///
    /// When `trusted` is provided, the signer must be that key.
    #[must_use]
    pub fn verify(&self, trusted: Option<&VerifyingKey>) -> VerificationReport {
        let mut errors = Vec::new();
        let mut checked = 0usize;
        let algorithm = self.manifest.hash_algorithm;

        if self.manifest.version != CONTAINER_FORMAT_VERSION {
            errors.push(format!("unsupported manifest version {}", self.manifest.version));
        }

        for record in &self.manifest.entries {
            match self.entry(&record.name) {
                Some(bytes) => {
                    if hash_bytes(algorithm, bytes) != record.hash {
                        errors.push(format!("hash mismatch for {}", record.name));
                    }
                    checked = checked.saturating_add(1);
                }
                None => errors.push(format!("missing entry {}", record.name)),
            }
        }
        for entry in &self.entries {
            if !self.manifest.entries.iter().any(|record| record.name == entry.name) {
                errors.push(format!("entry {} is not listed in the manifest", entry.name));
            }
        }

        if let Ok(root_hash) = hash_canonical_json(algorithm, &self.manifest.entries) {
            if root_hash != self.manifest.root_hash {
                errors.push("root hash mismatch".to_string());
            }
        } else {
            errors.push("failed to compute root hash".to_string());
        }

        match &self.signature {
            Some(signature) => {
                if let Err(err) = self.verify_signature(signature, trusted) {
                    errors.push(err);
                }
            }
            None => errors.push(format!("missing {SIGNATURE_PATH}")),
        }

        let status =
            if errors.is_empty() { VerificationStatus::Pass } else { VerificationStatus::Fail };
        VerificationReport {
            status,
            checked_entries: checked,
            signer_key_id: self.signature.as_ref().map(|signature| signature.key_id.clone()),
            errors,
        }
    }

    /// Checks the detached signature over the canonical manifest bytes.
    fn verify_signature(
        &self,
        signature: &ContainerSignature,
        trusted: Option<&VerifyingKey>,
    ) -> Result<(), String> {
        if signature.scheme != SIGNATURE_SCHEME {
            return Err(format!("unsupported signature scheme {}", signature.scheme));
        }
        let key_bytes = BASE64
            .decode(signature.key_id.as_bytes())
            .map_err(|_| "invalid signer key id".to_string())?;
        let key_bytes: [u8; 32] =
            key_bytes.as_slice().try_into().map_err(|_| "invalid signer key id".to_string())?;
        let signer =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| "invalid signer key id".to_string())?;
        if let Some(trusted) = trusted
            && trusted.as_bytes() != signer.as_bytes()
        {
            return Err("signer is not the trusted key".to_string());
        }
        let signature_bytes = BASE64
            .decode(signature.signature.as_bytes())
            .map_err(|_| "invalid signature encoding".to_string())?;
        let parsed = Signature::from_slice(&signature_bytes)
            .map_err(|_| "invalid signature encoding".to_string())?;
        let message = canonical_json_bytes(&self.manifest).map_err(|err| err.to_string())?;
        signer.verify(&message, &parsed).map_err(|_| "signature verification failed".to_string())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends a regular file entry with deterministic metadata.
fn append_bytes<W: Write>(
    builder: &mut Builder<W>,
    name: &str,
    bytes: &[u8],
) -> Result<(), ContainerError> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
    header.set_mode(0o644);
    header.set_mtime(0);
    builder.append_data(&mut header, name, bytes).map_err(|err| ContainerError::Io(err.to_string()))
}

/// Rejects empty, absolute, or traversing entry names.
fn validate_entry_name(name: &str) -> Result<(), ContainerError> {
    let unsafe_name = name.is_empty()
        || name.starts_with('/')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if unsafe_name {
        return Err(ContainerError::InvalidEntryName(name.to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::indexing_slicing,
        reason = "Test-only assertions."
    )]

    use ed25519_dalek::SigningKey;

    use super::ContainerError;
    use super::SignedContainerReader;
    use super::SignedContainerWriter;
    use crate::core::container::VerificationStatus;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn sample_container(signing_key: &SigningKey) -> Vec<u8> {
        let mut writer = SignedContainerWriter::new(Vec::new());
        writer.add_entry("Second", "application/xml", b"<b/>").unwrap();
        writer.add_entry("First", "application/xml", b"<a/>").unwrap();
        writer.sign(signing_key).unwrap()
    }

    #[test]
    fn written_container_reads_back_in_archive_order_and_verifies() {
        let signing_key = key(7);
        let bytes = sample_container(&signing_key);
        let reader = SignedContainerReader::open(bytes.as_slice()).unwrap();
        let names: Vec<&str> = reader.entries().iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
        assert_eq!(reader.entry("First"), Some(&b"<a/>"[..]));

        let report = reader.verify(Some(&signing_key.verifying_key()));
        assert_eq!(report.status, VerificationStatus::Pass, "{:?}", report.errors);
        assert_eq!(report.checked_entries, 2);
        assert!(report.signer_key_id.is_some());
    }

    #[test]
    fn verification_rejects_untrusted_signer() {
        let bytes = sample_container(&key(1));
        let reader = SignedContainerReader::open(bytes.as_slice()).unwrap();
        let report = reader.verify(Some(&key(2).verifying_key()));
        assert_eq!(report.status, VerificationStatus::Fail);
        assert!(report.errors.iter().any(|err| err.contains("trusted")));
        assert!(reader.verify(None).is_pass());
    }

    #[test]
    fn verification_detects_tampered_entry() {
        let bytes = sample_container(&key(3));
        let mut reader = SignedContainerReader::open(bytes.as_slice()).unwrap();
        reader.entries[0].bytes = b"<tampered/>".to_vec();
        let report = reader.verify(None);
        assert_eq!(report.status, VerificationStatus::Fail);
        assert!(report.errors.iter().any(|err| err == "hash mismatch for Second"));
    }

    #[test]
    fn writer_rejects_reserved_and_duplicate_names() {
        let mut writer = SignedContainerWriter::new(Vec::new());
        assert!(matches!(
            writer.add_entry("META-INF/manifest.json", "application/json", b"{}"),
            Err(ContainerError::InvalidEntryName(_))
        ));
        assert!(matches!(
            writer.add_entry("../escape", "application/xml", b"<a/>"),
            Err(ContainerError::InvalidEntryName(_))
        ));
        writer.add_entry("Entry", "application/xml", b"<a/>").unwrap();
        assert!(matches!(
            writer.add_entry("Entry", "application/xml", b"<a/>"),
            Err(ContainerError::DuplicateEntry(_))
        ));
        assert_eq!(writer.entry_names().collect::<Vec<_>>(), vec!["Entry"]);
    }

    #[test]
    fn garbage_and_empty_inputs_fail_to_open() {
        assert!(SignedContainerReader::open(&b"not a container"[..]).is_err());
        assert!(SignedContainerReader::open(&b""[..]).is_err());
    }
}
