// crates/toop-interface-core/src/core/container.rs
// ============================================================================
// Module: Signed Container Types
// Description: Manifest, signature, and verification report structures.
// Purpose: Describe the integrity metadata stored inside signed containers.
// Dependencies: crate::core::hashing, serde
// ============================================================================

//! ## Overview
//! A signed container is a tar archive of named payload entries followed by two
//! reserved metadata entries: a manifest indexing every payload by digest and a
//! detached Ed25519 signature over the canonical manifest bytes.
//! Invariants:
//! - Payload entry names are unique and never start with [`RESERVED_PREFIX`].
//! - The manifest root hash covers the canonical JSON of the entry list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix reserved for container metadata entries.
pub const RESERVED_PREFIX: &str = "META-INF/";
/// Archive path of the manifest entry.
pub const MANIFEST_PATH: &str = "META-INF/manifest.json";
/// Archive path of the signature entry.
pub const SIGNATURE_PATH: &str = "META-INF/signature.json";
/// Current manifest format version.
pub const CONTAINER_FORMAT_VERSION: u32 = 1;
/// Signature scheme label recorded in signature entries.
pub const SIGNATURE_SCHEME: &str = "ed25519";

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Manifest record for one payload entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Entry name inside the archive.
    pub name: String,
    /// MIME type of the entry payload.
    pub mime_type: String,
    /// Digest of the entry bytes.
    pub hash: HashDigest,
}

/// Container manifest stored at [`MANIFEST_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerManifest {
    /// Manifest format version.
    pub version: u32,
    /// Hash algorithm used for every digest.
    pub hash_algorithm: HashAlgorithm,
    /// Payload entries in archive order.
    pub entries: Vec<EntryRecord>,
    /// Digest of the canonical entry list.
    pub root_hash: HashDigest,
}

/// Detached signature stored at [`SIGNATURE_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSignature {
    /// Signature scheme name.
    pub scheme: String,
    /// Base64-encoded verifying key of the signer.
    pub key_id: String,
    /// Base64-encoded signature over the canonical manifest bytes.
    pub signature: String,
}

// ============================================================================
// SECTION: Verification Types
// ============================================================================

/// Verification status for container reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Verification succeeded.
    Pass,
    /// Verification failed.
    Fail,
}

/// Verification report for a signed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Verification status.
    pub status: VerificationStatus,
    /// Count of payload entries whose digest was checked.
    pub checked_entries: usize,
    /// Signer key identifier, when a signature entry was present.
    pub signer_key_id: Option<String>,
    /// Error messages, if any.
    pub errors: Vec<String>,
}

impl VerificationReport {
    /// Returns true when verification passed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.status == VerificationStatus::Pass
    }
}
