// crates/toop-interface-core/src/runtime/keystore.rs
// ============================================================================
// Module: Signing Keystore
// Description: Password-sealed TOML keystore of Ed25519 signing keys.
// Purpose: Release container signing keys for a store password and key alias.
// Dependencies: ed25519-dalek, argon2, chacha20poly1305, subtle, toml, serde
// ============================================================================

//! ## Overview
//! A keystore file holds one or more Ed25519 signing keys under aliases.
//! Every secret key is sealed with ChaCha20-Poly1305 under a key derived from
//! its key password with Argon2id; the alias is bound as associated data. The
//! store password is checked against a salted Argon2id verifier in constant
//! time. When no alias is requested the first alias in lexical order is used.
//!
//! Security posture: keystore files are untrusted input; a wrong key password
//! and a tampered entry are indistinguishable and both fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::KeyInit;
use chacha20poly1305::Nonce;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::Payload;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current keystore format version.
pub const KEYSTORE_VERSION: u32 = 2;
/// Maximum keystore file size in bytes.
pub const MAX_KEYSTORE_BYTES: u64 = 64 * 1024;
/// Salt length for password derivation.
const SALT_BYTES: usize = 16;
/// ChaCha20-Poly1305 nonce length.
const NONCE_BYTES: usize = 12;
/// Derived key length.
const DERIVED_KEY_BYTES: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Keystore errors.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// Keystore file could not be read or written.
    #[error("keystore io error: {0}")]
    Io(String),
    /// Keystore document is malformed.
    #[error("keystore parse error: {0}")]
    Parse(String),
    /// Keystore content is invalid.
    #[error("invalid keystore: {0}")]
    Invalid(String),
    /// Key derivation or sealing failed.
    #[error("keystore crypto error: {0}")]
    Crypto(String),
    /// Store password does not match.
    #[error("keystore password rejected")]
    WrongPassword,
    /// Key password does not open the sealed key.
    #[error("key password rejected for alias {0}")]
    WrongKeyPassword(String),
    /// Requested alias does not exist.
    #[error("key alias not found: {0}")]
    MissingAlias(String),
    /// Keystore holds no keys.
    #[error("keystore holds no keys")]
    Empty,
}

// ============================================================================
// SECTION: File Format
// ============================================================================

/// Serialized keystore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeystoreFile {
    /// Format version.
    version: u32,
    /// Base64 salt for the store password verifier.
    store_salt: String,
    /// Base64 Argon2id digest of the store password.
    store_verifier: String,
    /// Keys by alias.
    #[serde(default)]
    keys: BTreeMap<String, KeyEntry>,
}

/// Serialized key entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyEntry {
    /// Base64 salt for the key password derivation.
    salt: String,
    /// Base64 ChaCha20-Poly1305 nonce.
    nonce: String,
    /// Base64 sealed 32-byte Ed25519 secret key.
    sealed_key: String,
}

// ============================================================================
// SECTION: Keystore
// ============================================================================

/// Unlocked keystore.
#[derive(Debug, Clone)]
pub struct Keystore {
    /// Backing document.
    file: KeystoreFile,
}

impl Keystore {
    /// Creates an empty keystore guarded by `password`.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Crypto`] when the verifier cannot be derived.
    pub fn new(password: &str) -> Result<Self, KeystoreError> {
        let salt = rand::random::<[u8; SALT_BYTES]>();
        let verifier = derive_key(password, &salt)?;
        Ok(Self {
            file: KeystoreFile {
                version: KEYSTORE_VERSION,
                store_salt: BASE64.encode(salt),
                store_verifier: BASE64.encode(verifier),
                keys: BTreeMap::new(),
            },
        })
    }

    /// Generates a random key under `alias` and returns its verifying key.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Crypto`] when the key cannot be sealed.
    pub fn generate_key(
        &mut self,
        alias: &str,
        key_password: &str,
    ) -> Result<VerifyingKey, KeystoreError> {
        let key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        self.insert_key(alias, key_password, &key)?;
        Ok(key.verifying_key())
    }

    /// Seals `key` under `alias`, replacing any previous key.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Crypto`] when the key cannot be sealed.
    pub fn insert_key(
        &mut self,
        alias: &str,
        key_password: &str,
        key: &SigningKey,
    ) -> Result<(), KeystoreError> {
        let entry = seal_key(alias, key_password, key)?;
        self.file.keys.insert(alias.to_string(), entry);
        Ok(())
    }

    /// Returns the aliases in lexical order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.file.keys.keys().map(String::as_str)
    }

    /// Releases the signing key for `alias` (or the first alias).
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError`] when the alias is unknown, the key password
    /// is wrong, or the stored entry is malformed or tampered with.
    pub fn signing_key(
        &self,
        alias: Option<&str>,
        key_password: &str,
    ) -> Result<SigningKey, KeystoreError> {
        let (alias, entry) = match alias {
            Some(alias) => self
                .file
                .keys
                .get_key_value(alias)
                .ok_or_else(|| KeystoreError::MissingAlias(alias.to_string()))?,
            None => self.file.keys.iter().next().ok_or(KeystoreError::Empty)?,
        };
        open_key(alias, key_password, entry)
    }

    /// Parses a keystore document and checks the store password.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError`] when parsing fails or the password is wrong.
    pub fn from_toml_str(text: &str, password: &str) -> Result<Self, KeystoreError> {
        let file: KeystoreFile =
            toml::from_str(text).map_err(|err| KeystoreError::Parse(err.to_string()))?;
        if file.version != KEYSTORE_VERSION {
            return Err(KeystoreError::Invalid(format!(
                "unsupported keystore version {}",
                file.version
            )));
        }
        let salt = decode_field("store", "store_salt", &file.store_salt)?;
        let verifier = decode_field("store", "store_verifier", &file.store_verifier)?;
        let expected = derive_key(password, &salt)?;
        if !secrets_match(&expected, &verifier) {
            return Err(KeystoreError::WrongPassword);
        }
        Ok(Self {
            file,
        })
    }

    /// Renders the keystore as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Parse`] when serialization fails.
    pub fn to_toml_string(&self) -> Result<String, KeystoreError> {
        toml::to_string(&self.file).map_err(|err| KeystoreError::Parse(err.to_string()))
    }

    /// Loads a keystore from disk.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError`] when the file cannot be read, is too large,
    /// is malformed, or the password is wrong.
    pub fn load(path: &Path, password: &str) -> Result<Self, KeystoreError> {
        let file = fs::File::open(path)
            .map_err(|err| KeystoreError::Io(format!("{}: {err}", path.display())))?;
        let mut text = String::new();
        file.take(MAX_KEYSTORE_BYTES + 1)
            .read_to_string(&mut text)
            .map_err(|err| KeystoreError::Io(format!("{}: {err}", path.display())))?;
        if u64::try_from(text.len()).unwrap_or(u64::MAX) > MAX_KEYSTORE_BYTES {
            return Err(KeystoreError::Invalid("keystore file exceeds size limit".to_string()));
        }
        Self::from_toml_str(&text, password)
    }

    /// Writes the keystore to disk.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError`] when serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), KeystoreError> {
        let text = self.to_toml_string()?;
        fs::write(path, text).map_err(|err| KeystoreError::Io(format!("{}: {err}", path.display())))
    }
}

// ============================================================================
// SECTION: Sealing
// ============================================================================

/// Derives a 32-byte key from a password with Argon2id.
fn derive_key(secret: &str, salt: &[u8]) -> Result<[u8; DERIVED_KEY_BYTES], KeystoreError> {
    let mut out = [0u8; DERIVED_KEY_BYTES];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), salt, &mut out)
        .map_err(|err| KeystoreError::Crypto(err.to_string()))?;
    Ok(out)
}

/// Compares two secrets in constant time.
fn secrets_match(left: &[u8], right: &[u8]) -> bool {
    left.ct_eq(right).into()
}

/// Seals a signing key under a password-derived key, bound to `alias`.
fn seal_key(alias: &str, key_password: &str, key: &SigningKey) -> Result<KeyEntry, KeystoreError> {
    let salt = rand::random::<[u8; SALT_BYTES]>();
    let nonce = rand::random::<[u8; NONCE_BYTES]>();
    let wrapping = derive_key(key_password, &salt)?;
    let cipher = ChaCha20Poly1305::new((&wrapping).into());
    let secret = key.to_bytes();
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: secret.as_slice(),
                aad: alias.as_bytes(),
            },
        )
        .map_err(|_| KeystoreError::Crypto(format!("failed to seal key {alias}")))?;
    Ok(KeyEntry {
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce),
        sealed_key: BASE64.encode(sealed),
    })
}

/// Opens a sealed signing key with its key password.
fn open_key(
    alias: &str,
    key_password: &str,
    entry: &KeyEntry,
) -> Result<SigningKey, KeystoreError> {
    let salt = decode_field(alias, "salt", &entry.salt)?;
    let nonce = decode_field(alias, "nonce", &entry.nonce)?;
    if nonce.len() != NONCE_BYTES {
        return Err(KeystoreError::Invalid(format!(
            "key {alias} nonce must be {NONCE_BYTES} bytes"
        )));
    }
    let sealed = decode_field(alias, "sealed_key", &entry.sealed_key)?;
    let wrapping = derive_key(key_password, &salt)?;
    let cipher = ChaCha20Poly1305::new((&wrapping).into());
    let secret = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: sealed.as_slice(),
                aad: alias.as_bytes(),
            },
        )
        .map_err(|_| KeystoreError::WrongKeyPassword(alias.to_string()))?;
    let secret: [u8; 32] = secret
        .as_slice()
        .try_into()
        .map_err(|_| KeystoreError::Invalid(format!("key {alias} must be 32 bytes")))?;
    Ok(SigningKey::from_bytes(&secret))
}

/// Decodes a base64 keystore field.
fn decode_field(owner: &str, field: &str, encoded: &str) -> Result<Vec<u8>, KeystoreError> {
    BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|_| KeystoreError::Invalid(format!("{owner} {field} is not base64")))
}

// ============================================================================
// SECTION: Key Material
// ============================================================================

/// Keystore location and credentials used by the signing paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Keystore file path.
    pub keystore_path: PathBuf,
    /// Store password.
    pub keystore_password: String,
    /// Key alias; `None` selects the first alias.
    pub key_alias: Option<String>,
    /// Key password.
    pub key_password: String,
}

impl KeyMaterial {
    /// Loads the keystore and releases the configured signing key.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError`] when the keystore or key cannot be unlocked.
    pub fn load_signing_key(&self) -> Result<SigningKey, KeystoreError> {
        let keystore = Keystore::load(&self.keystore_path, &self.keystore_password)?;
        keystore.signing_key(self.key_alias.as_deref(), &self.key_password)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
