// crates/toop-interface-config/src/config.rs
// ============================================================================
// Module: TOOP Interface Configuration
// Description: Properties-file loading and typed configuration lookups.
// Purpose: Resolve, parse, and expose key/value settings with hard limits.
// Dependencies: toop-interface-core, java-properties
// ============================================================================

//! ## Overview
//! Configuration is a flat key/value map read from a Java-style properties
//! file. [`ConfigLoader`] tries, in order, the path named by
//! [`PROPERTIES_PATH_ENV_VAR`], then [`PRIVATE_PROPERTIES_NAME`], then
//! [`DEFAULT_PROPERTIES_NAME`]; the first file that exists and parses wins.
//! Snapshots are immutable once built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use toop_interface_core::KeyMaterial;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming an explicit properties file.
pub const PROPERTIES_PATH_ENV_VAR: &str = "TOOP_INTERFACE_PROPERTIES_PATH";
/// Private override file name, searched before the default.
pub const PRIVATE_PROPERTIES_NAME: &str = "private-toop-interface.properties";
/// Default properties file name.
pub const DEFAULT_PROPERTIES_NAME: &str = "toop-interface.properties";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default inbound bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8090";
/// Default role-A inbound route.
pub const DEFAULT_DC_ROUTE: &str = "/to-dc";
/// Default outbound HTTP timeout in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
/// Default inbound body limit in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Configuration keys.
pub mod keys {
    /// Debug mode flag.
    pub const GLOBAL_DEBUG: &str = "global.debug";
    /// Production mode flag.
    pub const GLOBAL_PRODUCTION: &str = "global.production";
    /// Connector URL for outbound requests (data consumer role).
    pub const CONNECTOR_DC_URL: &str = "toop.connector.dc.url";
    /// Connector URL for outbound responses (data provider role).
    pub const CONNECTOR_DP_URL: &str = "toop.connector.dp.url";
    /// Connector base URL for the data-provider search service.
    pub const CONNECTOR_URL: &str = "toop.connector.url";
    /// Keystore file path.
    pub const KEYSTORE_PATH: &str = "toop.keystore.path";
    /// Keystore password.
    pub const KEYSTORE_PASSWORD: &str = "toop.keystore.password";
    /// Signing key alias.
    pub const KEYSTORE_KEY_ALIAS: &str = "toop.keystore.key.alias";
    /// Signing key password.
    pub const KEYSTORE_KEY_PASSWORD: &str = "toop.keystore.key.password";
    /// Outbound HTTP timeout in milliseconds.
    pub const HTTP_TIMEOUT_MS: &str = "toop.http.timeout.ms";
    /// Inbound bind address.
    pub const INTERFACE_BIND: &str = "toop.interface.bind";
    /// Role-A inbound route.
    pub const INTERFACE_DC_ROUTE: &str = "toop.interface.dc.route";
    /// Require valid container signatures on inbound messages.
    pub const INTERFACE_VERIFY_SIGNATURE: &str = "toop.interface.verify.signature";
    /// Comma-separated base64 Ed25519 keys trusted to sign inbound containers.
    pub const INTERFACE_TRUSTED_KEYS: &str = "toop.interface.trusted.keys";
    /// Inbound body limit in bytes.
    pub const INTERFACE_MAX_BODY_BYTES: &str = "toop.interface.max.body.bytes";
    /// Audit log file path; stderr when unset.
    pub const INTERFACE_AUDIT_PATH: &str = "toop.interface.audit.path";
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// Properties parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Settings by key.
    values: BTreeMap<String, String>,
    /// File the snapshot was loaded from.
    source: Option<PathBuf>,
}

impl InterfaceConfig {
    /// Returns an empty snapshot; every lookup yields its default.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
            source: None,
        }
    }

    /// Parses properties text into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid properties.
    pub fn from_properties_str(text: &str) -> Result<Self, ConfigError> {
        let values = java_properties::read(text.as_bytes())
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(Self {
            values: values.into_iter().collect(),
            source: None,
        })
    }

    /// Loads a snapshot from a properties file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is invalid, the file cannot be
    /// read, exceeds [`MAX_CONFIG_FILE_SIZE`], or fails to parse.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_properties_str(content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Returns the file the snapshot was loaded from.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the snapshot holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // ------------------------------------------------------------------------
    // Generic lookups
    // ------------------------------------------------------------------------

    /// Returns the trimmed value for `key`, or `None` when absent or blank.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    /// Returns the value for `key`, or `default` when absent.
    #[must_use]
    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    /// Returns the boolean value for `key`, or `default` when absent or not a
    /// boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_string(key).map(str::to_ascii_lowercase).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Returns the unsigned value for `key`, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not an integer.
    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        self.get_string(key).map_or(Ok(default), |value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(format!("{key} must be an unsigned integer")))
        })
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    /// Returns whether debug mode is enabled (default `true`).
    #[must_use]
    pub fn is_global_debug(&self) -> bool {
        self.get_bool(keys::GLOBAL_DEBUG, true)
    }

    /// Returns whether production mode is enabled (default `false`).
    #[must_use]
    pub fn is_global_production(&self) -> bool {
        self.get_bool(keys::GLOBAL_PRODUCTION, false)
    }

    /// Returns the connector URL for outbound requests.
    #[must_use]
    pub fn dc_connector_url(&self) -> Option<&str> {
        self.get_string(keys::CONNECTOR_DC_URL)
    }

    /// Returns the connector URL for outbound responses.
    #[must_use]
    pub fn dp_connector_url(&self) -> Option<&str> {
        self.get_string(keys::CONNECTOR_DP_URL)
    }

    /// Returns the connector base URL for the search service.
    #[must_use]
    pub fn search_base_url(&self) -> Option<&str> {
        self.get_string(keys::CONNECTOR_URL)
    }

    /// Returns the keystore settings used for signing.
    ///
    /// A relative keystore path resolves against the directory of the loaded
    /// properties file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no keystore path is configured.
    pub fn key_material(&self) -> Result<KeyMaterial, ConfigError> {
        let raw = self
            .get_string(keys::KEYSTORE_PATH)
            .ok_or_else(|| ConfigError::Invalid(format!("{} is not set", keys::KEYSTORE_PATH)))?;
        validate_path(Path::new(raw))?;
        let path = PathBuf::from(raw);
        let keystore_path = match self.source.as_deref().and_then(Path::parent) {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        };
        Ok(KeyMaterial {
            keystore_path,
            keystore_password: self.get_string_or(keys::KEYSTORE_PASSWORD, "").to_string(),
            key_alias: self.get_string(keys::KEYSTORE_KEY_ALIAS).map(ToString::to_string),
            key_password: self.get_string_or(keys::KEYSTORE_KEY_PASSWORD, "").to_string(),
        })
    }

    /// Returns the outbound HTTP timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not an integer or is
    /// zero.
    pub fn http_timeout(&self) -> Result<Duration, ConfigError> {
        let millis = self.get_u64(keys::HTTP_TIMEOUT_MS, DEFAULT_HTTP_TIMEOUT_MS)?;
        if millis == 0 {
            return Err(ConfigError::Invalid(format!("{} must be positive", keys::HTTP_TIMEOUT_MS)));
        }
        Ok(Duration::from_millis(millis))
    }

    /// Returns the inbound bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.get_string_or(keys::INTERFACE_BIND, DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| {
            ConfigError::Invalid(format!("{} is not a socket address", keys::INTERFACE_BIND))
        })
    }

    /// Returns the role-A inbound route.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the route does not start with `/`
    /// or collides with `/to-dp`.
    pub fn dc_route(&self) -> Result<String, ConfigError> {
        let route = self.get_string_or(keys::INTERFACE_DC_ROUTE, DEFAULT_DC_ROUTE);
        if !route.starts_with('/') || route == "/to-dp" {
            return Err(ConfigError::Invalid(format!(
                "{} must start with '/' and differ from /to-dp",
                keys::INTERFACE_DC_ROUTE
            )));
        }
        Ok(route.to_string())
    }

    /// Returns whether inbound containers must carry a valid signature.
    #[must_use]
    pub fn verify_signature(&self) -> bool {
        self.get_bool(keys::INTERFACE_VERIFY_SIGNATURE, false)
    }

    /// Returns the encoded verifying keys trusted for inbound signatures.
    #[must_use]
    pub fn trusted_signer_keys(&self) -> Vec<String> {
        self.get_string(keys::INTERFACE_TRUSTED_KEYS)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the inbound body limit in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not an integer.
    pub fn max_body_bytes(&self) -> Result<usize, ConfigError> {
        let default = u64::try_from(DEFAULT_MAX_BODY_BYTES).unwrap_or(u64::MAX);
        let value = self.get_u64(keys::INTERFACE_MAX_BODY_BYTES, default)?;
        usize::try_from(value).map_err(|_| {
            ConfigError::Invalid(format!("{} is out of range", keys::INTERFACE_MAX_BODY_BYTES))
        })
    }

    /// Returns the audit log path, when configured.
    #[must_use]
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.get_string(keys::INTERFACE_AUDIT_PATH).map(PathBuf::from)
    }
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Failed attempt to load one candidate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    /// Candidate path.
    pub path: PathBuf,
    /// Failure reason.
    pub reason: String,
}

/// Result of resolving and loading configuration sources.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Loaded snapshot; empty when no candidate loaded.
    pub config: InterfaceConfig,
    /// Candidates that existed but failed, or were missing, in order.
    pub attempts: Vec<LoadAttempt>,
}

impl LoadResult {
    /// Returns true when a candidate loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.config.source().is_some()
    }
}

/// Resolves configuration candidates in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoader {
    /// Explicit override path.
    override_path: Option<PathBuf>,
    /// Directory searched for the private and default files.
    search_dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ConfigLoader {
    /// Creates a loader honoring [`PROPERTIES_PATH_ENV_VAR`] and searching the
    /// working directory.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            override_path: env::var_os(PROPERTIES_PATH_ENV_VAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            search_dir: PathBuf::from("."),
        }
    }

    /// Creates a loader searching `dir` with no override.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_path: None,
            search_dir: dir.into(),
        }
    }

    /// Sets the explicit override path.
    #[must_use]
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    /// Returns candidate paths in priority order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(path) = &self.override_path {
            candidates.push(path.clone());
        }
        candidates.push(self.search_dir.join(PRIVATE_PROPERTIES_NAME));
        candidates.push(self.search_dir.join(DEFAULT_PROPERTIES_NAME));
        candidates
    }

    /// Loads the first candidate that exists and parses.
    #[must_use]
    pub fn load(&self) -> LoadResult {
        let mut attempts = Vec::new();
        for path in self.candidates() {
            if !path.is_file() {
                attempts.push(LoadAttempt {
                    path,
                    reason: "not found".to_string(),
                });
                continue;
            }
            match InterfaceConfig::load_file(&path) {
                Ok(config) => {
                    return LoadResult {
                        config,
                        attempts,
                    };
                }
                Err(err) => attempts.push(LoadAttempt {
                    path,
                    reason: err.to_string(),
                }),
            }
        }
        LoadResult {
            config: InterfaceConfig::empty(),
            attempts,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Enforces path length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if let Component::Normal(value) = component
            && value.to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH
        {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
