// crates/toop-interface-client/src/client.rs
// ============================================================================
// Module: TOOP Interface Client
// Description: Blocking HTTP client for the TOOP connector.
// Purpose: Deliver signed containers and run data-provider searches.
// Dependencies: toop-interface-core, toop-interface-config, reqwest, url
// ============================================================================

//! ## Overview
//! Every send builds a fresh signed container from the envelope, using the
//! keystore named in the current configuration snapshot, and POSTs it to the
//! target URL. Searches issue a GET against
//! `{toop.connector.url}/search-dp/{country}[/{doctype}]`.
//! Invariants:
//! - Redirects are rejected.
//! - Non-success send statuses are transport errors; non-success search
//!   statuses are protocol errors carrying the status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;

use ed25519_dalek::SigningKey;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use thiserror::Error;
use toop_interface_config::ConfigError;
use toop_interface_config::ConfigProvider;
use toop_interface_config::InterfaceConfig;
use toop_interface_config::keys;
use toop_interface_core::AuditSink;
use toop_interface_core::EnvelopeMessageBuilder;
use toop_interface_core::ErrorCode;
use toop_interface_core::ExchangeDirection;
use toop_interface_core::ExchangeEvent;
use toop_interface_core::ExchangeEventParams;
use toop_interface_core::ExchangeOutcome;
use toop_interface_core::MessageError;
use toop_interface_core::NoopAuditSink;
use toop_interface_core::ProtocolError;
use toop_interface_core::RequestParams;
use toop_interface_core::ResultList;
use toop_interface_core::SignedMessageBuilder;
use toop_interface_core::ToopRequest;
use toop_interface_core::ToopResponse;
use toop_interface_core::core::xml::from_xml_bytes;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum search response body size in bytes.
pub const MAX_SEARCH_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;
/// Content type of outbound container bodies.
const CONTAINER_CONTENT_TYPE: &str = "application/octet-stream";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Outbound client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or malformed argument; never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// Network or stream failure, including non-success send statuses.
    #[error("transport error: {0}")]
    Transport(String),
    /// Known protocol failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Container could not be built.
    #[error("message error: {0}")]
    Message(String),
    /// Signing key could not be loaded.
    #[error("signing error: {0}")]
    Signing(String),
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Message(_) => "message",
            Self::Signing(_) => "signing",
            Self::Config(_) => "config",
        }
    }
}

impl From<MessageError> for ClientError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Protocol(err) => Self::Protocol(err),
            other => Self::Message(other.to_string()),
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Outbound client for the TOOP connector.
#[derive(Clone)]
pub struct ToopInterfaceClient {
    /// Shared blocking HTTP client.
    http: Client,
    /// Configuration source; read once per call.
    config: Arc<ConfigProvider>,
    /// Build-and-sign capability.
    builder: Arc<dyn SignedMessageBuilder>,
    /// Audit sink for exchange events.
    audit: Arc<dyn AuditSink>,
}

impl ToopInterfaceClient {
    /// Builds a client using the timeout from the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the timeout is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: Arc<ConfigProvider>) -> Result<Self, ClientError> {
        let timeout = config.current().http_timeout()?;
        let http = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            config,
            builder: Arc::new(EnvelopeMessageBuilder),
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the build-and-sign capability.
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn SignedMessageBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    /// Signs `request` and delivers it to the configured data-consumer
    /// connector URL (`toop.connector.dc.url`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the URL is not configured, and
    /// otherwise the errors of [`Self::send_request_to`].
    pub fn send_request(&self, request: &ToopRequest) -> Result<(), ClientError> {
        let config = self.config.current();
        let target = required_url(&config, keys::CONNECTOR_DC_URL)?;
        self.send_request_with(&config, request, &target)
    }

    /// Signs `request` and delivers it to `target_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a bad URL,
    /// [`ClientError::Protocol`] for a request violating the protocol, and
    /// [`ClientError::Transport`] when delivery fails.
    pub fn send_request_to(
        &self,
        request: &ToopRequest,
        target_url: &str,
    ) -> Result<(), ClientError> {
        let config = self.config.current();
        self.send_request_with(&config, request, target_url)
    }

    /// Signs `response` and delivers it to the configured data-provider
    /// connector URL (`toop.connector.dp.url`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the URL is not configured, and
    /// otherwise the errors of [`Self::send_response_to`].
    pub fn send_response(&self, response: &ToopResponse) -> Result<(), ClientError> {
        let config = self.config.current();
        let target = required_url(&config, keys::CONNECTOR_DP_URL)?;
        self.send_response_with(&config, response, &target)
    }

    /// Signs `response` and delivers it to `target_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a bad URL,
    /// [`ClientError::Protocol`] for a response violating the protocol, and
    /// [`ClientError::Transport`] when delivery fails.
    pub fn send_response_to(
        &self,
        response: &ToopResponse,
        target_url: &str,
    ) -> Result<(), ClientError> {
        let config = self.config.current();
        self.send_response_with(&config, response, target_url)
    }

    /// Builds a request with a generated identifier and delivers it to the
    /// configured data-consumer connector URL.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::send_request`].
    #[deprecated(note = "build a ToopRequest and call send_request instead")]
    pub fn create_request_and_send(
        &self,
        params: RequestParams,
    ) -> Result<ToopRequest, ClientError> {
        let request = ToopRequest::from_params(params)?;
        self.send_request(&request)?;
        Ok(request)
    }

    /// Shared request path over one configuration snapshot.
    fn send_request_with(
        &self,
        config: &InterfaceConfig,
        request: &ToopRequest,
        target_url: &str,
    ) -> Result<(), ClientError> {
        let request_id = Some(request.request_id.as_str().to_string());
        let result = validate_target(target_url).and_then(|url| {
            request.validate()?;
            let key = signing_key(config)?;
            let bytes = self.builder.build_request(request, &key)?;
            self.post(&url, bytes)
        });
        self.record_send(target_url, request_id, &result);
        result.map(|_| ())
    }

    /// Shared response path over one configuration snapshot.
    fn send_response_with(
        &self,
        config: &InterfaceConfig,
        response: &ToopResponse,
        target_url: &str,
    ) -> Result<(), ClientError> {
        let request_id = Some(response.request.request_id.as_str().to_string());
        let result = validate_target(target_url).and_then(|url| {
            response.validate()?;
            let key = signing_key(config)?;
            let bytes = self.builder.build_response(response, &key)?;
            self.post(&url, bytes)
        });
        self.record_send(target_url, request_id, &result);
        result.map(|_| ())
    }

    /// POSTs container bytes; returns the status and body size on success.
    fn post(&self, url: &Url, bytes: Vec<u8>) -> Result<(StatusCode, usize), ClientError> {
        let size = bytes.len();
        let response = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, CONTAINER_CONTENT_TYPE)
            .body(bytes)
            .send()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("http status {status}")));
        }
        Ok((status, size))
    }

    /// Records an outbound exchange event.
    fn record_send(
        &self,
        target_url: &str,
        request_id: Option<String>,
        result: &Result<(StatusCode, usize), ClientError>,
    ) {
        let event = match result {
            Ok((status, size)) => ExchangeEventParams {
                direction: ExchangeDirection::Outbound,
                endpoint: target_url.to_string(),
                request_id,
                outcome: ExchangeOutcome::Ok,
                status: Some(status.as_u16()),
                error_kind: None,
                message: None,
                body_bytes: *size,
            },
            Err(err) => ExchangeEventParams {
                direction: ExchangeDirection::Outbound,
                endpoint: target_url.to_string(),
                request_id,
                outcome: ExchangeOutcome::Error,
                status: None,
                error_kind: Some(err.kind()),
                message: Some(err.to_string()),
                body_bytes: 0,
            },
        };
        self.audit.record(&ExchangeEvent::new(event));
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Queries the connector for data providers in `country_code`, optionally
    /// restricted to `document_type_code`.
    ///
    /// Returns `Ok(None)` when the service answers with an empty body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the base URL or country code
    /// is missing, and [`ClientError::Protocol`] with
    /// [`ErrorCode::SearchFailed`] for every failure after the request is
    /// issued, carrying the HTTP status when one was received.
    pub fn search_data_provider(
        &self,
        country_code: &str,
        document_type_code: Option<&str>,
    ) -> Result<Option<ResultList>, ClientError> {
        let config = self.config.current();
        let base = required_url(&config, keys::CONNECTOR_URL)?;
        let country_code = country_code.trim();
        if country_code.is_empty() {
            return Err(ClientError::Validation("country code is required".to_string()));
        }
        let url = search_url(&base, country_code, document_type_code)?;
        let result = self.fetch_search(&url);
        let params = match &result {
            Ok(fetched) => ExchangeEventParams {
                direction: ExchangeDirection::Outbound,
                endpoint: url.to_string(),
                request_id: None,
                outcome: ExchangeOutcome::Ok,
                status: Some(fetched.status),
                error_kind: None,
                message: None,
                body_bytes: fetched.body_bytes,
            },
            Err(err) => ExchangeEventParams {
                direction: ExchangeDirection::Outbound,
                endpoint: url.to_string(),
                request_id: None,
                outcome: ExchangeOutcome::Error,
                status: err.http_status,
                error_kind: Some(err.code.as_str()),
                message: Some(err.message.clone()),
                body_bytes: 0,
            },
        };
        self.audit.record(&ExchangeEvent::new(params));
        result.map(|fetched| fetched.list).map_err(ClientError::from)
    }

    /// Issues the search GET and decodes the result list.
    fn fetch_search(&self, url: &Url) -> Result<SearchFetch, ProtocolError> {
        let response = self
            .http
            .get(url.as_str())
            .send()
            .map_err(|err| ProtocolError::new(ErrorCode::SearchFailed, err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::with_status(
                ErrorCode::SearchFailed,
                status.as_u16(),
                format!("search service answered {status}"),
            ));
        }
        let mut bytes = Vec::new();
        response
            .take(MAX_SEARCH_RESPONSE_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| ProtocolError::new(ErrorCode::SearchFailed, err.to_string()))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_SEARCH_RESPONSE_BYTES {
            return Err(ProtocolError::new(
                ErrorCode::SearchFailed,
                "search response exceeds size limit",
            ));
        }
        let list = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let parsed = from_xml_bytes::<ResultList>(&bytes)
                .map_err(|err| ProtocolError::new(ErrorCode::SearchFailed, err.to_string()))?;
            Some(parsed)
        };
        Ok(SearchFetch {
            list,
            status: status.as_u16(),
            body_bytes: bytes.len(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decoded search answer with the facts recorded for audit.
struct SearchFetch {
    /// Parsed result list; `None` for an empty body.
    list: Option<ResultList>,
    /// HTTP status received.
    status: u16,
    /// Body size in bytes.
    body_bytes: usize,
}

/// Returns a configured URL or a validation error naming the key.
fn required_url(config: &InterfaceConfig, key: &str) -> Result<String, ClientError> {
    config
        .get_string(key)
        .map(ToString::to_string)
        .ok_or_else(|| ClientError::Validation(format!("{key} is not configured")))
}

/// Parses a target URL and requires an http(s) scheme.
fn validate_target(target_url: &str) -> Result<Url, ClientError> {
    let trimmed = target_url.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("target url is required".to_string()));
    }
    let url = Url::parse(trimmed).map_err(|err| ClientError::Validation(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ClientError::Validation(format!("unsupported url scheme: {scheme}"))),
    }
}

/// Loads the signing key named by the configuration.
fn signing_key(config: &InterfaceConfig) -> Result<SigningKey, ClientError> {
    let material = config.key_material()?;
    material.load_signing_key().map_err(|err| ClientError::Signing(err.to_string()))
}

/// Builds `{base}/search-dp/{country}[/{doctype}]` with encoded segments.
fn search_url(
    base: &str,
    country_code: &str,
    document_type_code: Option<&str>,
) -> Result<Url, ClientError> {
    let mut url = validate_target(base)?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            ClientError::Validation(format!("{} cannot be a base url", keys::CONNECTOR_URL))
        })?;
        segments.pop_if_empty().push("search-dp").push(country_code);
        if let Some(doc_type) =
            document_type_code.map(str::trim).filter(|value| !value.is_empty())
        {
            segments.push(doc_type);
        }
    }
    Ok(url)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::search_url;
    use super::validate_target;

    #[test]
    fn search_url_omits_missing_document_type() {
        let url = search_url("http://localhost:8090/", "SE", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8090/search-dp/SE");
        let url = search_url("http://localhost:8090/connector", "SE", Some("  ")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8090/connector/search-dp/SE");
    }

    #[test]
    fn search_url_encodes_document_type_segment() {
        let url = search_url("http://localhost:8090", "AT", Some("urn:doc type#1")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8090/search-dp/AT/urn:doc%20type%231");
    }

    #[test]
    fn target_requires_http_scheme() {
        assert!(validate_target("").is_err());
        assert!(validate_target("ftp://example.org/x").is_err());
        assert!(validate_target("not a url").is_err());
        assert!(validate_target("https://connector.example.org/from-dc").is_ok());
    }
}
