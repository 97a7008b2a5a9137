// crates/toop-interface-server/src/server.rs
// ============================================================================
// Module: Inbound Server
// Description: HTTP endpoints receiving signed containers from the connector.
// Purpose: Dispatch inbound requests and responses to application callbacks.
// Dependencies: toop-interface-core, toop-interface-config, axum, tokio
// ============================================================================

//! ## Overview
//! Two POST routes are served:
//! - `/to-dp` parses a request container and calls the
//!   [`DataProviderCallback`]: 204 on success, 400 when the body is malformed
//!   or carries no request, 500 when the callback fails.
//! - the data-consumer route (default `/to-dc`) hands the body unparsed to the
//!   configured [`InboundBodyHandler`].
//!
//! Bodies are untrusted; oversized bodies are refused by the body limit layer
//! before any handler runs. Every call is single-shot and leaves no state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use tokio::net::TcpListener;
use toop_interface_config::InterfaceConfig;
use toop_interface_config::keys;
use toop_interface_core::AuditSink;
use toop_interface_core::ExchangeDirection;
use toop_interface_core::ExchangeEvent;
use toop_interface_core::ExchangeEventParams;
use toop_interface_core::ExchangeOutcome;
use toop_interface_core::NoopAuditSink;
use toop_interface_core::SignedContainerReader;
use toop_interface_core::parse_request_reader;

use crate::callback::DataProviderCallback;
use crate::callback::InboundBodyHandler;
use crate::callback::InboundOutcome;
use crate::callback::SignatureCheck;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Route receiving requests for the data provider.
pub const TO_DP_ROUTE: &str = "/to-dp";

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Listener and dispatch settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind address.
    pub bind: SocketAddr,
    /// Data-consumer route.
    pub dc_route: String,
    /// Maximum accepted body size.
    pub max_body_bytes: usize,
    /// Signature enforcement on the data-provider route.
    pub signature: SignatureCheck,
}

impl ServerSettings {
    /// Reads settings from a configuration snapshot.
    ///
    /// Configured trusted keys pin inbound signers. Without them the verify
    /// flag only checks that a container is intact and self-consistently
    /// signed.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when a value is invalid.
    pub fn from_config(config: &InterfaceConfig) -> Result<Self, ServerError> {
        let bind = config.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let dc_route = config.dc_route().map_err(|err| ServerError::Config(err.to_string()))?;
        let max_body_bytes =
            config.max_body_bytes().map_err(|err| ServerError::Config(err.to_string()))?;
        let trusted = config
            .trusted_signer_keys()
            .iter()
            .map(String::as_str)
            .map(decode_trusted_key)
            .collect::<Result<Vec<_>, _>>()?;
        let signature = if trusted.is_empty() {
            if config.verify_signature() {
                SignatureCheck::AnySigner
            } else {
                SignatureCheck::Disabled
            }
        } else {
            SignatureCheck::Trusted(trusted)
        };
        Ok(Self {
            bind,
            dc_route,
            max_body_bytes,
            signature,
        })
    }
}

/// Decodes one configured base64 verifying key.
fn decode_trusted_key(encoded: &str) -> Result<VerifyingKey, ServerError> {
    let invalid = |reason: &str| {
        ServerError::Config(format!("{} entry {reason}", keys::INTERFACE_TRUSTED_KEYS))
    };
    let bytes = BASE64.decode(encoded.as_bytes()).map_err(|_| invalid("is not base64"))?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| invalid("must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| invalid("is not an Ed25519 key"))
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Inbound HTTP server.
pub struct InboundServer {
    /// Listener and dispatch settings.
    settings: ServerSettings,
    /// Shared handler state.
    state: Arc<ServerState>,
}

/// Shared state for route handlers.
struct ServerState {
    /// Data-provider hook.
    provider: Arc<dyn DataProviderCallback>,
    /// Data-consumer body handler.
    consumer: Arc<dyn InboundBodyHandler>,
    /// Signature enforcement on the data-provider route.
    signature: SignatureCheck,
    /// Data-consumer route, recorded in audit events.
    dc_route: String,
    /// Audit sink for exchange events.
    audit: Arc<dyn AuditSink>,
}

impl InboundServer {
    /// Creates a server with the given callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the data-consumer route does not
    /// start with `/` or collides with the data-provider route.
    pub fn new(
        settings: ServerSettings,
        provider: Arc<dyn DataProviderCallback>,
        consumer: Arc<dyn InboundBodyHandler>,
    ) -> Result<Self, ServerError> {
        if !settings.dc_route.starts_with('/') || settings.dc_route == TO_DP_ROUTE {
            return Err(ServerError::Config(format!(
                "data-consumer route {} must start with '/' and differ from {TO_DP_ROUTE}",
                settings.dc_route
            )));
        }
        let state = Arc::new(ServerState {
            provider,
            consumer,
            signature: settings.signature.clone(),
            dc_route: settings.dc_route.clone(),
            audit: Arc::new(NoopAuditSink),
        });
        Ok(Self {
            settings,
            state,
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Arc<dyn AuditSink>) -> Self {
        let state = Arc::new(ServerState {
            provider: Arc::clone(&self.state.provider),
            consumer: Arc::clone(&self.state.consumer),
            signature: self.state.signature.clone(),
            dc_route: self.state.dc_route.clone(),
            audit,
        });
        Self {
            settings: self.settings,
            state,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Builds the axum router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(TO_DP_ROUTE, post(handle_to_dp))
            .route(&self.settings.dc_route, post(handle_to_dc))
            .layer(DefaultBodyLimit::max(self.settings.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.settings.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /to-dp`.
async fn handle_to_dp(State(state): State<Arc<ServerState>>, body: Bytes) -> StatusCode {
    let outcome = run_blocking(|| dispatch_request(&state, &body));
    finish(&state, TO_DP_ROUTE, body.len(), &outcome)
}

/// Handles `POST {dc_route}`.
async fn handle_to_dc(State(state): State<Arc<ServerState>>, body: Bytes) -> StatusCode {
    let outcome = run_blocking(|| state.consumer.handle(&body));
    finish(&state, &state.dc_route, body.len(), &outcome)
}

/// Parses a request container and invokes the data-provider hook.
fn dispatch_request(state: &ServerState, body: &[u8]) -> InboundOutcome {
    let reader = match SignedContainerReader::open(body) {
        Ok(reader) => reader,
        Err(err) => return InboundOutcome::Rejected(err.to_string()),
    };
    if let Err(message) = state.signature.enforce(&reader) {
        return InboundOutcome::Rejected(message);
    }
    let request = match parse_request_reader(&reader) {
        Ok(Some(request)) => request,
        Ok(None) => return InboundOutcome::Rejected("container carries no request".to_string()),
        Err(err) => return InboundOutcome::Rejected(err.to_string()),
    };
    let request_id = Some(request.request_id.as_str().to_string());
    match state.provider.on_request(request) {
        Ok(()) => InboundOutcome::Accepted {
            request_id,
        },
        Err(err) => InboundOutcome::Failed(err.to_string()),
    }
}

/// Maps an outcome to a status and records the exchange.
fn finish(
    state: &ServerState,
    route: &str,
    body_bytes: usize,
    outcome: &InboundOutcome,
) -> StatusCode {
    let (status, exchange, request_id, error_kind, message) = match outcome {
        InboundOutcome::Accepted {
            request_id,
        } => (StatusCode::NO_CONTENT, ExchangeOutcome::Ok, request_id.clone(), None, None),
        InboundOutcome::Rejected(message) => (
            StatusCode::BAD_REQUEST,
            ExchangeOutcome::Rejected,
            None,
            Some("malformed"),
            Some(message.clone()),
        ),
        InboundOutcome::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeOutcome::Error,
            None,
            Some("callback"),
            Some(message.clone()),
        ),
    };
    state.audit.record(&ExchangeEvent::new(ExchangeEventParams {
        direction: ExchangeDirection::Inbound,
        endpoint: route.to_string(),
        request_id,
        outcome: exchange,
        status: Some(status.as_u16()),
        error_kind,
        message,
        body_bytes,
    }));
    status
}

/// Runs blocking application code, shifting off the async worker when the
/// runtime allows it.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Inbound server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
