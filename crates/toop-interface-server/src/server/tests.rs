// crates/toop-interface-server/src/server/tests.rs
// ============================================================================
// Module: Inbound Server Unit Tests
// Description: Route handler status mapping and callback invocation.
// Purpose: Validate inbound dispatch with in-memory callbacks.
// Dependencies: toop-interface-server
// ============================================================================

//! ## Overview
//! Calls the route handlers directly with in-memory bodies and recording
//! callbacks.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::SigningKey;
use toop_interface_config::InterfaceConfig;
use toop_interface_core::AuditSink;
use toop_interface_core::BundleMessageBuilder;
use toop_interface_core::DataRequestSubject;
use toop_interface_core::EnvelopeMessageBuilder;
use toop_interface_core::ExchangeEvent;
use toop_interface_core::ExchangeOutcome;
use toop_interface_core::MessageBundleBuilder;
use toop_interface_core::MsDataRequest;
use toop_interface_core::ParticipantId;
use toop_interface_core::RequestParams;
use toop_interface_core::SignedMessageBuilder;
use toop_interface_core::ToopRequest;

use super::InboundServer;
use super::ServerSettings;
use super::ServerState;
use super::TO_DP_ROUTE;
use super::handle_to_dc;
use super::handle_to_dp;
use crate::callback::CallbackError;
use crate::callback::DataProviderCallback;
use crate::callback::InboundBodyHandler;
use crate::callback::InboundOutcome;
use crate::callback::SignatureCheck;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
    received: Mutex<Vec<ToopRequest>>,
    fail: bool,
}

impl DataProviderCallback for CountingProvider {
    fn on_request(&self, request: ToopRequest) -> Result<(), CallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(request);
        if self.fail { Err(CallbackError::new("storage unavailable")) } else { Ok(()) }
    }
}

struct EchoHandler {
    outcome: InboundOutcome,
    bodies: Mutex<Vec<Vec<u8>>>,
}

impl InboundBodyHandler for EchoHandler {
    fn handle(&self, body: &[u8]) -> InboundOutcome {
        self.bodies.lock().unwrap().push(body.to_vec());
        self.outcome.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ExchangeEvent>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &ExchangeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn settings(signature: SignatureCheck) -> ServerSettings {
    ServerSettings {
        bind: "127.0.0.1:0".parse().unwrap(),
        dc_route: "/to-dc".to_string(),
        max_body_bytes: 1024 * 1024,
        signature,
    }
}

fn state(
    provider: Arc<CountingProvider>,
    signature: SignatureCheck,
    audit: Arc<RecordingSink>,
) -> Arc<ServerState> {
    state_with_settings(settings(signature), provider, audit)
}

fn state_with_settings(
    settings: ServerSettings,
    provider: Arc<CountingProvider>,
    audit: Arc<RecordingSink>,
) -> Arc<ServerState> {
    let consumer = Arc::new(EchoHandler {
        outcome: InboundOutcome::Accepted {
            request_id: None,
        },
        bodies: Mutex::new(Vec::new()),
    });
    let server = InboundServer::new(settings, provider, consumer).unwrap().with_audit(audit);
    Arc::clone(&server.state)
}

fn request() -> ToopRequest {
    ToopRequest::from_params(RequestParams {
        subject: DataRequestSubject::natural_person("SE/AT/199001011234"),
        dc_country_code: "SE".into(),
        dp_country_code: "AT".into(),
        sender_participant_id: ParticipantId::new("9914:tc-ng-test-sender"),
        document_type_id: "urn:doc".into(),
        process_id: "urn:process".into(),
        concepts: None,
    })
    .unwrap()
}

fn key() -> SigningKey {
    SigningKey::from_bytes(&[3u8; 32])
}

// ============================================================================
// SECTION: Data-Provider Route
// ============================================================================

#[tokio::test]
async fn garbage_body_is_rejected_without_callback() {
    let provider = Arc::new(CountingProvider::default());
    let audit = Arc::new(RecordingSink::default());
    let state = state(provider.clone(), SignatureCheck::Disabled, audit.clone());

    let status = handle_to_dp(State(state), Bytes::from_static(b"not a container")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let events = audit.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, ExchangeOutcome::Rejected);
    assert_eq!(events[0].endpoint, TO_DP_ROUTE);
}

#[tokio::test]
async fn container_without_request_is_rejected() {
    let provider = Arc::new(CountingProvider::default());
    let state = state(provider.clone(), SignatureCheck::Disabled, Arc::default());
    let mut bytes = Vec::new();
    MessageBundleBuilder::new()
        .ms_data_request(MsDataRequest::new("ms-1"))
        .sign_with_key(&mut bytes, &key())
        .unwrap();

    let status = handle_to_dp(State(state), Bytes::from(bytes)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_request_invokes_callback_once() {
    let provider = Arc::new(CountingProvider::default());
    let audit = Arc::new(RecordingSink::default());
    let state = state(provider.clone(), SignatureCheck::AnySigner, audit.clone());
    let request = request();
    let bytes = EnvelopeMessageBuilder.build_request(&request, &key()).unwrap();

    let status = handle_to_dp(State(state), Bytes::from(bytes)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*provider.received.lock().unwrap(), vec![request.clone()]);

    let events = audit.events.lock().unwrap();
    assert_eq!(events[0].outcome, ExchangeOutcome::Ok);
    assert_eq!(events[0].request_id.as_deref(), Some(request.request_id.as_str()));
}

#[tokio::test]
async fn legacy_bundle_request_is_accepted() {
    let provider = Arc::new(CountingProvider::default());
    let state = state(provider.clone(), SignatureCheck::Disabled, Arc::default());
    let bytes = BundleMessageBuilder.build_request(&request(), &key()).unwrap();

    let status = handle_to_dp(State(state), Bytes::from(bytes)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn callback_failure_is_server_error() {
    let provider = Arc::new(CountingProvider {
        fail: true,
        ..CountingProvider::default()
    });
    let audit = Arc::new(RecordingSink::default());
    let state = state(provider.clone(), SignatureCheck::Disabled, audit.clone());
    let bytes = EnvelopeMessageBuilder.build_request(&request(), &key()).unwrap();

    let status = handle_to_dp(State(state), Bytes::from(bytes)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(audit.events.lock().unwrap()[0].outcome, ExchangeOutcome::Error);
}

#[tokio::test]
async fn untrusted_signer_is_rejected_when_enforced() {
    let provider = Arc::new(CountingProvider::default());
    let trusted = SigningKey::from_bytes(&[5u8; 32]).verifying_key();
    let state = state(provider.clone(), SignatureCheck::Trusted(vec![trusted]), Arc::default());
    let bytes = EnvelopeMessageBuilder.build_request(&request(), &key()).unwrap();

    let status = handle_to_dp(State(state), Bytes::from(bytes)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn configured_trusted_key_rejects_foreign_signer() {
    let trusted = SigningKey::from_bytes(&[5u8; 32]);
    let config = InterfaceConfig::from_pairs([
        ("toop.interface.verify.signature", "true".to_string()),
        ("toop.interface.trusted.keys", BASE64.encode(trusted.verifying_key().as_bytes())),
    ]);
    let settings = ServerSettings::from_config(&config).unwrap();
    let provider = Arc::new(CountingProvider::default());
    let state = state_with_settings(settings, provider.clone(), Arc::default());

    let forged = EnvelopeMessageBuilder.build_request(&request(), &key()).unwrap();
    let status = handle_to_dp(State(Arc::clone(&state)), Bytes::from(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let genuine = EnvelopeMessageBuilder.build_request(&request(), &trusted).unwrap();
    let status = handle_to_dp(State(state), Bytes::from(genuine)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Data-Consumer Route
// ============================================================================

#[tokio::test]
async fn consumer_route_delegates_raw_body() {
    let handler = Arc::new(EchoHandler {
        outcome: InboundOutcome::Failed("downstream".to_string()),
        bodies: Mutex::new(Vec::new()),
    });
    let server = InboundServer::new(
        settings(SignatureCheck::Disabled),
        Arc::new(CountingProvider::default()),
        handler.clone(),
    )
    .unwrap();

    let status =
        handle_to_dc(State(Arc::clone(&server.state)), Bytes::from_static(b"opaque")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(*handler.bodies.lock().unwrap(), vec![b"opaque".to_vec()]);
}

#[test]
fn colliding_consumer_route_is_refused() {
    let mut settings = settings(SignatureCheck::Disabled);
    settings.dc_route = TO_DP_ROUTE.to_string();
    let handler = Arc::new(EchoHandler {
        outcome: InboundOutcome::Rejected("unused".to_string()),
        bodies: Mutex::new(Vec::new()),
    });
    let result = InboundServer::new(settings, Arc::new(CountingProvider::default()), handler);
    assert!(result.is_err());
}

#[test]
fn settings_follow_configuration() {
    let config = InterfaceConfig::from_pairs([
        ("toop.interface.bind", "0.0.0.0:9000"),
        ("toop.interface.dc.route", "/inbound"),
        ("toop.interface.verify.signature", "true"),
    ]);
    let settings = ServerSettings::from_config(&config).unwrap();
    assert_eq!(settings.bind.port(), 9000);
    assert_eq!(settings.dc_route, "/inbound");
    assert_eq!(settings.signature, SignatureCheck::AnySigner);
}

#[test]
fn trusted_keys_pin_signers_and_must_decode() {
    let first = SigningKey::from_bytes(&[5u8; 32]).verifying_key();
    let second = SigningKey::from_bytes(&[6u8; 32]).verifying_key();
    let listed = format!(
        "{}, {}",
        BASE64.encode(first.as_bytes()),
        BASE64.encode(second.as_bytes())
    );
    let config = InterfaceConfig::from_pairs([("toop.interface.trusted.keys", listed)]);
    let settings = ServerSettings::from_config(&config).unwrap();
    assert_eq!(settings.signature, SignatureCheck::Trusted(vec![first, second]));

    let config = InterfaceConfig::from_pairs([("toop.interface.trusted.keys", "AAAA")]);
    assert!(ServerSettings::from_config(&config).is_err());
}
