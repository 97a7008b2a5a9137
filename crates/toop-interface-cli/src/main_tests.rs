// crates/toop-interface-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, bounded reads, and spooling.
// Purpose: Ensure CLI helpers fail closed on untrusted input.
// Dependencies: toop-interface-cli main helpers
// ============================================================================

//! ## Overview
//! Validates size-limited reads, spool file naming, key decoding, and
//! container inspection.
//!
//! Security posture: CLI inputs and inbound identifiers are untrusted.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use base64::Engine;
use clap::Parser;
use ed25519_dalek::SigningKey;
use toop_interface_core::DataRequestSubject;
use toop_interface_core::MessageBundleBuilder;
use toop_interface_core::MsDataRequest;
use toop_interface_core::ParticipantId;
use toop_interface_core::RequestParams;
use toop_interface_core::SignedContainerReader;
use toop_interface_core::ToopRequest;
use toop_interface_server::DataProviderCallback;

use super::BASE64;
use super::Cli;
use super::Commands;
use super::ContainerCommand;
use super::ReadLimitError;
use super::SpoolCallback;
use super::inspect;
use super::parse_verifying_key;
use super::read_bytes_with_limit;
use super::read_xml;
use super::spool_file_stem;

// ============================================================================
// SECTION: Helpers
// ============================================================================

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

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.bin");
    fs::write(&path, [0u8; 16]).unwrap();
    match read_bytes_with_limit(&path, 15) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 16);
            assert_eq!(limit, 15);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(read_bytes_with_limit(&path, 16).unwrap().len(), 16);
}

#[test]
fn spool_file_stem_neutralizes_path_characters() {
    assert_eq!(spool_file_stem("../../etc/passwd"), "______etc_passwd");
    assert_eq!(spool_file_stem("abc-123_x"), "abc-123_x");
    assert_eq!(spool_file_stem(""), "unnamed");
    assert_eq!(spool_file_stem(&"a".repeat(100)).len(), 64);
}

#[test]
fn parse_verifying_key_requires_32_bytes() {
    let key = SigningKey::from_bytes(&[1u8; 32]).verifying_key();
    let encoded = BASE64.encode(key.as_bytes());
    assert_eq!(parse_verifying_key(&encoded).unwrap(), key);
    assert!(parse_verifying_key(&BASE64.encode([1u8; 16])).is_err());
    assert!(parse_verifying_key("not base64!").is_err());
}

#[test]
fn spool_callback_writes_request_xml() {
    let dir = tempfile::tempdir().unwrap();
    let spool = SpoolCallback {
        dir: Some(dir.path().to_path_buf()),
    };
    let request = request();
    spool.on_request(request.clone()).unwrap();

    let path = dir.path().join(format!("request-{}.xml", request.request_id));
    let parsed: ToopRequest = read_xml(&path, "request").unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn inspect_reports_slots_and_verification() {
    let key = SigningKey::from_bytes(&[2u8; 32]);
    let mut bytes = Vec::new();
    MessageBundleBuilder::new()
        .ms_data_request(MsDataRequest::new("ms-1"))
        .toop_data_request(request())
        .sign_with_key(&mut bytes, &key)
        .unwrap();
    let reader = SignedContainerReader::open(bytes.as_slice()).unwrap();

    let report = inspect(&reader, Some(&key.verifying_key()));
    assert!(report.verification.is_pass());
    assert_eq!(report.slots, vec!["MSDataRequest", "TOOPDataRequest"]);
    assert_eq!(report.entries.len(), 2);

    let other = SigningKey::from_bytes(&[4u8; 32]).verifying_key();
    assert!(!inspect(&reader, Some(&other)).verification.is_pass());
}

#[test]
fn cli_parses_nested_and_global_arguments() {
    let cli = Cli::try_parse_from([
        "toop-interface",
        "container",
        "inspect",
        "--input",
        "bundle.tar",
        "--config",
        "custom.properties",
    ])
    .unwrap();
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.properties")));
    match cli.command {
        Commands::Container {
            command: ContainerCommand::Inspect(command),
        } => assert_eq!(command.input, std::path::PathBuf::from("bundle.tar")),
        other => panic!("unexpected command: {other:?}"),
    }
    assert!(Cli::try_parse_from(["toop-interface", "search"]).is_err());
}
