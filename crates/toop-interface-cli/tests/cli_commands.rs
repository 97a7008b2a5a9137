// crates/toop-interface-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end runs of the toop-interface binary.
// Purpose: Ensure keystore, send, and inspect commands compose.
// Dependencies: toop-interface-cli binary, tiny_http, tempfile, serde_json
// ============================================================================
//! ## Overview
//! Generates a keystore with the binary, sends a request through it to a
//! fake connector, and inspects the captured container.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::thread;

use tiny_http::Response;
use tiny_http::Server;
use toop_interface_core::DataRequestSubject;
use toop_interface_core::ParticipantId;
use toop_interface_core::RequestParams;
use toop_interface_core::ToopRequest;
use toop_interface_core::core::xml::to_xml_bytes;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn toop_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_toop-interface"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(toop_bin())
        .current_dir(dir)
        .env_remove("TOOP_INTERFACE_PROPERTIES_PATH")
        .args(args)
        .output()
        .expect("run toop-interface")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn generate_keystore(dir: &Path) -> String {
    let output = run(
        dir,
        &[
            "keystore",
            "generate",
            "--output",
            "keystore.toml",
            "--alias",
            "signer",
            "--store-password",
            "store-pass",
            "--key-password",
            "key-pass",
        ],
    );
    assert!(output.status.success(), "{output:?}");
    stdout(&output)
}

fn write_request(dir: &Path) -> ToopRequest {
    let request = ToopRequest::from_params(RequestParams {
        subject: DataRequestSubject::legal_entity("AT/FN123456a"),
        dc_country_code: "SE".into(),
        dp_country_code: "AT".into(),
        sender_participant_id: ParticipantId::new("9914:tc-ng-test-sender"),
        document_type_id: "urn:doc".into(),
        process_id: "urn:process".into(),
        concepts: None,
    })
    .unwrap();
    fs::write(dir.join("request.xml"), to_xml_bytes("TOOPRequest", &request).unwrap()).unwrap();
    request
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn send_request_then_inspect_captured_container() {
    let dir = tempfile::tempdir().unwrap();
    let public_key = generate_keystore(dir.path());
    let request = write_request(dir.path());

    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut incoming = server.recv().unwrap();
        let mut body = Vec::new();
        incoming.as_reader().read_to_end(&mut body).unwrap();
        incoming.respond(Response::empty(204)).unwrap();
        body
    });
    fs::write(
        dir.path().join("toop-interface.properties"),
        format!(
            "toop.connector.dc.url=http://{addr}/from-dc\n\
             toop.keystore.path=keystore.toml\n\
             toop.keystore.password=store-pass\n\
             toop.keystore.key.password=key-pass\n\
             toop.interface.audit.path=audit.log\n"
        ),
    )
    .unwrap();

    let output = run(dir.path(), &["send-request", "--input", "request.xml"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), format!("sent request {}", request.request_id));

    let body = handle.join().unwrap();
    fs::write(dir.path().join("captured.tar"), body).unwrap();
    let output = run(
        dir.path(),
        &["container", "inspect", "--input", "captured.tar", "--trusted-key", &public_key],
    );
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verification"]["status"], "pass");
    assert_eq!(report["entries"][0]["name"], "TOOPRequest");

    let audit = fs::read_to_string(dir.path().join("audit.log")).unwrap();
    assert!(audit.contains("\"toop_exchange\""), "{audit}");
}

#[test]
fn inspect_with_wrong_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    generate_keystore(dir.path());
    let other_key = {
        let other = tempfile::tempdir().unwrap();
        generate_keystore(other.path())
    };
    let request = write_request(dir.path());
    fs::write(
        dir.path().join("toop-interface.properties"),
        "toop.keystore.path=keystore.toml\n\
         toop.keystore.password=store-pass\n\
         toop.keystore.key.password=key-pass\n",
    )
    .unwrap();

    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut incoming = server.recv().unwrap();
        let mut body = Vec::new();
        incoming.as_reader().read_to_end(&mut body).unwrap();
        incoming.respond(Response::empty(200)).unwrap();
        body
    });
    let target = format!("http://{addr}/to-dp");
    let output =
        run(dir.path(), &["send-request", "--input", "request.xml", "--to", &target, "--legacy"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).ends_with(request.request_id.as_str()));

    fs::write(dir.path().join("captured.tar"), handle.join().unwrap()).unwrap();
    let output = run(
        dir.path(),
        &["container", "inspect", "--input", "captured.tar", "--trusted-key", &other_key],
    );
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verification"]["status"], "fail");
    assert_eq!(report["slots"][0], "TOOPDataRequest");
}

#[test]
fn missing_input_file_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["send-request", "--input", "absent.xml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.xml"), "{stderr}");
}
