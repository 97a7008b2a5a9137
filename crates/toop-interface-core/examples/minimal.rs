// crates/toop-interface-core/examples/minimal.rs
// ============================================================================
// Module: TOOP Interface Minimal Example
// Description: Build, sign, open, verify, and parse a request container.
// Purpose: Demonstrate the envelope path end to end without networking.
// Dependencies: toop-interface-core
// ============================================================================

//! ## Overview
//! Signs a data request with a throwaway keystore key, then opens the
//! resulting container, verifies it against the signer, and parses the request
//! back out.

use std::io::Write;

use toop_interface_core::ConceptQuery;
use toop_interface_core::DataRequestSubject;
use toop_interface_core::EnvelopeMessageBuilder;
use toop_interface_core::Keystore;
use toop_interface_core::ParticipantId;
use toop_interface_core::RequestParams;
use toop_interface_core::SignedContainerReader;
use toop_interface_core::SignedMessageBuilder;
use toop_interface_core::ToopRequest;
use toop_interface_core::parse_request_reader;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut keystore = Keystore::new("changeit")?;
    let verifying_key = keystore.generate_key("dc", "changeit")?;
    let key = keystore.signing_key(Some("dc"), "changeit")?;

    let request = ToopRequest::from_params(RequestParams {
        subject: DataRequestSubject::legal_entity("SE/5591674170"),
        dc_country_code: "SE".into(),
        dp_country_code: "AT".into(),
        sender_participant_id: ParticipantId::new("9914:tc-ng-test-sender"),
        document_type_id: "urn:eu:toop:ns:dataexchange-1p40::Request".into(),
        process_id: "urn:eu.toop.process.datarequestresponse".into(),
        concepts: Some(vec![ConceptQuery::new(
            "http://toop.eu/registered-organization",
            "CompanyName",
        )]),
    })?;

    let bytes = EnvelopeMessageBuilder.build_request(&request, &key)?;
    let reader = SignedContainerReader::open(bytes.as_slice())?;
    let report = reader.verify(Some(&verifying_key));
    let parsed = parse_request_reader(&reader)?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "container bytes: {}", bytes.len())?;
    writeln!(stdout, "verification: {:?}", report.status)?;
    writeln!(
        stdout,
        "request id: {}",
        parsed.as_ref().map_or("<none>", |request| request.request_id.as_str())
    )?;
    Ok(())
}
