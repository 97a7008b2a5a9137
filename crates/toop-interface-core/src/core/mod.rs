// crates/toop-interface-core/src/core/mod.rs
// ============================================================================
// Module: TOOP Interface Core Types
// Description: Message model, identifiers, container metadata, and audit events.
// Purpose: Provide stable, serializable types shared by every interface crate.
// Dependencies: serde, quick-xml, sha2
// ============================================================================

//! ## Overview
//! Core types define the request/response envelopes, the member-state payloads
//! of the legacy bundle, the search result list, and the integrity metadata of
//! signed containers. They are the canonical source of truth for the client,
//! server, and CLI crates.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod container;
pub mod hashing;
pub mod identifiers;
pub mod member_state;
pub mod message;
pub mod search;
pub mod xml;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditLevel;
pub use audit::AuditSink;
pub use audit::ConfigEvent;
pub use audit::ExchangeDirection;
pub use audit::ExchangeEvent;
pub use audit::ExchangeEventParams;
pub use audit::ExchangeOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use container::ContainerManifest;
pub use container::ContainerSignature;
pub use container::EntryRecord;
pub use container::VerificationReport;
pub use container::VerificationStatus;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::CountryCode;
pub use identifiers::DocumentTypeId;
pub use identifiers::ParticipantId;
pub use identifiers::ProcessId;
pub use identifiers::RequestId;
pub use member_state::MsDataRequest;
pub use member_state::MsDataResponse;
pub use message::ConceptQuery;
pub use message::ConceptValue;
pub use message::DataRequestSubject;
pub use message::ErrorCode;
pub use message::ProtocolError;
pub use message::RequestParams;
pub use message::ResponseError;
pub use message::SubjectType;
pub use message::ToopRequest;
pub use message::ToopResponse;
pub use search::ResultList;
pub use search::ResultMatch;
pub use xml::XML_MIME_TYPE;
pub use xml::XmlError;
