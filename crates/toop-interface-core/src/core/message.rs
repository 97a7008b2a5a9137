// crates/toop-interface-core/src/core/message.rs
// ============================================================================
// Module: TOOP Interface Messages
// Description: Request and response envelopes exchanged with the connector.
// Purpose: Define the XML message model and its protocol-level validation.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ToopRequest`] asks a data provider in another country for a set of
//! concepts about one subject. A [`ToopResponse`] echoes the request and carries
//! concept values and/or structured errors. Both are marshalled as XML and
//! wrapped into a signed container for transport.
//! Invariants:
//! - [`ToopRequest::validate`] is the single place known protocol errors are
//!   raised for outbound messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CountryCode;
use crate::core::identifiers::DocumentTypeId;
use crate::core::identifiers::ParticipantId;
use crate::core::identifiers::ProcessId;
use crate::core::identifiers::RequestId;

// ============================================================================
// SECTION: Protocol Errors
// ============================================================================

/// Known protocol error kinds.
///
/// # Invariants
/// - Labels returned by [`ErrorCode::as_str`] are stable for logs and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A mandatory message element is missing or empty.
    MissingElement,
    /// A country code is not an ISO 3166-1 alpha-2 code.
    InvalidCountryCode,
    /// A participant identifier is malformed.
    InvalidParticipantId,
    /// The signed container could not be built from the message.
    ContainerBuildFailed,
    /// The data-provider search service failed.
    SearchFailed,
}

impl ErrorCode {
    /// Returns a stable label for the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingElement => "missing_element",
            Self::InvalidCountryCode => "invalid_country_code",
            Self::InvalidParticipantId => "invalid_participant_id",
            Self::ContainerBuildFailed => "container_build_failed",
            Self::SearchFailed => "search_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known protocol failure with a machine-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("protocol error [{code}]: {message}")]
pub struct ProtocolError {
    /// Machine-readable reason.
    pub code: ErrorCode,
    /// HTTP status reported by a peer, when the failure came from one.
    pub http_status: Option<u16>,
    /// Human-readable detail.
    pub message: String,
}

impl ProtocolError {
    /// Creates a protocol error without an HTTP status.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status: None,
            message: message.into(),
        }
    }

    /// Creates a protocol error carrying a peer HTTP status.
    #[must_use]
    pub fn with_status(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status: Some(status),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Subject and Concepts
// ============================================================================

/// Kind of subject a data request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SubjectType {
    /// A natural person.
    NaturalPerson,
    /// A legal entity (company, organisation).
    LegalEntity,
}

impl SubjectType {
    /// Returns the wire label for the subject type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NaturalPerson => "NaturalPerson",
            Self::LegalEntity => "LegalEntity",
        }
    }
}

impl From<SubjectType> for String {
    fn from(value: SubjectType) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for SubjectType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "NaturalPerson" => Ok(Self::NaturalPerson),
            "LegalEntity" => Ok(Self::LegalEntity),
            other => Err(format!("unknown subject type: {other}")),
        }
    }
}

/// Subject the data request is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRequestSubject {
    /// Subject kind.
    pub subject_type: SubjectType,
    /// National identifier of the subject.
    pub identifier: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DataRequestSubject {
    /// Creates a natural-person subject.
    #[must_use]
    pub fn natural_person(identifier: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::NaturalPerson,
            identifier: identifier.into(),
            name: None,
        }
    }

    /// Creates a legal-entity subject.
    #[must_use]
    pub fn legal_entity(identifier: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::LegalEntity,
            identifier: identifier.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Structured concept query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConceptQuery {
    /// Concept namespace URI.
    pub namespace: String,
    /// Concept name within the namespace.
    pub name: String,
}

impl ConceptQuery {
    /// Creates a concept query.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Concept value returned by a data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConceptValue {
    /// Concept namespace URI.
    pub namespace: String,
    /// Concept name within the namespace.
    pub name: String,
    /// Value, absent when the provider has no data for the concept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Structured error reported in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseError {
    /// Component that raised the error.
    pub origin: String,
    /// Error category.
    pub category: String,
    /// Error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Data request sent from a data consumer to a data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToopRequest {
    /// Request identifier.
    #[serde(rename = "RequestID")]
    pub request_id: RequestId,
    /// Country of the requesting data consumer.
    #[serde(rename = "DataConsumerCountryCode")]
    pub dc_country_code: CountryCode,
    /// Country of the responding data provider.
    #[serde(rename = "DataProviderCountryCode")]
    pub dp_country_code: CountryCode,
    /// Participant identifier of the sender.
    #[serde(rename = "SenderParticipantID")]
    pub sender_participant_id: ParticipantId,
    /// Requested document type.
    #[serde(rename = "DocumentTypeID")]
    pub document_type_id: DocumentTypeId,
    /// Process the exchange runs under.
    #[serde(rename = "ProcessID")]
    pub process_id: ProcessId,
    /// Subject the request is about.
    pub data_request_subject: DataRequestSubject,
    /// Concepts to query.
    #[serde(rename = "Concept", default)]
    pub concepts: Vec<ConceptQuery>,
}

/// Inputs for building a request with a generated identifier.
#[derive(Debug, Clone)]
pub struct RequestParams {
    /// Subject the request is about.
    pub subject: DataRequestSubject,
    /// Country of the requesting data consumer.
    pub dc_country_code: CountryCode,
    /// Country of the responding data provider.
    pub dp_country_code: CountryCode,
    /// Participant identifier of the sender.
    pub sender_participant_id: ParticipantId,
    /// Requested document type.
    pub document_type_id: DocumentTypeId,
    /// Process the exchange runs under.
    pub process_id: ProcessId,
    /// Concepts to query; `None` requests the whole document.
    pub concepts: Option<Vec<ConceptQuery>>,
}

impl ToopRequest {
    /// Builds a request with a fresh identifier and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the parameters violate the protocol.
    pub fn from_params(params: RequestParams) -> Result<Self, ProtocolError> {
        let request = Self {
            request_id: RequestId::generate(),
            dc_country_code: params.dc_country_code,
            dp_country_code: params.dp_country_code,
            sender_participant_id: params.sender_participant_id,
            document_type_id: params.document_type_id,
            process_id: params.process_id,
            data_request_subject: params.subject,
            concepts: params.concepts.unwrap_or_default(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks the request against the protocol rules.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        require_non_empty("RequestID", self.request_id.as_str())?;
        require_country("DataConsumerCountryCode", &self.dc_country_code)?;
        require_country("DataProviderCountryCode", &self.dp_country_code)?;
        if self.sender_participant_id.scheme.trim().is_empty()
            || self.sender_participant_id.value.trim().is_empty()
        {
            return Err(ProtocolError::new(
                ErrorCode::InvalidParticipantId,
                "SenderParticipantID requires scheme and value",
            ));
        }
        require_non_empty("DocumentTypeID", self.document_type_id.as_str())?;
        require_non_empty("ProcessID", self.process_id.as_str())?;
        require_non_empty("DataRequestSubject/Identifier", &self.data_request_subject.identifier)?;
        for concept in &self.concepts {
            require_non_empty("Concept/Name", &concept.name)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Data response sent from a data provider back to the data consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToopResponse {
    /// The request this response answers.
    pub request: ToopRequest,
    /// Returned concept values.
    #[serde(rename = "ConceptValue", default)]
    pub values: Vec<ConceptValue>,
    /// Errors raised while answering.
    #[serde(rename = "Error", default)]
    pub errors: Vec<ResponseError>,
}

impl ToopResponse {
    /// Creates an empty response for a request.
    #[must_use]
    pub fn for_request(request: ToopRequest) -> Self {
        Self {
            request,
            values: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Appends a concept value.
    #[must_use]
    pub fn with_value(mut self, value: ConceptValue) -> Self {
        self.values.push(value);
        self
    }

    /// Appends an error.
    #[must_use]
    pub fn with_error(mut self, error: ResponseError) -> Self {
        self.errors.push(error);
        self
    }

    /// Returns true when the response carries at least one error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Checks the echoed request against the protocol rules.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.request.validate()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails when a mandatory element is empty.
fn require_non_empty(element: &str, value: &str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::new(ErrorCode::MissingElement, format!("{element} is empty")));
    }
    Ok(())
}

/// Fails when a country code is malformed.
fn require_country(element: &str, code: &CountryCode) -> Result<(), ProtocolError> {
    if !code.is_valid() {
        return Err(ProtocolError::new(
            ErrorCode::InvalidCountryCode,
            format!("{element} '{code}' is not an ISO 3166-1 alpha-2 code"),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
