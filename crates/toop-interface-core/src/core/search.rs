// crates/toop-interface-core/src/core/search.rs
// ============================================================================
// Module: Data Provider Search Results
// Description: XML result list returned by the connector search service.
// Purpose: Typed view of `/search-dp` responses.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The connector's search service answers `GET /search-dp/{country}[/{doctype}]`
//! with a `resultlist` document. Each match names one registered participant,
//! the business entities behind it, and the document types it serves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CountryCode;
use crate::core::identifiers::ParticipantId;

/// Root element name of a search result document.
pub const RESULT_LIST_ROOT: &str = "resultlist";

// ============================================================================
// SECTION: Result Types
// ============================================================================

/// Search result list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultList {
    /// Result format version.
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Total number of matches known to the service.
    #[serde(rename = "@total-result-count", default, skip_serializing_if = "Option::is_none")]
    pub total_result_count: Option<u64>,
    /// Matches in this page.
    #[serde(rename = "match", default)]
    pub matches: Vec<ResultMatch>,
}

impl ResultList {
    /// Returns true when the list holds no matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// One registered data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMatch {
    /// Participant identifier of the provider.
    #[serde(rename = "participantID")]
    pub participant_id: ParticipantId,
    /// Document types the provider serves.
    #[serde(rename = "docTypeID", default)]
    pub document_types: Vec<DocumentTypeRef>,
    /// Business entities behind the participant.
    #[serde(rename = "entity", default)]
    pub entities: Vec<ResultEntity>,
}

/// Scheme-qualified document type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeRef {
    /// Identifier scheme.
    #[serde(rename = "@scheme")]
    pub scheme: String,
    /// Identifier value.
    #[serde(rename = "$text")]
    pub value: String,
}

/// Business entity registered for a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntity {
    /// Entity name.
    pub name: String,
    /// Entity country.
    #[serde(rename = "countryCode")]
    pub country_code: CountryCode,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
