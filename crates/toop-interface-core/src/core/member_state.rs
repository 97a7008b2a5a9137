// crates/toop-interface-core/src/core/member_state.rs
// ============================================================================
// Module: Member-State Payloads
// Description: MS-level data request and response documents.
// Purpose: Payloads carried in the MSDataRequest and MSDataResponse slots.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Member-state documents are what a national system exchanges with its own
//! connector before the request is lifted into the cross-border envelope. They
//! only travel inside the legacy message bundle.

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DocumentTypeId;

/// Member-state level data request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsDataRequest {
    /// National identifier of the subject.
    pub identifier: String,
    /// Requested document type, when known at this stage.
    #[serde(rename = "DocumentTypeID", default, skip_serializing_if = "Option::is_none")]
    pub document_type_id: Option<DocumentTypeId>,
}

impl MsDataRequest {
    /// Creates a request for a subject identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            document_type_id: None,
        }
    }
}

/// Member-state level data response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsDataResponse {
    /// Subject identifier the data belongs to.
    pub identifier: String,
    /// Opaque response data.
    pub data: String,
}

impl MsDataResponse {
    /// Creates a response carrying `data` for a subject identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            data: data.into(),
        }
    }
}
