// crates/toop-interface-core/src/interfaces/mod.rs
// ============================================================================
// Module: TOOP Interface Capabilities
// Description: Backend-agnostic seams shared by the client, server, and CLI.
// Purpose: Define the build-and-sign capability behind one interface.
// Dependencies: crate::{core, runtime}, ed25519-dalek
// ============================================================================

//! ## Overview
//! [`SignedMessageBuilder`] is the single capability for turning an envelope
//! into signed container bytes. Implementations differ only in container
//! layout; callers pick one at construction time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::SigningKey;

use crate::core::message::ToopRequest;
use crate::core::message::ToopResponse;
use crate::runtime::exchange::MessageError;

// ============================================================================
// SECTION: Signed Message Builder
// ============================================================================

/// Build-and-sign capability for request and response envelopes.
pub trait SignedMessageBuilder: Send + Sync {
    /// Returns a short label for logs.
    fn name(&self) -> &'static str;

    /// Validates and signs a request into container bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Protocol`] for known protocol violations and
    /// other [`MessageError`] variants when serialization or writing fails.
    fn build_request(&self, request: &ToopRequest, key: &SigningKey)
    -> Result<Vec<u8>, MessageError>;

    /// Validates and signs a response into container bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Protocol`] for known protocol violations and
    /// other [`MessageError`] variants when serialization or writing fails.
    fn build_response(
        &self,
        response: &ToopResponse,
        key: &SigningKey,
    ) -> Result<Vec<u8>, MessageError>;
}
