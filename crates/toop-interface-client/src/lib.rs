// crates/toop-interface-client/src/lib.rs
// ============================================================================
// Module: TOOP Interface Client Library
// Description: Outbound delivery of signed messages to a TOOP connector.
// Purpose: Send requests/responses and query the data-provider search service.
// Dependencies: toop-interface-core, toop-interface-config, reqwest, url
// ============================================================================

//! ## Overview
//! [`ToopInterfaceClient`] signs envelopes with the configured keystore key and
//! POSTs the container bytes to the connector. It also performs the
//! unauthenticated data-provider search.
//! Invariants:
//! - Calls are blocking and share no mutable state; the client is `Send + Sync`.
//! - No retries are attempted; failures surface to the caller.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ClientError;
pub use client::MAX_SEARCH_RESPONSE_BYTES;
pub use client::ToopInterfaceClient;
