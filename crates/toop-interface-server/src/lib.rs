// crates/toop-interface-server/src/lib.rs
// ============================================================================
// Module: TOOP Interface Server Library
// Description: Inbound endpoints for signed containers from the TOOP connector.
// Purpose: Route inbound requests and responses to application callbacks.
// Dependencies: toop-interface-core, toop-interface-config, axum, tokio
// ============================================================================

//! ## Overview
//! [`InboundServer`] exposes the data-provider route (`/to-dp`) and a
//! configurable data-consumer route. Applications plug in through
//! [`DataProviderCallback`] and [`InboundBodyHandler`].
//! Security posture: inbound bodies are untrusted; signature enforcement is
//! opt-in through `toop.interface.verify.signature`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod callback;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use callback::CallbackError;
pub use callback::DataConsumerCallback;
pub use callback::DataProviderCallback;
pub use callback::InboundBodyHandler;
pub use callback::InboundOutcome;
pub use callback::ResponseContainerHandler;
pub use callback::SignatureCheck;
pub use server::InboundServer;
pub use server::ServerError;
pub use server::ServerSettings;
pub use server::TO_DP_ROUTE;
