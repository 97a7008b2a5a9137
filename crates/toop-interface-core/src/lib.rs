// crates/toop-interface-core/src/lib.rs
// ============================================================================
// Module: TOOP Interface Core Library
// Description: Public API surface for the TOOP interface core.
// Purpose: Expose message types, signed containers, and bundle helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! TOOP interface core defines the request/response envelopes exchanged with a
//! TOOP connector, the signed container format that carries them, and the
//! legacy four-slot message bundle. It performs no network I/O; the client and
//! server crates build on it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::SignedMessageBuilder;
pub use runtime::BundleError;
pub use runtime::BundleMessageBuilder;
pub use runtime::BundleSlot;
pub use runtime::ContainerEntry;
pub use runtime::ContainerError;
pub use runtime::EnvelopeMessageBuilder;
pub use runtime::KeyMaterial;
pub use runtime::Keystore;
pub use runtime::KeystoreError;
pub use runtime::MessageBundle;
pub use runtime::MessageBundleBuilder;
pub use runtime::MessageError;
pub use runtime::SignedContainerReader;
pub use runtime::SignedContainerWriter;
pub use runtime::parse_request_container;
pub use runtime::parse_request_reader;
pub use runtime::parse_response_container;
pub use runtime::parse_response_reader;
