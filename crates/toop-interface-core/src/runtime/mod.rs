// crates/toop-interface-core/src/runtime/mod.rs
// ============================================================================
// Module: TOOP Interface Runtime
// Description: Signed containers, keystores, bundles, and message builders.
// Purpose: Provide the operations that produce and consume transport bytes.
// Dependencies: crate::core, ed25519-dalek, tar
// ============================================================================

//! ## Overview
//! Runtime modules turn core types into signed container bytes and back.

pub mod bundle;
pub mod container;
pub mod exchange;
pub mod keystore;

pub use bundle::BundleError;
pub use bundle::BundleSlot;
pub use bundle::MessageBundle;
pub use bundle::MessageBundleBuilder;
pub use container::ContainerEntry;
pub use container::ContainerError;
pub use container::SignedContainerReader;
pub use container::SignedContainerWriter;
pub use exchange::BundleMessageBuilder;
pub use exchange::EnvelopeMessageBuilder;
pub use exchange::MessageError;
pub use exchange::parse_request_container;
pub use exchange::parse_request_reader;
pub use exchange::parse_response_container;
pub use exchange::parse_response_reader;
pub use keystore::KeyMaterial;
pub use keystore::Keystore;
pub use keystore::KeystoreError;
