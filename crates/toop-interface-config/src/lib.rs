// crates/toop-interface-config/src/lib.rs
// ============================================================================
// Module: TOOP Interface Config Library
// Description: Configuration snapshots and the reloadable provider.
// Purpose: Single source of truth for toop-interface.properties semantics.
// Dependencies: toop-interface-core, java-properties
// ============================================================================

//! ## Overview
//! `toop-interface-config` resolves the properties file to load, parses it into
//! an immutable [`InterfaceConfig`] snapshot, and hands snapshots out through a
//! [`ConfigProvider`] that can be reloaded at runtime.
//!
//! A missing configuration is not fatal: lookups fall back to defaults.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod provider;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use provider::ConfigProvider;
pub use provider::ReloadOutcome;
