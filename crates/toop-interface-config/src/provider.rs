// crates/toop-interface-config/src/provider.rs
// ============================================================================
// Module: Configuration Provider
// Description: Reloadable holder of the current configuration snapshot.
// Purpose: Share one snapshot across components and swap it on reload.
// Dependencies: toop-interface-core (audit), crate::config
// ============================================================================

//! ## Overview
//! [`ConfigProvider`] keeps the current [`InterfaceConfig`] behind a
//! `RwLock<Arc<_>>`. Readers clone the `Arc` under a shared lock and keep a
//! consistent snapshot for as long as they need it; [`ConfigProvider::reload`]
//! builds a new snapshot and swaps it under the exclusive lock.
//! Invariants:
//! - A failed reload leaves an empty snapshot, never a partial one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use toop_interface_core::AuditLevel;
use toop_interface_core::AuditSink;
use toop_interface_core::ConfigEvent;
use toop_interface_core::NoopAuditSink;

use crate::config::ConfigLoader;
use crate::config::InterfaceConfig;
use crate::config::LoadAttempt;
use crate::config::LoadResult;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of a configuration reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A candidate loaded and replaced the snapshot.
    Loaded {
        /// Loaded file.
        source: PathBuf,
        /// Number of keys.
        keys: usize,
    },
    /// No candidate loaded; the snapshot is now empty.
    Failed {
        /// Attempts in priority order.
        attempts: Vec<LoadAttempt>,
    },
    /// The provider holds a fixed snapshot and has no sources to reload.
    Fixed,
}

impl ReloadOutcome {
    /// Returns true unless the reload failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Reloadable configuration provider.
pub struct ConfigProvider {
    /// Source resolver; `None` for fixed snapshots.
    loader: Option<ConfigLoader>,
    /// Current snapshot.
    current: RwLock<Arc<InterfaceConfig>>,
    /// Outcome of the most recent load.
    last_outcome: RwLock<ReloadOutcome>,
    /// Sink for load events.
    audit: Arc<dyn AuditSink>,
}

impl ConfigProvider {
    /// Creates a provider and loads the first available source eagerly.
    #[must_use]
    pub fn new(loader: ConfigLoader) -> Self {
        Self::with_audit(loader, Arc::new(NoopAuditSink))
    }

    /// Creates a provider that reports load outcomes to `audit`.
    #[must_use]
    pub fn with_audit(loader: ConfigLoader, audit: Arc<dyn AuditSink>) -> Self {
        let provider = Self {
            loader: Some(loader),
            current: RwLock::new(Arc::new(InterfaceConfig::empty())),
            last_outcome: RwLock::new(ReloadOutcome::Fixed),
            audit,
        };
        let outcome = provider.swap_snapshot();
        provider.store_outcome(outcome);
        provider
    }

    /// Creates a provider around a fixed snapshot.
    #[must_use]
    pub fn fixed(config: InterfaceConfig) -> Self {
        Self {
            loader: None,
            current: RwLock::new(Arc::new(config)),
            last_outcome: RwLock::new(ReloadOutcome::Fixed),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<InterfaceConfig> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the outcome of the most recent load, including the initial one.
    #[must_use]
    pub fn last_outcome(&self) -> ReloadOutcome {
        self.last_outcome.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Re-resolves the sources and swaps the snapshot.
    pub fn reload(&self) -> ReloadOutcome {
        let outcome = self.swap_snapshot();
        self.store_outcome(outcome.clone());
        outcome
    }

    /// Records the outcome of a load.
    fn store_outcome(&self, outcome: ReloadOutcome) {
        *self.last_outcome.write().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Loads the first available source and swaps it in as the snapshot.
    fn swap_snapshot(&self) -> ReloadOutcome {
        let Some(loader) = &self.loader else {
            return ReloadOutcome::Fixed;
        };
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let LoadResult {
            config,
            attempts,
        } = loader.load();
        let outcome = match config.source() {
            Some(source) => {
                let source = source.to_path_buf();
                self.audit.record_config(&ConfigEvent::new(
                    AuditLevel::Info,
                    Some(source.display().to_string()),
                    config.len(),
                    "configuration loaded".to_string(),
                ));
                ReloadOutcome::Loaded {
                    source,
                    keys: config.len(),
                }
            }
            None => {
                let detail = attempts
                    .iter()
                    .map(|attempt| format!("{}: {}", attempt.path.display(), attempt.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                self.audit.record_config(&ConfigEvent::new(
                    AuditLevel::Warning,
                    None,
                    0,
                    format!("no configuration loaded, using defaults ({detail})"),
                ));
                ReloadOutcome::Failed {
                    attempts,
                }
            }
        };
        *guard = Arc::new(config);
        outcome
    }
}
