// crates/toop-interface-config/tests/provider.rs
// ============================================================================
// Module: Configuration Provider Tests
// Description: Source resolution order, fallback, and reload behavior.
// Purpose: Ensure configuration degrades to defaults and reloads atomically.
// ============================================================================

//! Configuration provider integration tests.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::sync::Arc;
use std::sync::Mutex;

use toop_interface_config::ConfigLoader;
use toop_interface_config::ConfigProvider;
use toop_interface_config::DEFAULT_PROPERTIES_NAME;
use toop_interface_config::InterfaceConfig;
use toop_interface_config::MAX_CONFIG_FILE_SIZE;
use toop_interface_config::PRIVATE_PROPERTIES_NAME;
use toop_interface_config::ReloadOutcome;
use toop_interface_core::AuditLevel;
use toop_interface_core::AuditSink;
use toop_interface_core::ConfigEvent;
use toop_interface_core::ExchangeEvent;

#[derive(Default)]
struct RecordingSink {
    levels: Mutex<Vec<AuditLevel>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, _event: &ExchangeEvent) {}

    fn record_config(&self, event: &ConfigEvent) {
        self.levels.lock().unwrap().push(event.level);
    }
}

#[test]
fn missing_configuration_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let provider = ConfigProvider::with_audit(ConfigLoader::in_dir(dir.path()), sink.clone());

    assert!(matches!(provider.last_outcome(), ReloadOutcome::Failed { .. }));
    let config = provider.current();
    assert!(config.is_empty());
    assert_eq!(config.get_string("toop.connector.dc.url"), None);
    assert_eq!(config.get_string_or("toop.connector.dc.url", "default"), "default");
    assert!(config.is_global_debug());

    match provider.reload() {
        ReloadOutcome::Failed {
            attempts,
        } => assert_eq!(attempts.len(), 2),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(*sink.levels.lock().unwrap(), vec![AuditLevel::Warning, AuditLevel::Warning]);
}

#[test]
fn override_path_wins_over_private_and_default_files() {
    let dir = tempfile::tempdir().unwrap();
    let override_path = dir.path().join("custom.properties");
    fs::write(&override_path, "toop.connector.dc.url=http://override\n").unwrap();
    fs::write(dir.path().join(PRIVATE_PROPERTIES_NAME), "toop.connector.dc.url=http://private\n")
        .unwrap();
    fs::write(dir.path().join(DEFAULT_PROPERTIES_NAME), "toop.connector.dc.url=http://default\n")
        .unwrap();

    let loader = ConfigLoader::in_dir(dir.path()).with_override_path(&override_path);
    let provider = ConfigProvider::new(loader);
    let config = provider.current();
    assert_eq!(config.dc_connector_url(), Some("http://override"));
    assert_eq!(config.source(), Some(override_path.as_path()));
}

#[test]
fn private_file_wins_over_default_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(PRIVATE_PROPERTIES_NAME), "toop.connector.dp.url=http://private\n")
        .unwrap();
    fs::write(dir.path().join(DEFAULT_PROPERTIES_NAME), "toop.connector.dp.url=http://default\n")
        .unwrap();

    let provider = ConfigProvider::new(ConfigLoader::in_dir(dir.path()));
    assert_eq!(provider.current().dp_connector_url(), Some("http://private"));
}

#[test]
fn candidate_that_fails_to_load_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let oversized = "a".repeat(MAX_CONFIG_FILE_SIZE + 1);
    fs::write(dir.path().join(PRIVATE_PROPERTIES_NAME), oversized).unwrap();
    fs::write(dir.path().join(DEFAULT_PROPERTIES_NAME), "global.production=true\n").unwrap();

    let provider = ConfigProvider::new(ConfigLoader::in_dir(dir.path()));
    let config = provider.current();
    assert!(config.is_global_production());
    assert_eq!(config.source(), Some(dir.path().join(DEFAULT_PROPERTIES_NAME).as_path()));
}

#[test]
fn reload_swaps_snapshot_without_touching_held_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_PROPERTIES_NAME);
    fs::write(&path, "toop.connector.dc.url=http://first\n").unwrap();
    let provider = ConfigProvider::new(ConfigLoader::in_dir(dir.path()));
    assert!(provider.last_outcome().is_success());
    let before = provider.current();

    fs::write(&path, "toop.connector.dc.url=http://second\nglobal.debug=false\n").unwrap();
    let outcome = provider.reload();
    assert_eq!(
        outcome,
        ReloadOutcome::Loaded {
            source: path.clone(),
            keys: 2,
        }
    );
    assert_eq!(before.dc_connector_url(), Some("http://first"));
    assert_eq!(provider.current().dc_connector_url(), Some("http://second"));

    fs::remove_file(&path).unwrap();
    assert!(!provider.reload().is_success());
    assert!(!provider.last_outcome().is_success());
    assert!(provider.current().is_empty());
}

#[test]
fn relative_keystore_path_resolves_against_config_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_PROPERTIES_NAME);
    fs::write(
        &path,
        "toop.keystore.path=keys/keystore.toml\ntoop.keystore.password=store\n\
         toop.keystore.key.password=key\n",
    )
    .unwrap();
    let config = InterfaceConfig::load_file(&path).unwrap();
    let material = config.key_material().unwrap();
    assert_eq!(material.keystore_path, dir.path().join("keys/keystore.toml"));
    assert_eq!(material.keystore_password, "store");
    assert_eq!(material.key_alias, None);
}

#[test]
fn fixed_provider_ignores_reload() {
    let provider =
        ConfigProvider::fixed(InterfaceConfig::from_pairs([("toop.connector.dc.url", "http://x")]));
    assert_eq!(provider.last_outcome(), ReloadOutcome::Fixed);
    assert_eq!(provider.reload(), ReloadOutcome::Fixed);
    assert_eq!(provider.current().dc_connector_url(), Some("http://x"));
}
