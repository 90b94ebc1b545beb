//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O operations, JSON persistence, and settings round-trip.

use std::collections::BTreeSet;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::persistence::{load_json, load_json_or_default, save_json};
use crate::settings_store::{LogLevel, Settings, SettingsStore};
use aimeter_core::{DisplayMode, ProviderKind};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_and_load_json_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("test.json");

    let settings = Settings::default();
    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("test.json");

    let data = serde_json::json!({"key": "value"});

    save_json(&nested_path, &data).await.unwrap();
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<Settings, _> = load_json(&file_path).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_load_or_default_on_corrupt_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "{ not json").await.unwrap();

    let loaded: Settings = load_json_or_default(&file_path).await;
    assert_eq!(loaded, Settings::default());
}

#[tokio::test]
async fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("atomic.json");

    save_json(&file_path, &Settings::default()).await.unwrap();

    assert!(!file_path.with_extension("json.tmp").exists());
    assert!(file_path.exists());
}

// ============================================================================
// Settings Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_settings_full_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let settings = Settings {
        enabled_providers: BTreeSet::from([ProviderKind::Codex]),
        refresh_interval_secs: 0,
        thresholds: vec![50, 75, 95],
        notifications_enabled: false,
        auto_refresh_on_wake: false,
        display_mode: DisplayMode::Session,
        log_level: LogLevel::Debug,
    };

    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_settings_file_format() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    save_json(&file_path, &Settings::default()).await.unwrap();
    let raw: serde_json::Value = load_json(&file_path).await.unwrap();

    assert_eq!(raw["enabled_providers"], serde_json::json!(["claude", "codex"]));
    assert_eq!(raw["refresh_interval_secs"], 120);
    assert_eq!(raw["display_mode"], "weekly");
    assert_eq!(raw["log_level"], "info");
}

#[tokio::test]
async fn test_load_minimal_json_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("minimal.json");
    tokio::fs::write(&file_path, r#"{"refresh_interval_secs": 300}"#)
        .await
        .unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded.refresh_interval_secs, 300);
    assert_eq!(loaded.thresholds, vec![80, 90]);
    assert!(loaded.auto_refresh_on_wake);
}

#[tokio::test]
async fn test_load_json_with_unknown_fields() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("extra_fields.json");

    let json = r#"{
        "display_mode": "session",
        "unknown_field": "value",
        "nested_unknown": {"key": "value"}
    }"#;
    tokio::fs::write(&file_path, json).await.unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();
    assert_eq!(loaded.display_mode, DisplayMode::Session);
}

// ============================================================================
// Settings Store Tests
// ============================================================================

#[tokio::test]
async fn test_store_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("aimeter").join("settings.json");

    let store = SettingsStore::load(file_path.clone()).await.unwrap();
    assert_eq!(store.get().await, Settings::default());

    store.set_thresholds(vec![70]).await;
    store.set_provider_enabled(ProviderKind::Claude, false).await;
    store.save().await.unwrap();

    let reloaded = SettingsStore::load(file_path).await.unwrap();
    assert_eq!(reloaded.thresholds().await, vec![70]);
    assert!(!reloaded.is_provider_enabled(ProviderKind::Claude).await);
}

#[tokio::test]
async fn test_store_load_corrupt_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");
    tokio::fs::write(&file_path, "garbage").await.unwrap();

    let store = SettingsStore::load(file_path.clone()).await.unwrap();
    assert_eq!(store.get().await, Settings::default());

    // The corrupt file is left alone until the next save.
    assert_eq!(tokio::fs::read_to_string(&file_path).await.unwrap(), "garbage");
}

#[tokio::test]
async fn test_store_load_directory_is_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(SettingsStore::load(temp_dir.path().to_path_buf()).await.is_err());
}
