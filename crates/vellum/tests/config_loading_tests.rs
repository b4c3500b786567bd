//! Configuration loading integration tests.
//!
//! Tests the config loading APIs:
//! - from_file() with TOML/YAML/JSON
//! - discover() for searching parent directories
//! - Error handling for invalid configs

use serial_test::serial;
use std::fs;
use tempfile::TempDir;
use vellum::core::config::LoaderConfig;
use vellum::{LoadRequest, VellumError};

/// Restores the working directory when dropped.
struct CwdGuard(std::path::PathBuf);

impl CwdGuard {
    fn enter(dir: &std::path::Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.0);
    }
}

#[test]
fn test_from_file_toml_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("viewer.toml");

    fs::write(
        &config_path,
        r#"
with_credentials = true
theme_prefix = "viewer"

[http_headers]
Authorization = "Bearer abc"
Accept = ["application/pdf", "*/*"]

[character_map]
url = "https://cdn.example.com/cmaps/"
is_compressed = true
"#,
    )
    .unwrap();

    let config = LoaderConfig::from_file(&config_path).unwrap();
    assert!(config.with_credentials);
    assert_eq!(config.theme_prefix, "viewer");
    assert_eq!(config.http_headers.len(), 2);
    assert!(config.character_map.as_ref().unwrap().is_compressed);
    assert_eq!(config.default_error_message, "Cannot load document");
}

#[test]
fn test_from_file_yaml_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("viewer.yml");

    fs::write(
        &config_path,
        "default_error_message: Could not open this file\nread_chunk_size: 1024\n",
    )
    .unwrap();

    let config = LoaderConfig::from_file(&config_path).unwrap();
    assert_eq!(config.default_error_message, "Could not open this file");
    assert_eq!(config.read_chunk_size, 1024);
}

#[test]
fn test_from_file_json_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("viewer.json");

    fs::write(&config_path, r#"{"worker_name_prefix": "DocWorker"}"#).unwrap();

    let config = LoaderConfig::from_file(&config_path).unwrap();
    assert_eq!(config.worker_name_prefix, "DocWorker");
    assert_eq!(config.theme_prefix, "rpv");
}

#[test]
fn test_invalid_config_is_validation_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("viewer.toml");
    fs::write(&config_path, "theme_prefix = \"\"").unwrap();

    let result = LoaderConfig::from_file(&config_path);
    assert!(matches!(result, Err(VellumError::Validation { .. })));
}

#[test]
fn test_config_feeds_requests() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("viewer.toml");
    fs::write(&config_path, "with_credentials = true\n[http_headers]\nX-Tenant = \"acme\"\n").unwrap();

    let config = LoaderConfig::from_file(&config_path).unwrap();
    let request = LoadRequest::from_config("https://example.com/a.pdf", &config);

    assert!(request.with_credentials);
    assert!(request.http_headers.contains_key("X-Tenant"));
}

#[test]
#[serial]
fn test_discover_finds_config_in_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("vellum.toml"), "theme_prefix = \"found\"").unwrap();

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let _guard = CwdGuard::enter(&nested);
    let config = LoaderConfig::discover().unwrap();

    assert_eq!(config.map(|c| c.theme_prefix).as_deref(), Some("found"));
}

#[test]
#[serial]
fn test_discover_propagates_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("vellum.toml"), "read_chunk_size = 0").unwrap();

    let _guard = CwdGuard::enter(temp_dir.path());
    assert!(LoaderConfig::discover().is_err());
}
