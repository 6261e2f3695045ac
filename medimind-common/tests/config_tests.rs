//! Integration tests for configuration loading
//!
//! Covers TOML file parsing, graceful fallback for missing or broken files,
//! data folder resolution and priority against the real process environment.
//!
//! Tests that touch process environment variables are marked #[serial].

use medimind_common::config::{
    CliOverrides, DataDirInitializer, DataDirResolver, ServiceConfig, TomlConfig,
    DATABASE_FILE_NAME, DEFAULT_PORT,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file_parses_all_sections() {
    let file = write_toml(
        r#"
data_dir = "/srv/medimind"

[server]
host = "127.0.0.1"
port = 8100

[logging]
level = "debug"

[auth]
session_ttl_seconds = 3600
password_rounds = 1000

[llm]
api_key = "gsk_test"
model = "llama-3.1-8b-instant"

[email]
enabled = true
from = "Clinic <noreply@clinic.test>"

[scheduler]
utc_offset_minutes = 0
match_window_minutes = 5
keepalive_url = "https://medimind.test"
"#,
    );

    let toml = TomlConfig::load(file.path()).unwrap();
    assert_eq!(toml.data_dir, Some(PathBuf::from("/srv/medimind")));
    assert_eq!(toml.server.port, Some(8100));
    assert_eq!(toml.logging.level, "debug");
    assert_eq!(toml.auth.password_rounds, Some(1000));
    assert_eq!(toml.llm.model.as_deref(), Some("llama-3.1-8b-instant"));
    assert_eq!(toml.email.enabled, Some(true));
    assert_eq!(toml.scheduler.match_window_minutes, Some(5));
}

#[test]
fn test_partial_toml_uses_section_defaults() {
    let file = write_toml("[server]\nport = 9001\n");

    let toml = TomlConfig::load(file.path()).unwrap();
    assert_eq!(toml.server.port, Some(9001));
    assert!(toml.server.host.is_none());
    assert_eq!(toml.logging.level, "info");
    assert!(toml.email.enabled.is_none());
}

#[test]
fn test_missing_toml_falls_back_to_defaults() {
    let path = PathBuf::from("/nonexistent/medimind/config.toml");
    let toml = TomlConfig::load_or_default(Some(&path));
    assert!(toml.server.port.is_none());
    assert_eq!(toml.logging.level, "info");
}

#[test]
fn test_malformed_toml_falls_back_to_defaults() {
    let file = write_toml("[server\nport = ");

    assert!(TomlConfig::load(file.path()).is_err());
    let toml = TomlConfig::load_or_default(Some(file.path()));
    assert!(toml.server.port.is_none());
}

#[test]
fn test_data_dir_resolver_priority() {
    let resolver = DataDirResolver {
        cli: Some(PathBuf::from("/cli")),
        env: Some(PathBuf::from("/env")),
        toml: Some(PathBuf::from("/toml")),
    };
    assert_eq!(resolver.resolve(), PathBuf::from("/cli"));

    let resolver = DataDirResolver {
        cli: None,
        env: None,
        toml: Some(PathBuf::from("/toml")),
    };
    assert_eq!(resolver.resolve(), PathBuf::from("/toml"));

    let fallback = DataDirResolver::default().resolve();
    assert!(fallback.to_string_lossy().contains("medimind"));
}

#[test]
fn test_data_dir_initializer_creates_folder() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("nested").join("medimind");

    let initializer = DataDirInitializer::new(data_dir.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(data_dir.is_dir());

    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();
}

#[test]
#[serial]
fn test_process_env_overrides_toml() {
    env::set_var("PORT", "8443");
    env::set_var("MEDIMIND_DATA_DIR", "/env/data");
    env::remove_var("DATABASE_URL");

    let mut toml = TomlConfig::default();
    toml.server.port = Some(7000);
    toml.data_dir = Some(PathBuf::from("/toml/data"));

    let config = ServiceConfig::load(&CliOverrides::default(), &toml);
    assert_eq!(config.port, 8443);
    assert_eq!(config.data_dir, PathBuf::from("/env/data"));
    assert_eq!(config.database_path, PathBuf::from("/env/data").join(DATABASE_FILE_NAME));

    env::remove_var("PORT");
    env::remove_var("MEDIMIND_DATA_DIR");
}

#[test]
#[serial]
fn test_unset_env_uses_compiled_default_port() {
    env::remove_var("PORT");
    env::remove_var("HOST");

    let config = ServiceConfig::load(&CliOverrides::default(), &TomlConfig::default());
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.bind_address(), format!("0.0.0.0:{}", DEFAULT_PORT));
}
