//! Integration tests for configuration loading and setting resolution
//!
//! Tests that manipulate environment variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use serial_test::serial;
use std::env;
use std::io::Write;
use vd_common::config::{
    config_file_path, load_config, load_toml_config, resolve_setting, ConfigSource, CONFIG_ENV_VAR,
};
use vd_common::Error;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
backend = "openai"
passes = "A,C"
normalize = false
request_timeout_secs = 30

[openai]
api_key = "sk-test"
model = "gpt-4o"

[local]
base_url = "http://127.0.0.1:11434"
model = "llava"

[prompts]
b = "Describe construction only."

[logging]
level = "debug"
"#,
    );

    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(config.backend.as_deref(), Some("openai"));
    assert_eq!(config.passes.as_deref(), Some("A,C"));
    assert_eq!(config.normalize, Some(false));
    assert_eq!(config.request_timeout_secs, Some(30));
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.local.model.as_deref(), Some("llava"));
    assert_eq!(config.prompts.b.as_deref(), Some("Describe construction only."));
    assert!(config.prompts.a.is_none());
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
}

#[test]
fn test_malformed_config_is_error() {
    let file = write_config("backend = [unterminated");
    let result = load_toml_config(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_missing_config_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = load_config(Some(&missing)).unwrap();
    assert!(config.backend.is_none());
    assert!(config.openai.api_key.is_none());
}

#[test]
#[serial]
fn test_config_env_var_locates_file() {
    let file = write_config("backend = \"gemini\"\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    assert_eq!(config_file_path(None).as_deref(), Some(file.path()));
    let config = load_config(None).unwrap();
    assert_eq!(config.backend.as_deref(), Some("gemini"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let from_env = write_config("backend = \"gemini\"\n");
    let explicit = write_config("backend = \"local\"\n");
    env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = load_config(Some(explicit.path())).unwrap();
    assert_eq!(config.backend.as_deref(), Some("local"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var("VD_TEST_SETTING", "from-env");

    let resolved = resolve_setting("setting", None, &["VD_TEST_SETTING"], Some("from-toml"), false)
        .unwrap();
    assert_eq!(resolved.value, "from-env");
    assert_eq!(resolved.source, ConfigSource::Environment);

    env::remove_var("VD_TEST_SETTING");
}

#[test]
#[serial]
fn test_fallback_env_var_order() {
    env::remove_var("VD_TEST_PRIMARY");
    env::set_var("VD_TEST_SECONDARY", "second");

    let resolved = resolve_setting(
        "key",
        None,
        &["VD_TEST_PRIMARY", "VD_TEST_SECONDARY"],
        None,
        true,
    )
    .unwrap();
    assert_eq!(resolved.value, "second");

    env::set_var("VD_TEST_PRIMARY", "first");
    let resolved = resolve_setting(
        "key",
        None,
        &["VD_TEST_PRIMARY", "VD_TEST_SECONDARY"],
        None,
        true,
    )
    .unwrap();
    assert_eq!(resolved.value, "first");

    env::remove_var("VD_TEST_PRIMARY");
    env::remove_var("VD_TEST_SECONDARY");
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var("VD_TEST_BLANK", "   ");

    let resolved = resolve_setting("key", None, &["VD_TEST_BLANK"], Some("toml-key"), true).unwrap();
    assert_eq!(resolved.source, ConfigSource::TomlFile);

    env::remove_var("VD_TEST_BLANK");
}
