//! Configuration loading and setting resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (applied by the caller)
//!
//! A missing TOML file is never fatal: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VD_CONFIG";

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "visual-descriptor";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Contents of the TOML config file
///
/// Every field is optional so that a partial file (or no file at all) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Active backend: "openai", "gemini", "local" or "stub"
    pub backend: Option<String>,
    /// Default pass list, e.g. "A,B,C"
    pub passes: Option<String>,
    /// Whether to sanitize merged records before finalizing
    pub normalize: Option<bool>,
    /// HTTP timeout for network backends
    pub request_timeout_secs: Option<u64>,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub local: ProviderConfig,
    pub prompts: PromptConfig,
    pub logging: LoggingConfig,
}

/// Per-provider connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Prompt text overrides, one per pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub a: Option<String>,
    pub b: Option<String>,
    pub c: Option<String>,
}

/// Logging section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set (e.g. "info", "vd_engine=debug")
    pub level: Option<String>,
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    TomlFile,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CommandLine => write!(f, "command line"),
            ConfigSource::Environment => write!(f, "environment"),
            ConfigSource::TomlFile => write!(f, "TOML config"),
        }
    }
}

/// A setting value together with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub value: String,
    pub source: ConfigSource,
}

/// Locate the config file
///
/// Order: explicit path, then `$VD_CONFIG`, then
/// `<config dir>/visual-descriptor/config.toml`. Returns `None` when no
/// candidate exists on disk.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// A missing file produces `TomlConfig::default()` and a warning. A file that
/// exists but does not parse is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = config_file_path(explicit) else {
        debug!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(&path)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve one setting across command line, environment and TOML
///
/// `env_vars` are tried in order; the first valid one wins within the
/// environment tier. Blank values are ignored at every tier. Logs a warning when
/// `secret` is set and the value appears in more than one source.
pub fn resolve_setting(
    name: &str,
    cli: Option<&str>,
    env_vars: &[&str],
    toml_value: Option<&str>,
    secret: bool,
) -> Option<ResolvedSetting> {
    let env_value = env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| is_valid_key(v));

    let candidates = [
        (cli.map(str::to_string), ConfigSource::CommandLine),
        (env_value, ConfigSource::Environment),
        (toml_value.map(str::to_string), ConfigSource::TomlFile),
    ];

    let present: Vec<(String, ConfigSource)> = candidates
        .into_iter()
        .filter_map(|(value, source)| value.filter(|v| is_valid_key(v)).map(|v| (v, source)))
        .collect();

    if secret && present.len() > 1 {
        let sources: Vec<String> = present.iter().map(|(_, s)| s.to_string()).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            present[0].1
        );
    }

    present.into_iter().next().map(|(value, source)| {
        debug!("{} resolved from {}", name, source);
        ResolvedSetting {
            value: value.trim().to_string(),
            source,
        }
    })
}

/// Validate a key or setting value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \n"));
    }

    #[test]
    fn test_cli_beats_toml() {
        let resolved = resolve_setting("backend", Some("gemini"), &[], Some("openai"), false)
            .unwrap();
        assert_eq!(resolved.value, "gemini");
        assert_eq!(resolved.source, ConfigSource::CommandLine);
    }

    #[test]
    fn test_blank_values_skipped() {
        let resolved = resolve_setting("backend", Some("  "), &[], Some("local"), false).unwrap();
        assert_eq!(resolved.value, "local");
        assert_eq!(resolved.source, ConfigSource::TomlFile);

        assert!(resolve_setting("backend", None, &[], Some(""), false).is_none());
    }

    #[test]
    fn test_values_are_trimmed() {
        let resolved = resolve_setting("api key", None, &[], Some(" key \n"), true).unwrap();
        assert_eq!(resolved.value, "key");
    }

    #[test]
    fn test_partial_toml_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
backend = "gemini"

[gemini]
model = "gemini-2.0-flash"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.as_deref(), Some("gemini"));
        assert_eq!(config.gemini.model.as_deref(), Some("gemini-2.0-flash"));
        assert!(config.openai.api_key.is_none());
        assert!(config.prompts.a.is_none());
    }
}
