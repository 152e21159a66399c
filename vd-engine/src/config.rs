//! Configuration resolution for vd-engine
//!
//! Turns command-line overrides, environment variables and the TOML file into
//! the immutable settings the engine is built from.
//!
//! **Priority:** CLI → ENV → TOML → compiled default

use crate::backends::BackendKind;
use crate::prompts::PromptSet;
use crate::types::PassId;
use std::time::Duration;
use tracing::info;
use vd_common::config::{resolve_setting, ProviderConfig, TomlConfig};
use vd_common::{Error, Result};

/// Default HTTP timeout for network backends
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Pass list used when nothing is configured
pub const DEFAULT_PASSES: &str = "A,B,C";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<String>,
    pub passes: Option<String>,
    pub normalize: Option<bool>,
}

/// Connection settings for one provider; `None` fields use the backend's default
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Immutable backend selection, resolved once per process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub openai: ProviderSettings,
    pub gemini: ProviderSettings,
    pub local: ProviderSettings,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Stub,
            openai: ProviderSettings::default(),
            gemini: ProviderSettings::default(),
            local: ProviderSettings::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Resolve the backend selection and provider credentials
    pub fn resolve(cli_backend: Option<&str>, toml: &TomlConfig) -> Result<Self> {
        let kind = match resolve_setting("backend", cli_backend, &["VD_MODEL"], toml.backend.as_deref(), false) {
            Some(setting) => {
                info!("Backend '{}' selected from {}", setting.value, setting.source);
                setting.value.parse::<BackendKind>()?
            }
            None => BackendKind::default(),
        };

        let openai = ProviderSettings {
            api_key: secret("OpenAI API key", &["OPENAI_API_KEY"], &toml.openai),
            model: value("OpenAI model", &["OPENAI_MODEL"], toml.openai.model.as_deref()),
            base_url: value("OpenAI base URL", &["OPENAI_BASE_URL"], toml.openai.base_url.as_deref()),
        };
        let gemini = ProviderSettings {
            api_key: secret("Gemini API key", &["GEMINI_API_KEY", "GOOGLE_API_KEY"], &toml.gemini),
            model: value("Gemini model", &["GEMINI_MODEL"], toml.gemini.model.as_deref()),
            base_url: value("Gemini base URL", &["GEMINI_BASE_URL"], toml.gemini.base_url.as_deref()),
        };
        let local = ProviderSettings {
            api_key: None,
            model: value("local model", &["VD_LOCAL_MODEL"], toml.local.model.as_deref()),
            base_url: value("local URL", &["VD_LOCAL_URL"], toml.local.base_url.as_deref()),
        };

        let timeout_secs = toml
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            kind,
            openai,
            gemini,
            local,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn secret(name: &str, env_vars: &[&str], provider: &ProviderConfig) -> Option<String> {
    resolve_setting(name, None, env_vars, provider.api_key.as_deref(), true).map(|s| s.value)
}

fn value(name: &str, env_vars: &[&str], toml_value: Option<&str>) -> Option<String> {
    resolve_setting(name, None, env_vars, toml_value, false).map(|s| s.value)
}

/// Everything needed to build an engine and run a batch
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: BackendConfig,
    pub passes: Vec<PassId>,
    pub normalize: bool,
    pub prompts: PromptSet,
}

impl EngineSettings {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let backend = BackendConfig::resolve(cli.backend.as_deref(), toml)?;

        let passes_text = resolve_setting(
            "passes",
            cli.passes.as_deref(),
            &["VD_PASSES"],
            toml.passes.as_deref(),
            false,
        )
        .map(|s| s.value)
        .unwrap_or_else(|| DEFAULT_PASSES.to_string());
        let passes = PassId::parse_list(&passes_text).map_err(|e| Error::Config(e.to_string()))?;

        let normalize = cli.normalize.or(toml.normalize).unwrap_or(true);

        Ok(Self {
            backend,
            passes,
            normalize,
            prompts: PromptSet::with_overrides(&toml.prompts),
        })
    }
}
