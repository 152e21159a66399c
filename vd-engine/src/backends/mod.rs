//! VLM backend adapters
//!
//! One [`VisionBackend`] per provider. Adapters send one image and one pass
//! prompt and hand the model's text back verbatim; interpreting it is the
//! parser's job. The active backend is chosen once from [`BackendConfig`] and
//! shared as `Arc<dyn VisionBackend>`.

pub mod gemini;
pub mod local;
pub mod openai;
pub mod stub;

pub use gemini::GeminiBackend;
pub use local::LocalBackend;
pub use openai::OpenAiBackend;
pub use stub::StubBackend;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::types::{ImageInput, PassId, RawResponse};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Vision-language model adapter
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn kind(&self) -> BackendKind;

    /// Run one analysis pass over one image
    async fn analyze(
        &self,
        image: &ImageInput,
        pass: PassId,
        prompt: &str,
    ) -> Result<RawResponse, BackendError>;
}

/// Backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    OpenAi,
    Gemini,
    Local,
    #[default]
    Stub,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Local => "local",
            BackendKind::Stub => "stub",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = vd_common::Error;

    /// Accepts the variant names plus the model aliases used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt-4o" | "gpt4o" => Ok(BackendKind::OpenAi),
            "gemini" => Ok(BackendKind::Gemini),
            "local" | "ollama" | "blip2" => Ok(BackendKind::Local),
            "stub" => Ok(BackendKind::Stub),
            other => Err(vd_common::Error::Config(format!(
                "Unknown backend '{}' (expected openai, gemini, local or stub)",
                other
            ))),
        }
    }
}

/// Instantiate the configured backend
pub fn build_backend(config: &BackendConfig) -> vd_common::Result<Arc<dyn VisionBackend>> {
    let backend: Arc<dyn VisionBackend> = match config.kind {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(&config.openai, config.request_timeout)?),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(&config.gemini, config.request_timeout)?),
        BackendKind::Local => Arc::new(LocalBackend::new(&config.local, config.request_timeout)?),
        BackendKind::Stub => Arc::new(StubBackend::new()),
    };
    info!("Using {} backend", backend.name());
    Ok(backend)
}

// ============================================================================
// Shared HTTP helpers
// ============================================================================

pub(crate) fn http_client(timeout: Duration) -> vd_common::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| vd_common::Error::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success HTTP status to a backend error
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> BackendError {
    let excerpt: String = body.chars().take(200).collect();
    let message = format!("{} returned {}: {}", provider, status, excerpt);
    match status.as_u16() {
        401 | 403 => BackendError::Unavailable(message),
        429 => BackendError::RateLimited(message),
        _ => BackendError::Transport(message),
    }
}

/// Map a reqwest failure; unreachable endpoints count as unavailable
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> BackendError {
    if err.is_connect() {
        BackendError::Unavailable(format!("{} unreachable: {}", provider, err))
    } else {
        BackendError::Transport(format!("{} request failed: {}", provider, err))
    }
}

/// POST a JSON body and return the response text, mapping status codes
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<String, BackendError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        return Err(status_error(provider, status, &text));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_aliases() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("GPT-4o".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!(" gemini ".parse::<BackendKind>().unwrap(), BackendKind::Gemini);
        assert_eq!("blip2".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("stub".parse::<BackendKind>().unwrap(), BackendKind::Stub);
        assert!("claude".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;
        assert!(matches!(
            status_error("x", StatusCode::UNAUTHORIZED, ""),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            status_error("x", StatusCode::FORBIDDEN, ""),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            status_error("x", StatusCode::TOO_MANY_REQUESTS, "slow down"),
            BackendError::RateLimited(m) if m.contains("slow down")
        ));
        assert!(matches!(
            status_error("x", StatusCode::BAD_GATEWAY, ""),
            BackendError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_build_stub_backend() {
        let backend = build_backend(&BackendConfig::default()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Stub);
        assert_eq!(backend.name(), "stub");
    }
}
