// Local Vision Backend
//
// Ollama-compatible /api/generate endpoint serving a local vision model.

use super::{post_json, BackendKind, VisionBackend};
use crate::config::ProviderSettings;
use crate::error::BackendError;
use crate::prompts::SYSTEM_PROMPT;
use crate::types::{ImageInput, PassId, RawResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llava";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: Option<String>,
}

pub struct LocalBackend {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl LocalBackend {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> vd_common::Result<Self> {
        Ok(Self {
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: super::http_client(timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VisionBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn analyze(
        &self,
        image: &ImageInput,
        pass: PassId,
        prompt: &str,
    ) -> Result<RawResponse, BackendError> {
        let body = json!({
            "model": self.model,
            "system": SYSTEM_PROMPT,
            "prompt": prompt,
            "images": [image.base64()],
            "format": "json",
            "stream": false,
            "options": {"temperature": 0}
        });

        debug!(pass = %pass, model = %self.model, url = %self.base_url, "Calling local model");
        let text = post_json("Local model", self.client.post(self.endpoint()), &body).await?;

        // Only bodies carrying the model name are treated as the generate envelope
        match serde_json::from_str::<GenerateResponse>(&text) {
            Ok(envelope) => {
                let content = envelope.response.unwrap_or_default();
                if content.is_empty() {
                    warn!(pass = %pass, model = %envelope.model, "Local model returned no content");
                }
                Ok(RawResponse::new(content))
            }
            Err(_) => Ok(RawResponse::new(text)),
        }
    }
}
