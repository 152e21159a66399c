// OpenAI Vision Backend
//
// Chat Completions with the image inlined as a base64 data URL and JSON-object
// response format.

use super::{post_json, BackendKind, VisionBackend};
use crate::config::ProviderSettings;
use crate::error::BackendError;
use crate::prompts::SYSTEM_PROMPT;
use crate::types::{ImageInput, PassId, RawResponse};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Client-side request ceiling
const REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    refusal: Option<String>,
}

pub struct OpenAiBackend {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
    rate_limiter: DefaultDirectRateLimiter,
}

impl OpenAiBackend {
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> vd_common::Result<Self> {
        let quota = Quota::per_second(NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN));
        Ok(Self {
            api_key: settings.api_key.clone(),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: super::http_client(timeout)?,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Check if an API key is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VisionBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    async fn analyze(
        &self,
        image: &ImageInput,
        pass: PassId,
        prompt: &str,
    ) -> Result<RawResponse, BackendError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(BackendError::Unavailable(
                "OPENAI_API_KEY is not configured".to_string(),
            ));
        };

        self.rate_limiter.until_ready().await;

        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image.data_url()}}
                ]}
            ]
        });

        debug!(pass = %pass, model = %self.model, "Calling OpenAI chat completions");
        let request = self.client.post(self.endpoint()).bearer_auth(api_key);
        let text = post_json("OpenAI", request, &body).await?;

        // Unexpected envelopes go to the parser as-is
        let Ok(response) = serde_json::from_str::<ChatResponse>(&text) else {
            return Ok(RawResponse::new(text));
        };
        let message = response.choices.into_iter().next().map(|c| c.message);
        match message {
            Some(ChatMessage { content: Some(content), .. }) => Ok(RawResponse::new(content)),
            Some(ChatMessage { refusal, .. }) => {
                warn!(pass = %pass, refusal = refusal.as_deref().unwrap_or(""), "OpenAI returned no content");
                Ok(RawResponse::new(refusal.unwrap_or_default()))
            }
            None => {
                warn!(pass = %pass, "OpenAI returned no choices");
                Ok(RawResponse::new(String::new()))
            }
        }
    }
}
