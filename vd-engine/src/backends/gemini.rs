// Gemini Vision Backend
//
// generateContent with the image as inline_data and a JSON response MIME type.

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

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiBackend {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
    rate_limiter: DefaultDirectRateLimiter,
}

impl GeminiBackend {
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

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl VisionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn analyze(
        &self,
        image: &ImageInput,
        pass: PassId,
        prompt: &str,
    ) -> Result<RawResponse, BackendError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(BackendError::Unavailable(
                "GEMINI_API_KEY or GOOGLE_API_KEY is not configured".to_string(),
            ));
        };

        self.rate_limiter.until_ready().await;

        let body = json!({
            "system_instruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": prompt},
                    {"inline_data": {
                        "mime_type": image.mime_type().unwrap_or("image/jpeg"),
                        "data": image.base64()
                    }}
                ]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "responseMimeType": "application/json"
            }
        });

        debug!(pass = %pass, model = %self.model, "Calling Gemini generateContent");
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key);
        let text = post_json("Gemini", request, &body).await?;

        let response = match serde_json::from_str::<GenerateResponse>(&text) {
            Ok(r) if r.candidates.is_some() || r.prompt_feedback.is_some() => r,
            _ => return Ok(RawResponse::new(text)),
        };

        let candidate = response.candidates.unwrap_or_default().into_iter().next();
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
        let content: String = candidate
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if content.is_empty() {
            let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
            warn!(
                pass = %pass,
                block_reason = block_reason.as_deref().unwrap_or(""),
                finish_reason = finish_reason.as_deref().unwrap_or(""),
                "Gemini returned no content"
            );
        }
        Ok(RawResponse::new(content))
    }
}
