//! Multi-pass orchestrator
//!
//! [`Engine::describe_image`] runs pass A, then B and C when requested, folding
//! each parsed partial into one accumulator and finalizing it once.
//!
//! Fatal per image: an invalid image, or any backend error. Non-fatal: a pass
//! whose output has no recoverable JSON (recorded in the pass report).

use crate::backends::{build_backend, VisionBackend};
use crate::config::EngineSettings;
use crate::error::{DescribeError, DescribeResult};
use crate::merge::merge;
use crate::normalize::sanitize;
use crate::parser::{parse_pass, ParseFailure};
use crate::prompts::PromptSet;
use crate::record::Record;
use crate::summary::finalize;
use crate::types::{ImageInput, PassId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Engine options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Sanitize the merged record before finalizing
    pub normalize: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassStatus {
    /// JSON recovered; `fields` observed leaves contributed
    Parsed { fields: usize },
    /// No JSON recovered; the pass contributed nothing
    ParseFailed(ParseFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: PassId,
    pub status: PassStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Finalized record plus per-pass diagnostics
#[derive(Debug, Clone)]
pub struct Description {
    pub record: Record,
    pub passes: Vec<PassReport>,
}

impl Description {
    /// Parse-failure signals recorded during the run
    pub fn parse_failures(&self) -> Vec<&ParseFailure> {
        self.passes
            .iter()
            .filter_map(|report| match &report.status {
                PassStatus::ParseFailed(failure) => Some(failure),
                PassStatus::Parsed { .. } => None,
            })
            .collect()
    }
}

/// Multi-pass describe engine
///
/// Holds only immutable state; share it behind an `Arc` to describe images
/// from several tasks.
pub struct Engine {
    backend: Arc<dyn VisionBackend>,
    prompts: PromptSet,
    options: EngineOptions,
}

impl Engine {
    pub fn new(backend: Arc<dyn VisionBackend>, prompts: PromptSet) -> Self {
        info!("Engine created with {} backend", backend.name());
        Self {
            backend,
            prompts,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the configured backend and an engine around it
    pub fn from_settings(settings: &EngineSettings) -> vd_common::Result<Self> {
        let backend = build_backend(&settings.backend)?;
        Ok(Self::new(backend, settings.prompts.clone()).with_options(EngineOptions {
            normalize: settings.normalize,
        }))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Parse a caller-supplied pass list such as `"A,C"`
    pub fn parse_passes(list: &str) -> DescribeResult<Vec<PassId>> {
        PassId::parse_list(list)
    }

    /// Passes to execute for a request: A always, then B and C when asked, in order
    pub fn plan_passes(requested: &[PassId]) -> Vec<PassId> {
        PassId::ALL
            .into_iter()
            .filter(|pass| *pass == PassId::A || requested.contains(pass))
            .collect()
    }

    /// Describe one image
    ///
    /// # Errors
    /// - [`DescribeError::InvalidImage`] for empty or non-image bytes, before any backend call
    /// - a backend error on any pass aborts the image with no record
    pub async fn describe_image(
        &self,
        image: &ImageInput,
        requested: &[PassId],
    ) -> DescribeResult<Description> {
        validate_image(image)?;

        let plan = Self::plan_passes(requested);
        info!(
            image_id = %image.image_id,
            backend = self.backend.name(),
            "Describing image with passes {:?}",
            plan
        );

        let mut acc = Record::new(image.image_id.clone());
        let mut reports = Vec::with_capacity(plan.len());

        for pass in plan {
            let started_at = Utc::now();
            let timer = Instant::now();
            debug!(image_id = %image.image_id, pass = %pass, "Running {} pass", pass.label());

            let raw = self
                .backend
                .analyze(image, pass, self.prompts.for_pass(pass))
                .await
                .map_err(|e| {
                    error!(image_id = %image.image_id, pass = %pass, "Backend failed: {}", e);
                    DescribeError::from_backend(pass, e)
                })?;

            let outcome = parse_pass(pass, &raw);
            let status = match outcome.failure {
                Some(failure) => {
                    warn!(
                        image_id = %image.image_id,
                        pass = %pass,
                        "Parse failed ({}): {:?}",
                        failure.reason,
                        failure.excerpt
                    );
                    PassStatus::ParseFailed(failure)
                }
                None => PassStatus::Parsed {
                    fields: outcome.partial.observed_fields(),
                },
            };

            acc = merge(acc, outcome.partial);
            reports.push(PassReport {
                pass,
                status,
                started_at,
                elapsed_ms: timer.elapsed().as_millis() as u64,
            });
        }

        if self.options.normalize {
            acc = sanitize(acc);
        }
        let record = finalize(acc, &image.bytes);

        info!(
            image_id = %record.image_id,
            fields = record.observed_fields(),
            "Image described"
        );

        Ok(Description {
            record,
            passes: reports,
        })
    }
}

fn validate_image(image: &ImageInput) -> DescribeResult<()> {
    let reason = if image.bytes.is_empty() {
        "empty image data"
    } else if image.mime_type().is_none() {
        "unrecognized image format"
    } else {
        return Ok(());
    };
    Err(DescribeError::InvalidImage {
        image_id: image.image_id.clone(),
        reason: reason.to_string(),
    })
}
