// Stub Backend
//
// Deterministic, offline backend. Returns canned text per pass and can be
// scripted to fail on a given pass. Used by tests and by `--model stub`.

use super::{BackendKind, VisionBackend};
use crate::error::BackendError;
use crate::types::{ImageInput, PassId, RawResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

const DEFAULT_PASS_A: &str = r#"{
  "garment_type": "dress",
  "silhouette": "sheath",
  "fit_and_drape": "soft drape",
  "fabric": {"type": "jersey", "texture": "smooth", "weight": "medium"},
  "confidence": {"garment_type": 0.65, "silhouette": 0.7}
}"#;

const DEFAULT_PASS_B: &str = r#"{
  "construction": {
    "seams": "panel seams",
    "stitching": "topstitch",
    "hems": "clean finish",
    "closure": null
  },
  "confidence": {"construction": {"stitching": 0.7, "seams": 0.65, "hems": 0.6}}
}"#;

const DEFAULT_PASS_C: &str = r#"{
  "pose": "walking",
  "photo_style": "runway",
  "environment_lighting": {"setup": "softbox", "mood": null},
  "confidence": {"pose": 0.7, "photo_style": 0.6}
}"#;

/// Scripted outcome for one pass
#[derive(Debug, Clone)]
enum Script {
    Respond(String),
    Fail(BackendError),
}

pub struct StubBackend {
    scripts: HashMap<PassId, Script>,
    call_count: AtomicUsize,
    /// Per-call pass log, only kept when asked for with `with_call_log`
    call_log: Option<Mutex<Vec<PassId>>>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    /// Stub with the built-in canned response for every pass
    pub fn new() -> Self {
        let scripts = [
            (PassId::A, DEFAULT_PASS_A),
            (PassId::B, DEFAULT_PASS_B),
            (PassId::C, DEFAULT_PASS_C),
        ]
        .into_iter()
        .map(|(pass, text)| (pass, Script::Respond(text.to_string())))
        .collect();

        Self {
            scripts,
            call_count: AtomicUsize::new(0),
            call_log: None,
        }
    }

    /// Replace the response text for one pass
    pub fn with_response(mut self, pass: PassId, text: impl Into<String>) -> Self {
        self.scripts.insert(pass, Script::Respond(text.into()));
        self
    }

    /// Make one pass fail with the given error
    pub fn with_failure(mut self, pass: PassId, error: BackendError) -> Self {
        self.scripts.insert(pass, Script::Fail(error));
        self
    }

    /// Record the pass of every call, readable through [`StubBackend::calls`]
    pub fn with_call_log(mut self) -> Self {
        self.call_log = Some(Mutex::new(Vec::new()));
        self
    }

    /// Number of `analyze` calls served so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Passes requested so far, in call order; empty without a call log
    pub fn calls(&self) -> Vec<PassId> {
        self.call_log
            .as_ref()
            .and_then(|log| log.lock().ok().map(|c| c.clone()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl VisionBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Stub
    }

    async fn analyze(
        &self,
        image: &ImageInput,
        pass: PassId,
        _prompt: &str,
    ) -> Result<RawResponse, BackendError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(Ok(mut log)) = self.call_log.as_ref().map(|log| log.lock()) {
            log.push(pass);
        }
        debug!(pass = %pass, image_id = %image.image_id, "Stub backend call");

        match self.scripts.get(&pass) {
            Some(Script::Respond(text)) => Ok(RawResponse::new(text.clone())),
            Some(Script::Fail(error)) => Err(error.clone()),
            None => Ok(RawResponse::new(String::new())),
        }
    }
}
