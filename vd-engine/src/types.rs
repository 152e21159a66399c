//! Core types shared by the engine, backends and parser
//!
//! - [`PassId`]: one of the three analysis passes
//! - [`ImageInput`]: image bytes plus the identifier derived from the file name
//! - [`RawResponse`]: a backend payload, passed through verbatim

use crate::error::DescribeError;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Pass identifiers
// ============================================================================

/// Analysis pass identifier
///
/// Passes always execute in declaration order: A (global garment fields),
/// B (construction), C (presentation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PassId {
    A,
    B,
    C,
}

impl PassId {
    /// All passes in execution order
    pub const ALL: [PassId; 3] = [PassId::A, PassId::B, PassId::C];

    pub fn as_str(self) -> &'static str {
        match self {
            PassId::A => "A",
            PassId::B => "B",
            PassId::C => "C",
        }
    }

    /// Short human label used in logs
    pub fn label(self) -> &'static str {
        match self {
            PassId::A => "global",
            PassId::B => "construction",
            PassId::C => "presentation",
        }
    }

    /// Parse a comma-separated pass list such as `"A,B,C"`
    ///
    /// Identifiers are trimmed and case-insensitive; blank entries are skipped.
    /// Any identifier outside {A, B, C} rejects the whole list.
    pub fn parse_list(list: &str) -> Result<Vec<PassId>, DescribeError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassId {
    type Err = DescribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(PassId::A),
            "B" => Ok(PassId::B),
            "C" => Ok(PassId::C),
            other => Err(DescribeError::InvalidPass(other.to_string())),
        }
    }
}

// ============================================================================
// Image input
// ============================================================================

/// Image handed to the engine
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Identifier derived from the file stem
    pub image_id: String,
    /// Raw encoded image bytes (JPEG, PNG, ...)
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(image_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            image_id: image_id.into(),
            bytes,
        }
    }

    /// Read an image file, using its stem as `image_id`
    pub async fn from_path(path: &Path) -> vd_common::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let image_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                vd_common::Error::InvalidInput(format!("No file name in {}", path.display()))
            })?;
        Ok(Self { image_id, bytes })
    }

    /// Detected image MIME type, `None` when the bytes are not a known image format
    pub fn mime_type(&self) -> Option<&'static str> {
        infer::get(&self.bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
    }

    /// Base64 encoding of the image bytes
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL as accepted by OpenAI-style image inputs
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type().unwrap_or("image/jpeg"),
            self.base64()
        )
    }
}

// ============================================================================
// Backend payload
// ============================================================================

/// Raw backend payload for one pass
///
/// May be strict JSON, JSON inside prose or code fences, or no JSON at all.
/// Interpretation belongs to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub text: String,
}

impl RawResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
