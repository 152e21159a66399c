//! Per-pass prompt templates
//!
//! Static configuration data. Each pass asks for the JSON shape that the
//! parser reads for that pass; the TOML `[prompts]` section can override them.

use crate::types::PassId;
use vd_common::config::PromptConfig;

/// System instruction shared by every pass and backend
pub const SYSTEM_PROMPT: &str = "You are an expert fashion analyst and technical designer. \
Return STRICT JSON only, with no text outside the JSON object. \
If you are unsure about a field, use null. Do not guess.";

const PASS_A_PROMPT: &str = r#"Analyze the garment in this fashion photograph and return JSON with this shape:
{
  "garment_type": string|null,
  "silhouette": string|null,
  "fit_and_drape": string|null,
  "fabric": {"type": string|null, "texture": string|null, "weight": string|null, "finish": string|null},
  "garment": {"top": string|null, "bottom": string|null},
  "garment_components": {"top_length": string|null, "bottom_length": string|null},
  "colors": {
    "primary": string|null,
    "secondary": string|null,
    "pattern": {"type": string|null, "foreground": string|null, "background": string|null} | null
  },
  "footwear": {"type": string|null, "color": string|null},
  "confidence": {"<field>": number}
}
Use specific color shades (e.g. "royal purple", "navy", "burgundy").
Only set a pattern when it is clearly visible."#;

const PASS_B_PROMPT: &str = r#"Focus ONLY on construction details: seam types, stitching, stitching color, hems and closures.
Return JSON with this shape:
{
  "construction": {
    "seams": string|null, "stitching": string|null, "stitching_color": string|null,
    "hems": string|null, "closure": string|null,
    "top": {"seams": string|null, "stitching": string|null, "stitching_color": string|null, "hems": string|null, "closure": string|null} | null,
    "bottom": {"seams": string|null, "stitching": string|null, "stitching_color": string|null, "hems": string|null, "closure": string|null} | null
  },
  "garment_components": {"layers": [string]},
  "confidence": {"<field>": number}
}
Use "top" and "bottom" only for garments with separately describable pieces."#;

const PASS_C_PROMPT: &str = r#"Focus ONLY on photography and presentation: pose, model framing, camera and lighting.
Return JSON with this shape:
{
  "pose": string|null,
  "photo_style": string|null,
  "model": {"framing": string|null, "expression": string|null, "gaze": string|null},
  "camera": {"view": string|null, "multiview": "yes"|"no"|null, "views": string|null, "angle": string|null},
  "environment_lighting": {"setup": string|null, "mood": string|null, "background": string|null},
  "details": [string],
  "photo_metrics": {"<metric>": number},
  "confidence": {"<field>": number}
}"#;

/// Prompt text for each pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub a: String,
    pub b: String,
    pub c: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            a: PASS_A_PROMPT.to_string(),
            b: PASS_B_PROMPT.to_string(),
            c: PASS_C_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in prompts with any non-blank TOML overrides applied
    pub fn with_overrides(overrides: &PromptConfig) -> Self {
        let pick = |custom: &Option<String>, default: &str| {
            custom
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            a: pick(&overrides.a, PASS_A_PROMPT),
            b: pick(&overrides.b, PASS_B_PROMPT),
            c: pick(&overrides.c, PASS_C_PROMPT),
        }
    }

    pub fn for_pass(&self, pass: PassId) -> &str {
        match pass {
            PassId::A => &self.a,
            PassId::B => &self.b,
            PassId::C => &self.c,
        }
    }
}
