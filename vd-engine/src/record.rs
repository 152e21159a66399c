//! Garment record model
//!
//! A [`Record`] is the output unit for one analyzed image. Every leaf is
//! optional: `None` means "no signal for this attribute", never an error.
//! Partial records produced by single passes share the same shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema tag stamped on every finalized record
pub const SCHEMA_VERSION: &str = "vd_v1.0.0";

/// Opaque pass-through mapping (confidence, photo metrics)
pub type OpaqueMap = Map<String, Value>;

/// Canonical record for one analyzed image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    // Identification
    pub image_id: String,
    pub source_hash: Option<String>,
    pub version: Option<String>,

    // Classification
    pub garment_type: Option<String>,
    pub silhouette: Option<String>,
    pub fit_and_drape: Option<String>,

    pub fabric: Fabric,
    pub garment: Garment,
    pub garment_components: GarmentComponents,
    pub colors: Colors,
    /// Derived from `colors` after merge
    pub color_palette: Vec<String>,
    pub construction: Construction,

    // Presentation
    pub pose: Option<String>,
    pub photo_style: Option<String>,
    pub model: ModelPresentation,
    pub camera: Camera,
    pub environment_lighting: EnvironmentLighting,
    pub footwear: Footwear,
    pub details: Vec<String>,

    // Derived / pass-through
    pub prompt_text: Option<String>,
    pub confidence: OpaqueMap,
    pub photo_metrics: OpaqueMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fabric {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub texture: Option<String>,
    pub weight: Option<String>,
    pub finish: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Garment {
    pub top: Option<String>,
    pub bottom: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarmentComponents {
    pub top_length: Option<String>,
    pub bottom_length: Option<String>,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub pattern: Option<Pattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub foreground: Option<String>,
    pub background: Option<String>,
}

/// Construction details for the whole garment, with optional per-piece sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Construction {
    pub seams: Option<String>,
    pub stitching: Option<String>,
    pub stitching_color: Option<String>,
    pub hems: Option<String>,
    pub closure: Option<String>,
    /// Upper piece of a two-piece garment; `None` for single-piece garments
    pub top: Option<ConstructionSection>,
    pub bottom: Option<ConstructionSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionSection {
    pub seams: Option<String>,
    pub stitching: Option<String>,
    pub stitching_color: Option<String>,
    pub hems: Option<String>,
    pub closure: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPresentation {
    pub framing: Option<String>,
    pub expression: Option<String>,
    pub gaze: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub view: Option<String>,
    pub multiview: Option<String>,
    pub views: Option<String>,
    pub angle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentLighting {
    pub setup: Option<String>,
    pub mood: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Footwear {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
}

impl Record {
    /// Empty accumulator for one image
    pub fn new(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            ..Default::default()
        }
    }

    /// Number of observed leaves (non-null scalars plus sequence entries)
    ///
    /// `image_id` is not counted. Opaque maps count one per key.
    pub fn observed_fields(&self) -> usize {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .iter()
                .filter(|(key, _)| key.as_str() != "image_id")
                .map(|(key, value)| match key.as_str() {
                    "confidence" | "photo_metrics" => value.as_object().map_or(0, Map::len),
                    _ => count_leaves(value),
                })
                .sum(),
            _ => 0,
        }
    }

    /// True when no leaf carries a value
    pub fn is_blank(&self) -> bool {
        self.observed_fields() == 0
    }

    /// Every string leaf in the record, including sequence entries
    ///
    /// Used to check the "no empty strings" invariant.
    pub fn string_leaves(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Ok(value) = serde_json::to_value(self) {
            collect_strings(&value, &mut out);
        }
        out
    }
}

fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.iter().map(count_leaves).sum(),
        Value::Object(map) => map.values().map(count_leaves).sum(),
        _ => 1,
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
