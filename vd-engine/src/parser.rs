//! Pass Parser - raw backend payload to partial record
//!
//! Each pass contributes a fixed set of field groups:
//! - **A:** garment_type, silhouette, fit_and_drape, fabric, garment,
//!   garment_components lengths, colors, footwear
//! - **B:** construction (global and top/bottom), garment_components.layers
//! - **C:** pose, photo_style, model, camera, environment_lighting, details
//!
//! `confidence` and `photo_metrics` are passed through from any pass. Keys
//! outside the pass's groups are ignored, missing keys stay `None`.
//!
//! Recovery: the first balanced JSON object in the payload is used, so prose
//! and markdown fences around it are tolerated. A payload with no recoverable
//! object yields an all-null partial plus a [`ParseFailure`].

use crate::normalize::{clean_list, clean_text};
use crate::record::{
    Camera, Colors, Construction, ConstructionSection, EnvironmentLighting, Fabric, Footwear,
    Garment, ModelPresentation, Pattern, Record,
};
use crate::types::{PassId, RawResponse};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Longest excerpt of an unparseable payload kept for diagnostics
const EXCERPT_CHARS: usize = 200;

type Object = Map<String, Value>;

/// Why a pass produced no usable JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseFailureReason {
    /// Backend returned nothing but whitespace
    EmptyResponse,
    /// No balanced `{...}` block deserialized as a JSON object
    NoJsonObject,
}

impl fmt::Display for ParseFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailureReason::EmptyResponse => write!(f, "empty response"),
            ParseFailureReason::NoJsonObject => write!(f, "no JSON object found"),
        }
    }
}

/// Structured parse-failure signal for one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub pass: PassId,
    pub reason: ParseFailureReason,
    /// Leading part of the payload (at most 200 characters)
    pub excerpt: String,
}

/// Result of parsing one pass
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Partial record; all-null when `failure` is set
    pub partial: Record,
    pub failure: Option<ParseFailure>,
}

/// Parse one pass's raw payload into a partial record
pub fn parse_pass(pass: PassId, raw: &RawResponse) -> ParseOutcome {
    let text = raw.text.trim();
    if text.is_empty() {
        return failed(pass, ParseFailureReason::EmptyResponse, text);
    }

    let Some(object) = extract_json_object(text) else {
        return failed(pass, ParseFailureReason::NoJsonObject, text);
    };

    let mut partial = Record::default();
    match pass {
        PassId::A => project_pass_a(&object, &mut partial),
        PassId::B => project_pass_b(&object, &mut partial),
        PassId::C => project_pass_c(&object, &mut partial),
    }
    partial.confidence = opaque(&object, "confidence");
    partial.photo_metrics = opaque(&object, "photo_metrics");

    debug!(
        pass = %pass,
        fields = partial.observed_fields(),
        "Parsed pass payload"
    );

    ParseOutcome {
        partial,
        failure: None,
    }
}

fn failed(pass: PassId, reason: ParseFailureReason, text: &str) -> ParseOutcome {
    ParseOutcome {
        partial: Record::default(),
        failure: Some(ParseFailure {
            pass,
            reason,
            excerpt: text.chars().take(EXCERPT_CHARS).collect(),
        }),
    }
}

// ============================================================================
// JSON recovery
// ============================================================================

/// Find the first balanced `{...}` block that deserializes as a JSON object
///
/// Brace matching skips braces inside string literals (with escapes). Blocks are
/// tried in order of their opening brace; when one fails to deserialize the
/// next is tried.
pub fn extract_json_object(text: &str) -> Option<Object> {
    balanced_spans(text.as_bytes())
        .into_iter()
        .find_map(|(start, end)| match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Every balanced `{...}` span as `(open, close)` byte indices, sorted by `open`
///
/// One forward scan with a stack of open-brace positions. Quotes only count
/// once a brace is open, so prose before the JSON cannot start a string.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open: Vec<usize> = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
}

// ============================================================================
// Lenient value coercion
// ============================================================================

/// Scalar leaf: strings are cleaned, numbers/bools stringified, arrays of
/// scalars joined with ", ", objects dropped
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => clean_text(s),
        Value::Number(n) => clean_text(&n.to_string()),
        Value::Bool(b) => clean_text(&b.to_string()),
        Value::Array(items) => {
            let parts = clean_list(items.iter().filter_map(Value::as_str));
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Sequence leaf: a bare scalar becomes a one-element sequence
fn sequence(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let texts: Vec<String> = items.iter().filter_map(|v| scalar(Some(v))).collect();
            clean_list(texts.iter().map(String::as_str))
        }
        Some(other) => scalar(Some(other)).into_iter().collect(),
        None => Vec::new(),
    }
}

fn child<'a>(object: &'a Object, key: &str) -> Option<&'a Object> {
    object.get(key).and_then(Value::as_object)
}

fn field(object: Option<&Object>, key: &str) -> Option<String> {
    scalar(object.and_then(|o| o.get(key)))
}

fn opaque(object: &Object, key: &str) -> Map<String, Value> {
    child(object, key).cloned().unwrap_or_default()
}

// ============================================================================
// Per-pass projection
// ============================================================================

fn project_pass_a(object: &Object, partial: &mut Record) {
    partial.garment_type = field(Some(object), "garment_type");
    partial.silhouette = field(Some(object), "silhouette");
    partial.fit_and_drape = field(Some(object), "fit_and_drape");

    let fabric = child(object, "fabric");
    partial.fabric = Fabric {
        kind: field(fabric, "type"),
        texture: field(fabric, "texture"),
        weight: field(fabric, "weight"),
        finish: field(fabric, "finish"),
    };

    let garment = child(object, "garment");
    partial.garment = Garment {
        top: field(garment, "top"),
        bottom: field(garment, "bottom"),
    };

    let components = child(object, "garment_components");
    partial.garment_components.top_length = field(components, "top_length");
    partial.garment_components.bottom_length = field(components, "bottom_length");

    let colors = child(object, "colors");
    let pattern = colors.and_then(|c| child(c, "pattern"));
    let pattern = Pattern {
        kind: field(pattern, "type"),
        foreground: field(pattern, "foreground"),
        background: field(pattern, "background"),
    };
    partial.colors = Colors {
        primary: field(colors, "primary"),
        secondary: field(colors, "secondary"),
        pattern: (pattern != Pattern::default()).then_some(pattern),
    };

    let footwear = child(object, "footwear");
    partial.footwear = Footwear {
        kind: field(footwear, "type"),
        color: field(footwear, "color"),
    };
}

fn project_pass_b(object: &Object, partial: &mut Record) {
    let construction = child(object, "construction");
    partial.construction = Construction {
        seams: field(construction, "seams"),
        stitching: field(construction, "stitching"),
        stitching_color: field(construction, "stitching_color"),
        hems: field(construction, "hems"),
        closure: field(construction, "closure"),
        top: construction.and_then(|c| section(c, "top")),
        bottom: construction.and_then(|c| section(c, "bottom")),
    };

    let components = child(object, "garment_components");
    partial.garment_components.layers = sequence(components.and_then(|c| c.get("layers")));
}

fn section(construction: &Object, key: &str) -> Option<ConstructionSection> {
    let object = child(construction, key);
    let section = ConstructionSection {
        seams: field(object, "seams"),
        stitching: field(object, "stitching"),
        stitching_color: field(object, "stitching_color"),
        hems: field(object, "hems"),
        closure: field(object, "closure"),
    };
    (section != ConstructionSection::default()).then_some(section)
}

fn project_pass_c(object: &Object, partial: &mut Record) {
    partial.pose = field(Some(object), "pose");
    partial.photo_style = field(Some(object), "photo_style");

    let model = child(object, "model");
    partial.model = ModelPresentation {
        framing: field(model, "framing"),
        expression: field(model, "expression"),
        gaze: field(model, "gaze"),
    };

    let camera = child(object, "camera");
    partial.camera = Camera {
        view: field(camera, "view"),
        multiview: field(camera, "multiview"),
        views: field(camera, "views"),
        angle: field(camera, "angle"),
    };

    let lighting = child(object, "environment_lighting");
    partial.environment_lighting = EnvironmentLighting {
        setup: field(lighting, "setup"),
        mood: field(lighting, "mood"),
        background: field(lighting, "background"),
    };

    partial.details = sequence(object.get("details"));
}
