//! Summary generator - derived fields of a merged record
//!
//! Runs once per image after the last merge. Pure: the same merged record and
//! the same image bytes always produce the same output.

use crate::record::{Colors, ConstructionSection, Record, SCHEMA_VERSION};
use sha2::{Digest, Sha256};

/// Separator between prompt sections
const SECTION_SEPARATOR: &str = "; ";

/// Separator between values inside one section
const FIELD_SEPARATOR: &str = ", ";

/// Compute all derived fields and stamp the schema tag
pub fn finalize(mut record: Record, image_bytes: &[u8]) -> Record {
    record.source_hash = Some(source_hash(image_bytes));
    record.color_palette = color_palette(&record.colors);
    record.prompt_text = prompt_text(&record);
    record.version = Some(SCHEMA_VERSION.to_string());
    record
}

/// SHA-256 hex digest of the image bytes
pub fn source_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Primary, secondary, then pattern colors, nulls skipped, duplicates dropped
pub fn color_palette(colors: &Colors) -> Vec<String> {
    let pattern = colors.pattern.as_ref();
    let candidates = [
        colors.primary.as_ref(),
        colors.secondary.as_ref(),
        pattern.and_then(|p| p.foreground.as_ref()),
        pattern.and_then(|p| p.background.as_ref()),
    ];

    let mut palette: Vec<String> = Vec::new();
    for color in candidates.into_iter().flatten() {
        if !palette.contains(color) {
            palette.push(color.clone());
        }
    }
    palette
}

/// Human-readable description line
///
/// Sections in fixed order: garment basics, fabric, colors/pattern,
/// construction, presentation. Sections with no values are omitted; `None` when
/// every section is empty.
pub fn prompt_text(record: &Record) -> Option<String> {
    let sections = [
        garment_section(record),
        fabric_section(record),
        color_section(record),
        construction_section(record),
        presentation_section(record),
    ];

    let joined = sections
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.join(FIELD_SEPARATOR))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);

    (!joined.is_empty()).then_some(joined)
}

/// Collects non-null values for one prompt section
#[derive(Default)]
struct Section(Vec<String>);

impl Section {
    fn add(&mut self, value: Option<&String>) {
        if let Some(value) = value {
            self.0.push(value.clone());
        }
    }

    fn add_labeled(&mut self, label: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.0.push(format!("{label}: {value}"));
        }
    }

    fn add_list(&mut self, label: &str, values: &[String]) {
        if !values.is_empty() {
            self.0.push(format!("{label}: {}", values.join(FIELD_SEPARATOR)));
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

fn garment_section(record: &Record) -> Section {
    let components = &record.garment_components;
    let mut section = Section::default();
    section.add(record.garment_type.as_ref());
    section.add(record.silhouette.as_ref());
    section.add(record.fit_and_drape.as_ref());
    section.add_labeled("top", record.garment.top.as_ref());
    section.add_labeled("bottom", record.garment.bottom.as_ref());
    section.add_labeled("top length", components.top_length.as_ref());
    section.add_labeled("bottom length", components.bottom_length.as_ref());
    section.add_list("layers", &components.layers);
    section
}

fn fabric_section(record: &Record) -> Section {
    let fabric = &record.fabric;
    let mut section = Section::default();
    section.add(fabric.kind.as_ref());
    section.add(fabric.texture.as_ref());
    section.add(fabric.weight.as_ref());
    section.add(fabric.finish.as_ref());
    section
}

fn color_section(record: &Record) -> Section {
    let colors = &record.colors;
    let mut section = Section::default();
    section.add(colors.primary.as_ref());
    section.add(colors.secondary.as_ref());
    if let Some(pattern) = &colors.pattern {
        section.add_labeled("pattern", pattern.kind.as_ref());
        section.add_labeled("pattern foreground", pattern.foreground.as_ref());
        section.add_labeled("pattern background", pattern.background.as_ref());
    }
    section
}

fn construction_section(record: &Record) -> Section {
    let construction = &record.construction;
    let mut section = Section::default();
    section.add(construction.seams.as_ref());
    section.add(construction.stitching.as_ref());
    section.add_labeled("stitching color", construction.stitching_color.as_ref());
    section.add(construction.hems.as_ref());
    section.add(construction.closure.as_ref());
    add_construction_piece(&mut section, "top", construction.top.as_ref());
    add_construction_piece(&mut section, "bottom", construction.bottom.as_ref());
    section
}

fn add_construction_piece(section: &mut Section, label: &str, piece: Option<&ConstructionSection>) {
    let Some(piece) = piece else {
        return;
    };
    let values: Vec<&str> = [
        &piece.seams,
        &piece.stitching,
        &piece.stitching_color,
        &piece.hems,
        &piece.closure,
    ]
    .into_iter()
    .filter_map(|v| v.as_deref())
    .collect();
    if !values.is_empty() {
        section.0.push(format!("{label} {}", values.join(" ")));
    }
}

fn presentation_section(record: &Record) -> Section {
    let camera = &record.camera;
    let lighting = &record.environment_lighting;
    let mut section = Section::default();
    section.add(record.pose.as_ref());
    section.add(record.photo_style.as_ref());
    section.add(record.model.framing.as_ref());
    section.add_labeled("expression", record.model.expression.as_ref());
    section.add_labeled("gaze", record.model.gaze.as_ref());
    if camera.multiview.as_deref() == Some("yes") {
        section.add_labeled("views", camera.views.as_ref());
    } else {
        section.add(camera.view.as_ref());
    }
    section.add(camera.angle.as_ref());
    section.add(lighting.setup.as_ref());
    section.add(lighting.mood.as_ref());
    section.add(lighting.background.as_ref());
    section.add(record.footwear.kind.as_ref());
    section.add_labeled("footwear color", record.footwear.color.as_ref());
    section.add_list("details", &record.details);
    section
}
