//! Value normalization and record sanitization
//!
//! - [`clean_text`] turns one raw model string into a canonical value or `None`
//! - [`clean_list`] does the same for sequences and removes duplicates
//! - [`sanitize`] resolves contradictions inside a merged record
//!
//! Nothing here invents a value the model did not report.

use crate::record::{Construction, ConstructionSection, Record};
use tracing::debug;

/// Tokens models emit when they mean "unknown"
const PLACEHOLDERS: [&str; 4] = ["null", "none", "string or null", "n/a"];

/// Phrase variants rewritten to a canonical spelling (matched on word boundaries)
const VOCABULARY: [(&str, &str); 6] = [
    ("three quarter", "three-quarter"),
    ("3/4", "three-quarter"),
    ("full body", "full-body"),
    ("semi gloss", "semi-gloss"),
    ("satin finish", "satin"),
    ("mat", "matte"),
];

/// Canonicalize one string value
///
/// Returns `None` for blank strings and placeholder tokens.
pub fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return None;
    }

    let mut text = trimmed.replace(['\u{2013}', '\u{2014}'], "-");
    for (variant, canonical) in VOCABULARY {
        text = replace_phrase(&text, variant, canonical);
    }
    Some(text)
}

/// Clean every entry, dropping blanks, placeholders and duplicates (first seen wins)
pub fn clean_list<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in raw.into_iter().filter_map(clean_text) {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'/'
}

/// Replace ASCII `phrase` (lowercase) wherever it occurs as a whole word, ignoring case
fn replace_phrase(text: &str, phrase: &str, canonical: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(pos) = lower[cursor..].find(phrase) {
        let start = cursor + pos;
        let end = start + phrase.len();
        let bounded_before = start == 0 || !is_word_byte(bytes[start - 1]);
        let bounded_after = end == bytes.len() || !is_word_byte(bytes[end]);

        out.push_str(&text[cursor..start]);
        if bounded_before && bounded_after {
            out.push_str(canonical);
        } else {
            out.push_str(&text[start..end]);
        }
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

// ============================================================================
// Record sanitization
// ============================================================================

/// Resolve contradictions in a merged record
///
/// - a global construction value that disagrees with the per-piece sections is cleared
/// - a closure that says both "button" and "no button"/"hidden" is cleared
/// - details that contradict an explicit top/bottom length are dropped
pub fn sanitize(mut record: Record) -> Record {
    resolve_construction(&mut record.construction);
    enforce_lengths(&mut record);
    record
}

fn resolve_construction(construction: &mut Construction) {
    let top = construction.top.clone().unwrap_or_default();
    let bottom = construction.bottom.clone().unwrap_or_default();

    let global_fields: [(&str, &mut Option<String>, &Option<String>, &Option<String>); 4] = [
        ("seams", &mut construction.seams, &top.seams, &bottom.seams),
        ("stitching", &mut construction.stitching, &top.stitching, &bottom.stitching),
        ("hems", &mut construction.hems, &top.hems, &bottom.hems),
        ("closure", &mut construction.closure, &top.closure, &bottom.closure),
    ];

    for (name, global, top_value, bottom_value) in global_fields {
        if top_value.is_none() && bottom_value.is_none() {
            continue;
        }
        let conflicts = global
            .as_ref()
            .is_some_and(|g| Some(g) != top_value.as_ref() && Some(g) != bottom_value.as_ref());
        if conflicts {
            debug!("Clearing global construction.{} in favour of section values", name);
            *global = None;
        }
    }

    clear_vague_closure(&mut construction.closure);
    for section in [&mut construction.top, &mut construction.bottom]
        .into_iter()
        .flatten()
    {
        clear_vague_closure(&mut section.closure);
    }
    drop_empty_section(&mut construction.top);
    drop_empty_section(&mut construction.bottom);
}

fn clear_vague_closure(closure: &mut Option<String>) {
    let vague = closure.as_deref().is_some_and(|c| {
        let c = c.to_lowercase();
        c.contains("button") && (c.contains("no button") || c.contains("hidden"))
    });
    if vague {
        debug!("Clearing vague closure {:?}", closure);
        *closure = None;
    }
}

fn drop_empty_section(section: &mut Option<ConstructionSection>) {
    if section.as_ref() == Some(&ConstructionSection::default()) {
        *section = None;
    }
}

fn enforce_lengths(record: &mut Record) {
    let components = &record.garment_components;
    let conflicting: [(&Option<String>, &str); 2] = [
        (&components.top_length, "cropped"),
        (&components.bottom_length, "midi"),
    ];

    for (length, keyword) in conflicting {
        let Some(length) = length.as_deref() else {
            continue;
        };
        if length.eq_ignore_ascii_case(keyword) {
            continue;
        }
        record
            .details
            .retain(|detail| !detail.to_lowercase().contains(keyword));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_become_none() {
        assert_eq!(clean_text("null"), None);
        assert_eq!(clean_text(" None "), None);
        assert_eq!(clean_text("String or null"), None);
        assert_eq!(clean_text("N/A"), None);
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text(""), None);
    }

    #[test]
    fn test_vocabulary_on_word_boundaries() {
        assert_eq!(clean_text("Three quarter view").as_deref(), Some("three-quarter view"));
        assert_eq!(clean_text("3/4 length").as_deref(), Some("three-quarter length"));
        assert_eq!(clean_text("full body").as_deref(), Some("full-body"));
        assert_eq!(clean_text("mat").as_deref(), Some("matte"));
        assert_eq!(clean_text("matte").as_deref(), Some("matte"));
        assert_eq!(clean_text("format").as_deref(), Some("format"));
        assert_eq!(clean_text("semi glossy").as_deref(), Some("semi glossy"));
    }

    #[test]
    fn test_dashes_normalized() {
        assert_eq!(clean_text("fit\u{2013}and\u{2014}flare").as_deref(), Some("fit-and-flare"));
    }

    #[test]
    fn test_clean_list_dedups() {
        let list = clean_list(["zipper", " zipper ", "null", "", "ring pull"]);
        assert_eq!(list, vec!["zipper", "ring pull"]);
    }

    #[test]
    fn test_section_detail_beats_global_summary() {
        let mut record = Record::new("set");
        record.construction.closure = Some("buttons".into());
        record.construction.seams = Some("panel seams".into());
        record.construction.top = Some(ConstructionSection {
            closure: Some("zipper".into()),
            seams: Some("panel seams".into()),
            ..Default::default()
        });
        record.construction.bottom = Some(ConstructionSection {
            closure: Some("elastic waist".into()),
            ..Default::default()
        });

        let record = sanitize(record);
        assert_eq!(record.construction.closure, None);
        assert_eq!(record.construction.seams.as_deref(), Some("panel seams"));
    }

    #[test]
    fn test_vague_closure_cleared() {
        let mut record = Record::new("coat");
        record.construction.closure = Some("hidden button placket".into());
        record.construction.top = Some(ConstructionSection {
            closure: Some("no buttons".into()),
            ..Default::default()
        });

        let record = sanitize(record);
        assert_eq!(record.construction.closure, None);
        // Section left with no values collapses to None
        assert_eq!(record.construction.top, None);
    }

    #[test]
    fn test_contradicting_length_details_dropped() {
        let mut record = Record::new("skirt");
        record.garment_components.bottom_length = Some("floor".into());
        record.details = vec!["midi hem".into(), "side slit".into()];

        let record = sanitize(record);
        assert_eq!(record.details, vec!["side slit"]);
    }

    #[test]
    fn test_sanitize_never_invents() {
        let record = sanitize(Record::new("blank"));
        assert!(record.is_blank());
    }
}
