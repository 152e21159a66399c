//! Record exports
//!
//! - [`flatten`]: one tabular row with dotted column names in a fixed order
//! - [`CsvExporter`]: header once, then one quoted row per record
//! - [`write_json`]: one pretty-printed JSON document per image
//! - [`PromptExporter`]: one prompt line per image

use crate::record::{ConstructionSection, Record};
use crate::summary;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use vd_common::Result;

/// Column order of the flattened row
const COLUMNS: [&str; 42] = [
    "image_id",
    "garment_type",
    "silhouette",
    "fit_and_drape",
    "fabric.type",
    "fabric.texture",
    "fabric.weight",
    "fabric.finish",
    "garment.top",
    "garment.bottom",
    "garment_components.layers",
    "garment_components.top_length",
    "garment_components.bottom_length",
    "colors.primary",
    "colors.secondary",
    "colors.pattern.type",
    "colors.pattern.foreground",
    "colors.pattern.background",
    "color_palette",
    "construction.seams",
    "construction.stitching",
    "construction.stitching_color",
    "construction.hems",
    "construction.closure",
    "construction.top",
    "construction.bottom",
    "pose",
    "photo_style",
    "environment_lighting.setup",
    "environment_lighting.mood",
    "environment_lighting.background",
    "footwear.type",
    "footwear.color",
    "details",
    "source_hash",
    "model.framing",
    "model.expression",
    "model.gaze",
    "camera.view",
    "camera.multiview",
    "camera.views",
    "camera.angle",
];

/// Column names of the flattened row, in order
pub fn columns() -> &'static [&'static str] {
    &COLUMNS
}

/// Flatten a record into `(column, cell)` pairs
///
/// Null leaves become empty cells; sequences are joined with ", ".
pub fn flatten(record: &Record) -> Vec<(&'static str, String)> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let list = |v: &[String]| v.join(", ");
    let pattern = record.colors.pattern.clone().unwrap_or_default();
    let construction = &record.construction;

    let cells = [
        record.image_id.clone(),
        text(&record.garment_type),
        text(&record.silhouette),
        text(&record.fit_and_drape),
        text(&record.fabric.kind),
        text(&record.fabric.texture),
        text(&record.fabric.weight),
        text(&record.fabric.finish),
        text(&record.garment.top),
        text(&record.garment.bottom),
        list(&record.garment_components.layers),
        text(&record.garment_components.top_length),
        text(&record.garment_components.bottom_length),
        text(&record.colors.primary),
        text(&record.colors.secondary),
        text(&pattern.kind),
        text(&pattern.foreground),
        text(&pattern.background),
        list(&record.color_palette),
        text(&construction.seams),
        text(&construction.stitching),
        text(&construction.stitching_color),
        text(&construction.hems),
        text(&construction.closure),
        section_cell(construction.top.as_ref()),
        section_cell(construction.bottom.as_ref()),
        text(&record.pose),
        text(&record.photo_style),
        text(&record.environment_lighting.setup),
        text(&record.environment_lighting.mood),
        text(&record.environment_lighting.background),
        text(&record.footwear.kind),
        text(&record.footwear.color),
        list(&record.details),
        text(&record.source_hash),
        text(&record.model.framing),
        text(&record.model.expression),
        text(&record.model.gaze),
        text(&record.camera.view),
        text(&record.camera.multiview),
        text(&record.camera.views),
        text(&record.camera.angle),
    ];

    COLUMNS.into_iter().zip(cells).collect()
}

/// `key: value` pairs of one construction section, joined with "; "
fn section_cell(section: Option<&ConstructionSection>) -> String {
    let Some(section) = section else {
        return String::new();
    };
    [
        ("seams", &section.seams),
        ("stitching", &section.stitching),
        ("stitching_color", &section.stitching_color),
        ("hems", &section.hems),
        ("closure", &section.closure),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v}")))
    .collect::<Vec<_>>()
    .join("; ")
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// CSV writer for flattened records
pub struct CsvExporter<W: Write> {
    writer: W,
    header_written: bool,
    rows: usize,
}

impl CsvExporter<BufWriter<File>> {
    /// Create (or truncate) a CSV file, creating parent directories
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            rows: 0,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            let header: Vec<String> = COLUMNS.iter().map(|c| quote(c)).collect();
            writeln!(self.writer, "{}", header.join(","))?;
            self.header_written = true;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_header()?;
        let row: Vec<String> = flatten(record).iter().map(|(_, cell)| quote(cell)).collect();
        writeln!(self.writer, "{}", row.join(","))?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far (header excluded)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write the header if no record was written, flush, and return the writer
    pub fn finish(mut self) -> Result<W> {
        self.write_header()?;
        self.writer.flush()?;
        debug!("CSV export finished with {} rows", self.rows);
        Ok(self.writer)
    }
}

/// Write `<dir>/<image_id>.json`, creating `dir` if needed
pub fn write_json(record: &Record, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", record.image_id));
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&path, json + "\n")?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Single-line prompt for a record
///
/// Uses the finalized `prompt_text`, deriving it when absent. Line breaks are
/// folded to spaces so one record is always one line.
pub fn prompt_line(record: &Record) -> String {
    let text = match &record.prompt_text {
        Some(text) => text.clone(),
        None => summary::prompt_text(record).unwrap_or_default(),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Appends one prompt line per record to a text file
pub struct PromptExporter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl PromptExporter {
    /// Start a fresh prompt file, replacing any previous one
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn append(&mut self, record: &Record) -> Result<()> {
        writeln!(self.writer, "{}", prompt_line(record))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut record = Record::new("look1");
        record.garment_type = Some("dress".into());
        record.details = vec!["ring pull".into(), "say \"hi\"".into()];
        record.construction.top = Some(ConstructionSection {
            closure: Some("zipper".into()),
            hems: Some("raw".into()),
            ..Default::default()
        });
        record
    }

    #[test]
    fn test_flatten_order_and_cells() {
        let row = flatten(&sample());
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], ("image_id", "look1".to_string()));
        assert_eq!(row.last().map(|(c, _)| *c), Some("camera.angle"));

        let cell = |name: &str| row.iter().find(|(c, _)| *c == name).map(|(_, v)| v.clone());
        assert_eq!(cell("garment_type").as_deref(), Some("dress"));
        assert_eq!(cell("silhouette").as_deref(), Some(""));
        assert_eq!(cell("details").as_deref(), Some("ring pull, say \"hi\""));
        assert_eq!(cell("construction.top").as_deref(), Some("hems: raw; closure: zipper"));
    }

    #[test]
    fn test_csv_quotes_and_single_header() {
        let mut exporter = CsvExporter::new(Vec::new());
        exporter.write_record(&sample()).unwrap();
        exporter.write_record(&Record::new("look2")).unwrap();
        assert_eq!(exporter.rows(), 2);
        let out = String::from_utf8(exporter.finish().unwrap()).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\"image_id\",\"garment_type\""));
        assert!(lines[1].contains("\"ring pull, say \"\"hi\"\"\""));
        assert!(lines[2].starts_with("\"look2\",\"\""));
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let out = CsvExporter::new(Vec::new()).finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_prompt_line_single_line() {
        let mut record = Record::new("x");
        record.prompt_text = Some("dress,\nsheath".into());
        assert_eq!(prompt_line(&record), "dress, sheath");

        let derived = sample();
        assert_eq!(prompt_line(&derived), summary::prompt_text(&derived).unwrap());
    }
}
