//! vd-describe - batch garment description CLI
//!
//! Describes one image or every image in a directory and writes:
//! - `<out>/json/<image_id>.json` per image
//! - `<out>/descriptors.csv`
//! - `<out>/prompt_text.txt`

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vd_engine::export::{write_json, CsvExporter, PromptExporter};
use vd_engine::{CliOverrides, Engine, EngineSettings, ImageInput};
use walkdir::WalkDir;

/// Image extensions picked up from an input directory
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

#[derive(Parser, Debug)]
#[command(name = "vd-describe")]
#[command(about = "Describe fashion photographs with a vision-language model")]
#[command(version)]
struct Args {
    /// Image file or directory of images
    #[arg(long = "in")]
    input: PathBuf,

    /// Output directory
    #[arg(long = "out")]
    output: PathBuf,

    /// Backend: stub, openai, gemini or local
    #[arg(long)]
    model: Option<String>,

    /// Comma-separated passes, e.g. "A,B,C" (A always runs)
    #[arg(long)]
    passes: Option<String>,

    /// Sanitize merged records
    #[arg(long, value_enum)]
    normalize: Option<YesNo>,

    /// TOML config file
    #[arg(long, env = "VD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = vd_common::config::load_config(args.config.as_deref());

    let default_filter = toml_config
        .as_ref()
        .ok()
        .and_then(|c| c.logging.level.clone())
        .unwrap_or_else(|| "vd_engine=info,vd_describe=info,vd_common=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vd-describe {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config = toml_config.context("Failed to load config")?;
    let cli = CliOverrides {
        backend: args.model.clone(),
        passes: args.passes.clone(),
        normalize: args.normalize.map(|n| matches!(n, YesNo::Yes)),
    };
    let settings = EngineSettings::resolve(&cli, &toml_config).context("Invalid configuration")?;
    let engine = Engine::from_settings(&settings).context("Failed to create backend")?;

    let images = collect_images(&args.input)?;
    if images.is_empty() {
        warn!(
            "No images found at {}. Use a file or a folder with .jpg/.png/.webp images.",
            args.input.display()
        );
        return Ok(());
    }
    info!(
        "Describing {} image(s) with {} backend, passes {:?}, normalize={}",
        images.len(),
        engine.backend_name(),
        Engine::plan_passes(&settings.passes),
        settings.normalize
    );

    let json_dir = args.output.join("json");
    let csv_path = args.output.join("descriptors.csv");
    let prompt_path = args.output.join("prompt_text.txt");
    let mut csv = CsvExporter::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    let mut prompts = PromptExporter::create(&prompt_path)
        .with_context(|| format!("Failed to create {}", prompt_path.display()))?;

    let mut failed = 0usize;
    for path in &images {
        let image = match ImageInput::from_path(path).await {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let description = match engine.describe_image(&image, &settings.passes).await {
            Ok(description) => description,
            Err(e) => {
                error!(image_id = %image.image_id, code = e.code(), "{}", e);
                failed += 1;
                continue;
            }
        };

        let record = &description.record;
        write_json(record, &json_dir)?;
        csv.write_record(record)?;
        prompts.append(record)?;

        let parse_failures = description.parse_failures().len();
        if parse_failures > 0 {
            warn!(image_id = %record.image_id, "{} pass(es) returned no usable JSON", parse_failures);
        }
    }

    let described = csv.rows();
    csv.finish()?;
    prompts.finish()?;

    info!("Wrote JSON → {}", json_dir.display());
    info!("CSV        → {}", csv_path.display());
    info!("Prompts    → {}", prompt_path.display());
    info!("{} described, {} failed", described, failed);

    if described == 0 {
        bail!("All {} image(s) failed", failed);
    }
    Ok(())
}

/// A single file, or the images directly inside a directory (sorted by name)
fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input path {} does not exist", input.display());
    }

    let images: Vec<PathBuf> = WalkDir::new(input)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();

    for (stem, paths) in duplicate_stems(&images) {
        let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        warn!(
            "Image id '{}' is shared by {}; json/{}.json will hold only the last one",
            stem,
            names.join(", "),
            stem
        );
    }
    Ok(images)
}

/// File stems used by more than one path, with those paths in input order
fn duplicate_stems(paths: &[PathBuf]) -> Vec<(String, Vec<&PathBuf>)> {
    let mut by_stem: BTreeMap<String, Vec<&PathBuf>> = BTreeMap::new();
    for path in paths {
        if let Some(stem) = path.file_stem() {
            by_stem
                .entry(stem.to_string_lossy().into_owned())
                .or_default()
                .push(path);
        }
    }
    by_stem.into_iter().filter(|(_, paths)| paths.len() > 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_duplicate_stems_reported() {
        let paths: Vec<PathBuf> = ["in/a.jpg", "in/a.png", "in/b.webp", "in/c.jpg", "in/c.JPEG"]
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let duplicates = duplicate_stems(&paths);
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].0, "a");
        assert_eq!(duplicates[0].1, vec![&paths[0], &paths[1]]);
        assert_eq!(duplicates[1].0, "c");
    }

    #[test]
    fn test_unique_stems_not_reported() {
        let paths = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        assert!(duplicate_stems(&paths).is_empty());
    }

    #[test]
    fn test_collect_images_keeps_duplicate_stems() {
        let dir = TempDir::new().unwrap();
        for name in ["look.jpg", "look.png", "notes.txt", "other.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let images = collect_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["look.jpg", "look.png", "other.webp"]);
        assert_eq!(duplicate_stems(&images).len(), 1);
    }
}
