//! CLI commands using clap

use crate::application::CarveError;
use crate::application::dto::{CarveOptions, OverlapPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// artefact - signature-based file carver
///
/// Recovers files embedded in disk images and memory dumps by scanning for
/// format signatures, without relying on filesystem metadata.
#[derive(Parser)]
#[command(name = "artefact")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Carve files out of raw disk images and memory dumps", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Carve files out of an input image
    Carve(CarveArgs),

    /// List supported formats
    ListFormats,
}

#[derive(Args, Debug, Clone)]
pub struct CarveArgs {
    /// Path to the image or dump to carve
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for carved files
    #[arg(short, long, default_value = "./carved")]
    pub output: PathBuf,

    /// Formats to carve (jpg, png, pdf, zip, gif, bmp, exe, doc, elf; jpeg on request)
    #[arg(short = 't', long, value_delimiter = ',')]
    pub types: Option<Vec<String>>,

    /// Fresh bytes read per window (e.g. 4M)
    #[arg(long, value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Bytes carried between windows (e.g. 1M)
    #[arg(long, value_parser = parse_size)]
    pub overlap: Option<u64>,

    /// Per-format size limit, as format=size (e.g. jpg=20M); repeatable
    #[arg(long = "max-size", value_parser = parse_max_size)]
    pub max_size: Vec<(String, u64)>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Carve windows one at a time on the current thread
    #[arg(long)]
    pub sequential: bool,

    /// Checkpoint file to resume from and keep up to date
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Bytes between checkpoints (e.g. 100M)
    #[arg(long, value_parser = parse_size)]
    pub checkpoint_interval: Option<u64>,

    /// Stop after this many artifacts
    #[arg(long)]
    pub max_artifacts: Option<u64>,

    /// Keep at most this many artifacts of each format
    #[arg(long)]
    pub max_per_format: Option<u64>,

    /// How to treat candidates inside an earlier artifact (independent, skip-contained)
    #[arg(long)]
    pub overlap_policy: Option<OverlapPolicy>,

    /// JSON file with carve options; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scan and report without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Memory-map the input instead of positional reads
    #[arg(long)]
    pub mmap: bool,

    /// Predict ends of size-less formats at the first zero-filled blocks
    #[arg(long)]
    pub entropy_predictor: bool,
}

impl CarveArgs {
    /// Builds session options: config file first, then flags
    pub fn to_options(&self) -> Result<CarveOptions, CarveError> {
        let mut options = match &self.config {
            Some(path) => CarveOptions::from_json_file(path)?,
            None => CarveOptions::default(),
        };

        if let Some(types) = &self.types {
            options.formats = types.iter().map(|t| t.trim().to_lowercase()).collect();
        }
        if let Some(size) = self.chunk_size {
            options.chunk_size = to_usize(size)?;
        }
        if let Some(size) = self.overlap {
            options.overlap_size = to_usize(size)?;
        }
        for (format_id, size) in &self.max_size {
            options.max_artifact_size.insert(format_id.clone(), *size);
        }
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        if self.sequential {
            options.parallel = false;
        }
        if let Some(path) = &self.resume {
            options.resume_path = Some(path.clone());
        }
        if let Some(interval) = self.checkpoint_interval {
            options.checkpoint_interval = interval;
        }
        if let Some(limit) = self.max_artifacts {
            options.max_total = Some(limit);
        }
        if let Some(limit) = self.max_per_format {
            options.max_per_format = Some(limit);
        }
        if let Some(policy) = self.overlap_policy {
            options.overlap_policy = policy;
        }

        Ok(options)
    }
}

fn to_usize(size: u64) -> Result<usize, CarveError> {
    usize::try_from(size).map_err(|_| CarveError::Config(format!("{} bytes is too large", size)))
}

/// Parses a byte count with an optional binary suffix: `512`, `64K`,
/// `4M`, `1G` (`KiB`/`MiB`/`GiB` also accepted)
pub fn parse_size(text: &str) -> Result<u64, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{}'", text))?;
    let multiplier: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1 << 10,
        "M" | "MB" | "MIB" => 1 << 20,
        "G" | "GB" | "GIB" => 1 << 30,
        other => return Err(format!("unknown size suffix '{}'", other)),
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' overflows", text))
}

/// Parses `format=size`
pub fn parse_max_size(text: &str) -> Result<(String, u64), String> {
    let (format_id, size) = text
        .split_once('=')
        .ok_or_else(|| format!("expected format=size, got '{}'", text))?;
    Ok((format_id.trim().to_lowercase(), parse_size(size)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_accept_binary_suffixes() {
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("64K"), Ok(64 * 1024));
        assert_eq!(parse_size("4MiB"), Ok(4 * 1024 * 1024));
        assert_eq!(parse_size("1g"), Ok(1 << 30));
        assert!(parse_size("12X").is_err());
        assert!(parse_size("M").is_err());
    }

    #[test]
    fn max_size_pairs() {
        assert_eq!(parse_max_size("JPG=2M"), Ok(("jpg".to_string(), 2 << 20)));
        assert!(parse_max_size("jpg").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "artefact",
            "carve",
            "-i",
            "disk.img",
            "-t",
            "jpg,png",
            "--chunk-size",
            "2M",
            "--max-size",
            "png=1M",
            "--sequential",
            "--overlap-policy",
            "skip-contained",
        ]);
        let Commands::Carve(args) = cli.command else {
            panic!("expected carve");
        };
        let options = args.to_options().unwrap();
        assert_eq!(options.formats, vec!["jpg", "png"]);
        assert_eq!(options.chunk_size, 2 << 20);
        assert_eq!(options.max_artifact_size["png"], 1 << 20);
        assert!(!options.parallel);
        assert_eq!(options.overlap_policy, OverlapPolicy::SkipContained);
    }
}
