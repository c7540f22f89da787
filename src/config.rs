use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use crate::quality::DEFAULT_SCORE_THRESHOLD;

/// Command-line arguments for cleaning the raw annotation exports into the
/// training CSV.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct CleanArgs {
    /// CSV of raw crowd annotations
    #[arg(long = "annotations")]
    pub annotations: PathBuf,

    /// CSV of (user, image) submission states
    #[arg(long = "submissions")]
    pub submissions: PathBuf,

    /// CSV of image metadata (file names and dimensions)
    #[arg(long = "image_meta")]
    pub image_meta: PathBuf,

    /// CSV of annotator progression scores
    #[arg(long = "scores")]
    pub scores: PathBuf,

    /// Output path for the cleaned training CSV
    #[arg(short = 'o', long = "output", default_value = "train_annotations.csv")]
    pub output: PathBuf,

    /// Minimum latest progression score an annotator must hold
    #[arg(long = "score_threshold", default_value_t = DEFAULT_SCORE_THRESHOLD, value_parser = validate_ratio)]
    pub score_threshold: f64,
}

/// Command-line arguments for converting the cleaned CSV into a COCO
/// document plus the YOLO dataset descriptor.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct CsvToCocoArgs {
    /// Cleaned annotation CSV to convert
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output path for the COCO JSON
    #[arg(short = 'o', long = "output", default_value = "annotations/train.json")]
    pub output: PathBuf,

    /// Optional image metadata CSV supplying real image dimensions
    #[arg(long = "image_meta")]
    pub image_meta: Option<PathBuf>,

    /// Fallback image size (WxH) for images without metadata; without it,
    /// unknown dimensions abort the conversion
    #[arg(long = "fallback_size", value_parser = parse_size)]
    pub fallback_size: Option<(u32, u32)>,

    /// Where to write the YOLO dataset descriptor; skipped when absent
    #[arg(long = "dataset_yaml")]
    pub dataset_yaml: Option<PathBuf>,

    /// Train image path recorded in the dataset descriptor
    #[arg(long = "train_path", default_value = "../images/train")]
    pub train_path: String,

    /// Optional val image path recorded in the dataset descriptor
    #[arg(long = "val_path")]
    pub val_path: Option<String>,
}

/// Command-line arguments for expanding a COCO document into per-image
/// YOLO label files.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct CocoToYoloArgs {
    /// COCO JSON document to convert
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Directory to write the per-image label files into
    #[arg(short = 'l', long = "labels_dir")]
    pub labels_dir: PathBuf,
}

/// Command-line arguments for exporting only high-agreement annotations to
/// COCO.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct AgreementArgs {
    /// CSV of raw crowd annotations
    #[arg(long = "annotations")]
    pub annotations: PathBuf,

    /// CSV holding the annotator agreement matrix
    #[arg(long = "matrix")]
    pub matrix: PathBuf,

    /// Optional image metadata CSV supplying file names and dimensions
    #[arg(long = "image_meta")]
    pub image_meta: Option<PathBuf>,

    /// Fallback image size (WxH) for images without metadata
    #[arg(long = "fallback_size", value_parser = parse_size)]
    pub fallback_size: Option<(u32, u32)>,

    /// Output path for the COCO JSON
    #[arg(short = 'o', long = "output", default_value = "high_agreement.json")]
    pub output: PathBuf,
}

/// Command-line arguments for turning per-image detector output into a
/// COCO prediction document.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct PredictionsArgs {
    /// Directory of images the detector ran over
    #[arg(short = 'd', long = "image_dir")]
    pub image_dir: PathBuf,

    /// Directory of per-image `<stem>_predictions.json` files
    #[arg(long = "predictions_dir")]
    pub predictions_dir: PathBuf,

    /// Output path for the COCO JSON
    #[arg(short = 'o', long = "output", default_value = "output.json")]
    pub output: PathBuf,

    /// Detections below this confidence are dropped
    #[arg(long = "min_confidence", default_value_t = crate::detector::DEFAULT_MIN_CONFIDENCE, value_parser = validate_ratio)]
    pub min_confidence: f64,
}

// Validate that a ratio-valued argument is between 0.0 and 1.0
pub fn validate_ratio(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("VALUE must be between 0.0 and 1.0".to_string()),
    }
}

// Parse a "WxH" image size argument
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| "SIZE must look like 1920x1080".to_string())?;
    let width = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    Ok((width, height))
}
