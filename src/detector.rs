//! Inference adapter: the external-detector boundary and the directory run
//! that turns its per-image output into a COCO prediction document.
//!
//! The detector itself is a collaborator behind a trait; this crate never
//! embeds a model runtime. The shipped implementation reads per-image
//! prediction JSON produced by an external model run.

use glob::glob;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::categories;
use crate::coco::{CocoFile, CocoWriter};
use crate::utils::create_progress_bar;

// Image extensions scanned during a directory run.
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "jpeg", "jpg", "png"];

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// A detected box given as two corner points in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// One detection from the external model: corner box, the model's internal
/// 0-based class index, and a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub corner_box: CornerBox,
    pub class_index: usize,
    pub confidence: f64,
}

/// The external detector boundary. Implementations take an image path and
/// return that image's detections; everything behind this call is a black
/// box to the pipeline.
pub trait Detector {
    fn detect(&mut self, image_path: &Path) -> std::io::Result<Vec<Detection>>;
}

/// Detector backed by per-image prediction files: for `frame.jpg` it reads
/// `frame_predictions.json` from the predictions directory. A missing file
/// means zero detections for that image, not an error.
pub struct JsonPredictionSource {
    predictions_dir: PathBuf,
}

impl JsonPredictionSource {
    pub fn new(predictions_dir: impl Into<PathBuf>) -> Self {
        Self {
            predictions_dir: predictions_dir.into(),
        }
    }
}

impl Detector for JsonPredictionSource {
    fn detect(&mut self, image_path: &Path) -> std::io::Result<Vec<Detection>> {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prediction_path = self.predictions_dir.join(format!("{stem}_predictions.json"));
        if !prediction_path.exists() {
            warn!(
                "no prediction file for {}, assuming zero detections",
                image_path.display()
            );
            return Ok(Vec::new());
        }

        let file = File::open(&prediction_path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Collect the image files of a directory, sorted by path for deterministic
/// image-id assignment.
fn collect_image_files(image_dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut files = Vec::new();
    for extension in IMAGE_EXTENSIONS {
        let pattern = format!("{}/*.{}", image_dir.display(), extension);
        for entry in glob(&pattern)? {
            files.push(entry?);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the detector over every image in a directory and emit one COCO
/// document. Image dimensions are read from the file headers, detections
/// below `min_confidence` are dropped, and class indices outside the
/// category table map to the "Others" fallback. Images with no detections
/// still get an images[] entry.
pub fn predict_directory<D: Detector>(
    detector: &mut D,
    image_dir: &Path,
    min_confidence: f64,
) -> Result<CocoFile, Box<dyn Error>> {
    if !image_dir.is_dir() {
        return Err(format!("input directory '{}' does not exist", image_dir.display()).into());
    }

    let image_files = collect_image_files(image_dir)?;
    let pb = create_progress_bar(image_files.len() as u64, "Predict");

    let mut writer = CocoWriter::new();
    for image_path in &image_files {
        let size = imagesize::size(image_path)
            .map_err(|e| format!("failed to read dimensions of {}: {e}", image_path.display()))?;
        let file_name = image_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image_id = writer.add_image(file_name, size.width as u32, size.height as u32);

        for detection in detector.detect(image_path)? {
            if detection.confidence < min_confidence {
                continue;
            }
            let CornerBox { x1, y1, x2, y2 } = detection.corner_box;
            let category_id = categories::category_for_class_index(detection.class_index);
            writer.add_annotation(image_id, category_id, [x1, y1, x2 - x1, y2 - y1]);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Prediction export complete");

    Ok(writer.into_coco(categories::coco_categories()))
}
