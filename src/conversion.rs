//! Format conversions between the cleaned CSV table, COCO documents and
//! YOLO label files.
//!
//! Conventions used throughout: category ids are the fixed 1-based table in
//! the categories module; COCO bboxes are [x, y, width, height] with a
//! top-left corner; YOLO lines are normalized center form with 0-based class
//! indices derived from the category ids sorted ascending. Round-tripping
//! CSV -> COCO -> YOLO preserves geometry up to the 6-decimal rendering of
//! the YOLO stage.

use log::warn;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::categories;
use crate::coco::{Annotation, Category, CocoFile, CocoWriter, Image};
use crate::types::{CleanAnnotationRow, ImageMetaRecord};
use crate::utils::{create_progress_bar, ensure_directory};

/// Where image dimensions come from during CSV to COCO conversion: a
/// metadata lookup by file name, optionally backed by an operator-supplied
/// fallback size. With no fallback configured an unknown image is an error,
/// so a wrong normalization can never slip through silently.
#[derive(Debug, Clone, Default)]
pub struct DimensionSource {
    by_name: HashMap<String, (u32, u32)>,
    fallback: Option<(u32, u32)>,
}

impl DimensionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_image_meta(image_meta: &[ImageMetaRecord]) -> Self {
        Self {
            by_name: image_meta
                .iter()
                .map(|m| (m.image_name.clone(), (m.width, m.height)))
                .collect(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, width: u32, height: u32) -> Self {
        self.fallback = Some((width, height));
        self
    }

    pub fn dimensions_for(&self, file_name: &str) -> Result<(u32, u32), Box<dyn Error>> {
        if let Some(&dims) = self.by_name.get(file_name) {
            return Ok(dims);
        }
        if let Some(fallback) = self.fallback {
            return Ok(fallback);
        }
        Err(format!(
            "unknown image dimensions for '{file_name}'; \
             provide image metadata or an explicit fallback size"
        )
        .into())
    }
}

/// Convert cleaned CSV rows into a COCO document.
///
/// One images[] entry is created per unique image name, in first-seen row
/// order, regardless of whether any of that image's rows survive. Rows with
/// no resolvable class name are skipped and counted; annotation ids are
/// assigned sequentially from 1 in row order, so conversion is idempotent.
pub fn csv_to_coco(
    rows: &[CleanAnnotationRow],
    dimensions: &DimensionSource,
) -> Result<CocoFile, Box<dyn Error>> {
    let mut writer = CocoWriter::new();

    for row in rows {
        if let Some(name) = &row.image_name {
            if writer.image_id(name).is_none() {
                let (width, height) = dimensions.dimensions_for(name)?;
                writer.add_image(name.clone(), width, height);
            }
        }
    }

    let mut skipped = 0usize;
    for row in rows {
        let Some(name) = &row.image_name else {
            skipped += 1;
            continue;
        };
        let Some(class_name) = &row.class_name else {
            skipped += 1;
            continue;
        };
        let Some(category_id) = categories::category_id(class_name) else {
            warn!("unknown class name '{class_name}', skipping row");
            skipped += 1;
            continue;
        };
        let Some(image_id) = writer.image_id(name) else {
            continue;
        };

        let width = row.x_max - row.x_min;
        let height = row.y_max - row.y_min;
        writer.add_annotation(image_id, category_id, [row.x_min, row.y_min, width, height]);
    }

    if skipped > 0 {
        warn!("Skipped {skipped} rows without an image name or known class");
    }

    Ok(writer.into_coco(categories::coco_categories()))
}

/// Map category ids to 0-based YOLO class indices by sorting ids ascending.
pub fn yolo_index_map(coco_categories: &[Category]) -> HashMap<u32, usize> {
    let mut sorted: Vec<&Category> = coco_categories.iter().collect();
    sorted.sort_by_key(|category| category.id);
    sorted
        .iter()
        .enumerate()
        .map(|(index, category)| (category.id, index))
        .collect()
}

/// Render the YOLO label lines for one image. Annotations referencing a
/// category outside the document's table are dropped with a warning.
pub fn yolo_label_lines(
    image: &Image,
    annotations: &[&Annotation],
    index_map: &HashMap<u32, usize>,
) -> String {
    let mut lines = String::with_capacity(annotations.len() * 64);
    for annotation in annotations {
        let Some(&class_index) = index_map.get(&annotation.category_id) else {
            warn!(
                "annotation {} references unknown category {}, skipping",
                annotation.id, annotation.category_id
            );
            continue;
        };
        let [x, y, w, h] = annotation.bbox;
        let x_center = (x + w / 2.0) / image.width as f64;
        let y_center = (y + h / 2.0) / image.height as f64;
        let width = w / image.width as f64;
        let height = h / image.height as f64;
        lines.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            class_index, x_center, y_center, width, height
        ));
    }
    lines
}

/// Derive the label file name for an image: colons (invalid on Windows) are
/// replaced, the extension is swapped for `.txt`, and the remainder is
/// sanitized for the filesystem.
pub fn label_file_name(file_name: &str) -> String {
    let safe = file_name.replace(':', "_");
    let stem = Path::new(&safe)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| safe.clone());
    format!("{}.txt", sanitize_filename::sanitize(stem))
}

/// Write one YOLO label file per image in the document. Images with zero
/// annotations produce an empty label file rather than a missing one.
/// Returns the number of label files written.
pub fn coco_to_yolo(coco: &CocoFile, labels_dir: &Path) -> std::io::Result<usize> {
    ensure_directory(labels_dir)?;

    let index_map = yolo_index_map(&coco.categories);
    let mut by_image: HashMap<u32, Vec<&Annotation>> = HashMap::new();
    for annotation in &coco.annotations {
        by_image.entry(annotation.image_id).or_default().push(annotation);
    }

    let pb = create_progress_bar(coco.images.len() as u64, "Labels");
    for image in &coco.images {
        let annotations = by_image
            .get(&image.id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let lines = yolo_label_lines(image, annotations, &index_map);

        let label_path = labels_dir.join(label_file_name(&image.file_name));
        let mut writer = BufWriter::new(File::create(&label_path)?);
        writer.write_all(lines.as_bytes())?;
        writer.flush()?;
        pb.inc(1);
    }
    pb.finish_with_message("Label generation complete");

    Ok(coco.images.len())
}
