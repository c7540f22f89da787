//! COCO format data structures and the writer that assigns document ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// COCO category information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u32,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn new(id: u32, file_name: String, width: u32, height: u32) -> Self {
        Self {
            id,
            file_name,
            width,
            height,
        }
    }
}

/// COCO annotation information. `bbox` is [x, y, width, height] in pixel
/// space (top-left corner plus extent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u32,
    pub image_id: u32,
    pub category_id: u32,
    pub bbox: [f64; 4],
    pub area: f64,
    pub iscrowd: u32,
    #[serde(default)]
    pub segmentation: Vec<Vec<f64>>,
}

/// Complete COCO document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

/// Accumulates images and annotations while owning the id counters, so id
/// assignment is explicit and deterministic (insertion order, starting at 1)
/// rather than ambient state spread over a conversion loop.
pub struct CocoWriter {
    next_image_id: u32,
    next_annotation_id: u32,
    image_map: HashMap<String, u32>,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
}

impl CocoWriter {
    pub fn new() -> Self {
        Self {
            next_image_id: 1,
            next_annotation_id: 1,
            image_map: HashMap::new(),
            images: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Add an image entry, deduplicating by file name. Returns the image id.
    pub fn add_image(&mut self, file_name: String, width: u32, height: u32) -> u32 {
        if let Some(&id) = self.image_map.get(&file_name) {
            return id;
        }
        let id = self.next_image_id;
        self.next_image_id += 1;
        self.image_map.insert(file_name.clone(), id);
        self.images.push(Image::new(id, file_name, width, height));
        id
    }

    /// Add an annotation for a previously added image. The area is derived
    /// from the bbox extent.
    pub fn add_annotation(&mut self, image_id: u32, category_id: u32, bbox: [f64; 4]) -> u32 {
        let id = self.next_annotation_id;
        self.next_annotation_id += 1;
        self.annotations.push(Annotation {
            id,
            image_id,
            category_id,
            bbox,
            area: bbox[2] * bbox[3],
            iscrowd: 0,
            segmentation: Vec::new(),
        });
        id
    }

    /// Get the image id for a given file name.
    pub fn image_id(&self, file_name: &str) -> Option<u32> {
        self.image_map.get(file_name).copied()
    }

    /// Build the complete COCO document.
    pub fn into_coco(self, categories: Vec<Category>) -> CocoFile {
        CocoFile {
            images: self.images,
            annotations: self.annotations,
            categories,
        }
    }
}

impl Default for CocoWriter {
    fn default() -> Self {
        Self::new()
    }
}
