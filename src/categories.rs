//! The fixed vehicle category table shared by every pipeline stage.
//!
//! The upstream annotation exports carried several diverging copies of this
//! list; this module is the single authoritative version. Category ids are
//! stable 1-based integers, and id 15 ("Others") doubles as the fallback for
//! detector outputs that do not map onto a known class.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::coco::Category;

/// Number of known vehicle classes.
pub const CATEGORY_COUNT: usize = 15;

/// Category id used for anything the table cannot account for.
pub const FALLBACK_CATEGORY_ID: u32 = 15;

// Canonical (id, name) pairs, ordered by id.
const VEHICLE_CATEGORIES: [(u32, &str); CATEGORY_COUNT] = [
    (1, "Hatchback"),
    (2, "Sedan"),
    (3, "SUV"),
    (4, "MUV"),
    (5, "Bus"),
    (6, "Truck"),
    (7, "Three-wheeler"),
    (8, "Two-wheeler"),
    (9, "LCV"),
    (10, "Mini-bus"),
    (11, "Mini-truck"),
    (12, "tempo-traveller"),
    (13, "bicycle"),
    (14, "Van"),
    (15, "Others"),
];

const SUPERCATEGORY: &str = "Defect";

static NAME_TO_ID: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();

fn name_to_id() -> &'static HashMap<&'static str, u32> {
    NAME_TO_ID.get_or_init(|| {
        VEHICLE_CATEGORIES
            .iter()
            .map(|&(id, name)| (name, id))
            .collect()
    })
}

/// Look up the human-readable class name for a category id.
pub fn class_name(category_id: u32) -> Option<&'static str> {
    VEHICLE_CATEGORIES
        .iter()
        .find(|&&(id, _)| id == category_id)
        .map(|&(_, name)| name)
}

/// Look up the category id for a class name. Surrounding whitespace is
/// ignored; the match itself is exact.
pub fn category_id(name: &str) -> Option<u32> {
    name_to_id().get(name.trim()).copied()
}

/// All class names in ascending category-id order. This is the order YOLO
/// class indices are derived from, so it must match the sort used during
/// CSV to COCO conversion.
pub fn category_names() -> Vec<&'static str> {
    VEHICLE_CATEGORIES.iter().map(|&(_, name)| name).collect()
}

/// The full table as COCO category entries.
pub fn coco_categories() -> Vec<Category> {
    VEHICLE_CATEGORIES
        .iter()
        .map(|&(id, name)| Category {
            id,
            name: name.to_string(),
            supercategory: SUPERCATEGORY.to_string(),
        })
        .collect()
}

/// Map a detector's 0-based class index onto a category id. Indices outside
/// the table map to the "Others" fallback rather than failing.
pub fn category_for_class_index(class_index: usize) -> u32 {
    VEHICLE_CATEGORIES
        .get(class_index)
        .map(|&(id, _)| id)
        .unwrap_or(FALLBACK_CATEGORY_ID)
}
