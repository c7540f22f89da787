//! Annotation cleaning pipeline: flag filters, annotator-quality filter,
//! submission join, metadata join and box conversion.

use log::info;
use std::collections::{HashMap, HashSet};

use crate::categories;
use crate::types::{
    AnnotationRecord, CleanAnnotationRow, CleaningStats, ImageMetaRecord, SubmissionRecord,
};

/// Convert a single raw record into a cleaned row: attach the image name
/// from metadata (None if there is none), turn the offset box into min/max
/// corners, and resolve the class name (None for ids outside the table).
/// Data-quality defects are counted in `stats`, never raised.
pub fn to_clean_row(
    record: &AnnotationRecord,
    meta: Option<&ImageMetaRecord>,
    stats: &mut CleaningStats,
) -> CleanAnnotationRow {
    if meta.is_none() {
        stats.missing_image_meta += 1;
    }

    let class_name = record
        .category_id
        .and_then(categories::class_name)
        .map(String::from);
    if class_name.is_none() {
        stats.unknown_category += 1;
    }

    CleanAnnotationRow {
        image_name: meta.map(|m| m.image_name.clone()),
        x_min: record.x,
        y_min: record.y,
        x_max: record.x + record.width,
        y_max: record.y + record.height,
        category_id: record.category_id,
        class_name,
    }
}

/// Run the full cleaning pipeline. Stage order matters for count reporting:
/// flag filter, then annotator filter, then the submission inner-join, then
/// the metadata left-join and box conversion. Output length is at most the
/// input length.
pub fn clean_annotations(
    annotations: &[AnnotationRecord],
    accepted_users: &HashSet<i64>,
    submissions: &[SubmissionRecord],
    image_meta: &[ImageMetaRecord],
    stats: &mut CleaningStats,
) -> Vec<CleanAnnotationRow> {
    stats.input_rows = annotations.len();

    let confirmed: Vec<&AnnotationRecord> = annotations
        .iter()
        .filter(|a| a.is_confirmed && !a.is_deleted && !a.is_label_changed)
        .collect();
    stats.after_state_filter = confirmed.len();

    let trusted: Vec<&AnnotationRecord> = confirmed
        .into_iter()
        .filter(|a| accepted_users.contains(&a.user_id))
        .collect();
    stats.after_user_filter = trusted.len();
    info!(
        "Annotations before quality filter: {}, after: {}",
        stats.after_state_filter, stats.after_user_filter
    );

    let submitted: HashSet<(i64, i64)> = submissions
        .iter()
        .filter(|s| s.is_submitted)
        .map(|s| (s.user_id, s.image_id))
        .collect();
    let selected: Vec<&AnnotationRecord> = trusted
        .into_iter()
        .filter(|a| submitted.contains(&(a.user_id, a.image_id)))
        .collect();
    stats.after_submission_filter = selected.len();

    let meta_by_id: HashMap<i64, &ImageMetaRecord> =
        image_meta.iter().map(|m| (m.image_id, m)).collect();

    selected
        .into_iter()
        .map(|record| to_clean_row(record, meta_by_id.get(&record.image_id).copied(), stats))
        .collect()
}
