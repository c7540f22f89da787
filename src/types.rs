use chrono::{NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Column order of the cleaned annotation CSV. The header is written even
/// when the cleaned table is empty.
pub const CLEAN_CSV_HEADER: [&str; 7] = [
    "image_name",
    "x_min",
    "y_min",
    "x_max",
    "y_max",
    "category_id",
    "class_name",
];

/// One row of the raw crowd-annotation export.
///
/// The export spells its columns inconsistently between phases: the category
/// column may be `category_id`, `baseline_category_id` or
/// `user_submitted_category_id`, and nullable integer columns come out of
/// pandas as floats ("3.0"). The serde attributes below absorb all of that.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    pub id: i64,
    pub user_id: i64,
    pub image_id: i64,
    #[serde(default, deserialize_with = "opt_id_from_csv")]
    pub baseline_annotation_id: Option<i64>,
    #[serde(
        alias = "baseline_category_id",
        alias = "user_submitted_category_id",
        default,
        deserialize_with = "opt_category_from_csv"
    )]
    pub category_id: Option<u32>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(deserialize_with = "bool_from_csv")]
    pub is_confirmed: bool,
    #[serde(deserialize_with = "bool_from_csv")]
    pub is_deleted: bool,
    #[serde(deserialize_with = "bool_from_csv")]
    pub is_label_changed: bool,
    #[serde(default, deserialize_with = "opt_datetime_from_csv")]
    pub created_at: Option<NaiveDateTime>,
}

/// One row of the annotator progression-score export. Only the most recent
/// record per user is authoritative; see the quality module.
#[derive(Debug, Clone, Deserialize)]
pub struct UserScoreRecord {
    pub user_id: i64,
    pub ax_percentage_score: f64,
    #[serde(deserialize_with = "datetime_from_csv")]
    pub created_at: NaiveDateTime,
}

/// One (user, image) submission state row.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRecord {
    pub user_id: i64,
    pub image_id: i64,
    #[serde(deserialize_with = "bool_from_csv")]
    pub is_submitted: bool,
}

/// Image metadata row. The export names the id column `id`; downstream
/// tables call it `image_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageMetaRecord {
    #[serde(alias = "id")]
    pub image_id: i64,
    #[serde(alias = "file_name")]
    pub image_name: String,
    pub height: u32,
    pub width: u32,
}

/// One row of the cleaned training table: min/max pixel coordinates plus the
/// resolved class name. `image_name` is None when the annotation referenced
/// an image id with no metadata; `class_name` is None when the category id
/// is outside the known table. Both are data-quality signals, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanAnnotationRow {
    pub image_name: Option<String>,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    #[serde(default, deserialize_with = "opt_category_from_csv")]
    pub category_id: Option<u32>,
    pub class_name: Option<String>,
}

/// Per-stage row counts accumulated while cleaning, plus data-quality defect
/// counters. Filters only ever remove rows, so the stage counts are
/// monotonically non-increasing.
#[derive(Debug, Default, Clone)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub after_state_filter: usize,
    pub after_user_filter: usize,
    pub after_submission_filter: usize,
    pub missing_image_meta: usize,
    pub unknown_category: usize,
}

impl CleaningStats {
    pub fn print_summary(&self) {
        log::info!("=== Cleaning Summary ===");
        log::info!("Input rows: {}", self.input_rows);
        log::info!(
            "After confirmed/deleted/relabel filter: {}",
            self.after_state_filter
        );
        log::info!("After annotator-quality filter: {}", self.after_user_filter);
        log::info!(
            "After submitted-image filter: {}",
            self.after_submission_filter
        );

        if self.missing_image_meta > 0 {
            log::warn!(
                "{} rows reference an image id with no metadata",
                self.missing_image_meta
            );
        }
        if self.unknown_category > 0 {
            log::warn!(
                "{} rows carry a category id outside the known table",
                self.unknown_category
            );
        }
    }
}

// Accept the boolean spellings the exports actually contain: Rust/JSON
// lowercase, Python capitalized, and 0/1. An empty cell reads as false.
fn bool_from_csv<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "true" | "True" | "TRUE" | "t" | "T" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "f" | "F" | "0" | "" => Ok(false),
        other => Err(de::Error::custom(format!("not a boolean: '{other}'"))),
    }
}

fn parse_int_cell(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    // pandas serializes nullable integer columns as floats ("3.0")
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}

fn opt_id_from_csv<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_int_cell(trimmed)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("not an integer id: '{trimmed}'")))
}

fn opt_category_from_csv<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_int_cell(trimmed)
        .and_then(|value| u32::try_from(value).ok())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("not a category id: '{trimmed}'")))
}

/// Parse the timestamp spellings seen in the exports: space- or T-separated
/// datetimes with optional fractional seconds, RFC 3339, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn datetime_from_csv<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(raw.trim())
        .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: '{raw}'")))
}

fn opt_datetime_from_csv<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_timestamp(trimmed)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp: '{trimmed}'")))
}
