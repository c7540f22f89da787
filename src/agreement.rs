//! Inter-annotator agreement resolution.
//!
//! The agreement matrix cross-references annotators (rows) against logical
//! bounding-box identifiers (columns named `bbox=<id>`). A cell holds the
//! category the annotator assigned to that region, or -1 if they never
//! labeled it. A region is retained only when at least two annotators
//! labeled it and every vote is identical; this is a unanimity policy, not
//! a majority vote.

use log::{info, warn};
use std::error::Error;
use std::path::Path;

use crate::types::AnnotationRecord;

/// Sentinel cell value meaning "this annotator did not label this region".
pub const NO_VOTE: i64 = -1;

/// Identifier of a logical bounding-box region. Baseline ids refer to
/// `baseline_annotation_id` in the source table; `new_<n>` ids refer to the
/// record id of an annotation with no baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BboxKey {
    Baseline(i64),
    New(i64),
}

impl BboxKey {
    /// Parse a matrix column header of the form `bbox=123` or `bbox=new_45`.
    pub fn parse(column: &str) -> Option<BboxKey> {
        let id = column.strip_prefix("bbox=")?;
        if let Some(rest) = id.strip_prefix("new_") {
            rest.trim().parse().ok().map(BboxKey::New)
        } else {
            id.trim().parse().ok().map(BboxKey::Baseline)
        }
    }
}

/// The agreement matrix: one row per annotator, one column per region.
#[derive(Debug, Clone)]
pub struct AgreementMatrix {
    user_ids: Vec<i64>,
    columns: Vec<String>,
    cells: Vec<Vec<i64>>,
}

impl AgreementMatrix {
    pub fn new(user_ids: Vec<i64>, columns: Vec<String>, cells: Vec<Vec<i64>>) -> Self {
        Self {
            user_ids,
            columns,
            cells,
        }
    }

    /// Read a matrix from CSV: first column `user_id`, remaining header
    /// cells carry the `bbox=<id>` identifiers. Empty cells read as NO_VOTE.
    pub fn from_csv(path: &Path) -> Result<Self, Box<dyn Error>> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| format!("failed to read agreement matrix {}: {e}", path.display()))?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(format!("agreement matrix {} has no columns", path.display()).into());
        }
        let columns: Vec<String> = headers.iter().skip(1).map(String::from).collect();

        let mut user_ids = Vec::new();
        let mut cells = Vec::new();
        for result in reader.records() {
            let record = result?;
            let user_id: i64 = record
                .get(0)
                .unwrap_or("")
                .trim()
                .parse()
                .map_err(|_| format!("malformed user_id in {}", path.display()))?;
            let mut row = Vec::with_capacity(columns.len());
            for cell in record.iter().skip(1) {
                row.push(parse_vote(cell).ok_or_else(|| {
                    format!("malformed cell '{cell}' in {}", path.display())
                })?);
            }
            if row.len() != columns.len() {
                return Err(format!(
                    "row for user {user_id} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )
                .into());
            }
            user_ids.push(user_id);
            cells.push(row);
        }

        Ok(Self::new(user_ids, columns, cells))
    }

    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The regions every voting annotator agreed on. Regions with fewer
    /// than two votes are excluded as insufficient evidence, not errors.
    /// Column order is preserved.
    pub fn agreed_regions(&self) -> Vec<BboxKey> {
        let mut agreed = Vec::new();
        for (col, column) in self.columns.iter().enumerate() {
            let votes: Vec<i64> = self
                .cells
                .iter()
                .map(|row| row[col])
                .filter(|&vote| vote != NO_VOTE)
                .collect();
            if votes.len() < 2 {
                continue;
            }
            if votes.windows(2).all(|pair| pair[0] == pair[1]) {
                match BboxKey::parse(column) {
                    Some(key) => agreed.push(key),
                    None => warn!("unrecognized agreement column '{column}', skipping"),
                }
            }
        }
        info!(
            "{} of {} regions reached full agreement",
            agreed.len(),
            self.columns.len()
        );
        agreed
    }
}

/// Select the source annotations behind a set of agreed regions: baseline
/// keys match `baseline_annotation_id`, `new_` keys match the record id.
pub fn select_agreed_annotations<'a>(
    annotations: &'a [AnnotationRecord],
    agreed: &[BboxKey],
) -> Vec<&'a AnnotationRecord> {
    let mut selected = Vec::new();
    for key in agreed {
        match key {
            BboxKey::Baseline(id) => selected.extend(
                annotations
                    .iter()
                    .filter(|a| a.baseline_annotation_id == Some(*id)),
            ),
            BboxKey::New(id) => selected.extend(annotations.iter().filter(|a| a.id == *id)),
        }
    }
    selected
}

fn parse_vote(cell: &str) -> Option<i64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Some(NO_VOTE);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Some(value as i64),
        _ => None,
    }
}
