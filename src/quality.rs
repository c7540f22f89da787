//! Annotator quality filter.
//!
//! A user may accumulate many progression-score rows over time; only the
//! most recent one counts. Users whose latest score clears the threshold are
//! accepted, everyone else's annotations are dropped upstream.

use log::info;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::types::UserScoreRecord;

pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.8;

/// Select the user ids whose most recent progression score is at least
/// `threshold`. When two rows for a user share the same `created_at`, the
/// row appearing later in the input wins.
pub fn accepted_users(scores: &[UserScoreRecord], threshold: f64) -> HashSet<i64> {
    let mut latest: HashMap<i64, &UserScoreRecord> = HashMap::new();
    for record in scores {
        match latest.entry(record.user_id) {
            Entry::Occupied(mut entry) => {
                if record.created_at >= entry.get().created_at {
                    entry.insert(record);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }
    }

    let accepted: HashSet<i64> = latest
        .values()
        .filter(|record| record.ax_percentage_score >= threshold)
        .map(|record| record.user_id)
        .collect();

    info!(
        "Kept {} of {} scored users (threshold {})",
        accepted.len(),
        latest.len(),
        threshold
    );
    accepted
}
