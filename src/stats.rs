use crate::progress::{ProgressRecord, ProgressStore};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};

/// Display statistics derived from a progress record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_solved: usize,
    pub total_correct: usize,
    pub total_points: u32,
    /// Percentage of solved problems ever answered correctly, 0-100
    pub accuracy: u32,
}

impl UserStats {
    pub fn from_record(record: &ProgressRecord) -> Self {
        let total_solved = record.solved_count();
        let total_correct = record.correct_count();
        UserStats {
            total_solved,
            total_correct,
            total_points: record.total_points(),
            accuracy: accuracy_percent(total_correct, total_solved),
        }
    }

    /// Share of `catalog_size` problems the user has solved, 0-100
    pub fn completion_percent(&self, catalog_size: usize) -> u32 {
        accuracy_percent(self.total_solved.min(catalog_size), catalog_size)
    }
}

/// `correct / solved` as a whole percentage, rounded half up
///
/// Zero when nothing has been solved. Never exceeds 100.
///
/// # Examples
/// ```
/// use classmate::stats::accuracy_percent;
///
/// assert_eq!(accuracy_percent(1, 8), 13);
/// assert_eq!(accuracy_percent(2, 3), 67);
/// assert_eq!(accuracy_percent(0, 0), 0);
/// ```
pub fn accuracy_percent(correct: usize, solved: usize) -> u32 {
    if solved == 0 {
        return 0;
    }
    let correct = correct.min(solved) as u64;
    let solved = solved as u64;
    ((200 * correct + solved) / (2 * solved)) as u32
}

impl<S: KeyValueStore> ProgressStore<S> {
    /// Statistics for a user's stored progress
    pub fn stats(&self, user_id: &str) -> UserStats {
        UserStats::from_record(&self.load(user_id))
    }
}
