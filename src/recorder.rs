use crate::progress::{ProblemId, ProgressRecord, ProgressStore};
use crate::scoring::{WRONG_ANSWER_PENALTY, points_for};
use crate::storage::KeyValueStore;
use log::debug;
use serde::{Deserialize, Serialize};

/// One submission of an answer to a problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub user_id: String,
    pub problem_id: ProblemId,
    pub is_correct: bool,
    /// Difficulty label from the catalog, unknown labels score as `easy`
    pub difficulty: String,
}

/// What a single attempt changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    /// Net change of the point total
    pub points_delta: i64,
    /// The problem entered the solved set with this attempt
    pub first_solve: bool,
    /// The problem entered the correct set with this attempt
    pub first_correct: bool,
}

/// Apply one attempt to a record in place
///
/// All checks are made against the record as it was before this attempt:
/// * an unseen problem joins the solved set
/// * a correct answer to a problem never answered correctly joins the correct
///   set and earns the difficulty's points
/// * a wrong answer to a problem never answered correctly costs
///   [`WRONG_ANSWER_PENALTY`] points, clamped at zero
/// * anything submitted for a problem already answered correctly changes nothing
pub fn apply_attempt(
    record: &mut ProgressRecord,
    problem_id: ProblemId,
    is_correct: bool,
    difficulty: &str,
) -> AttemptReport {
    let already_correct = record.has_correct(problem_id);
    let first_solve = record.mark_solved(problem_id);

    let mut report = AttemptReport {
        points_delta: 0,
        first_solve,
        first_correct: false,
    };

    if already_correct {
        return report;
    }

    if is_correct {
        record.mark_correct(problem_id);
        let points = points_for(difficulty);
        record.add_points(points);
        report.first_correct = true;
        report.points_delta = i64::from(points);
    } else {
        let removed = record.deduct_points(WRONG_ANSWER_PENALTY);
        report.points_delta = -i64::from(removed);
    }

    report
}

impl<S: KeyValueStore> ProgressStore<S> {
    /// Record an attempt and persist the updated progress
    ///
    /// Loads the user's record, applies the attempt with [`apply_attempt`] and
    /// saves the result, all under the user's lock.
    ///
    /// # Arguments
    /// * `user_id` - Opaque user identifier
    /// * `problem_id` - Problem the answer was submitted for
    /// * `is_correct` - Whether the submitted answer was right
    /// * `difficulty` - Difficulty label of the problem
    ///
    /// # Returns
    /// * `ProgressRecord` - The updated, persisted record
    pub fn record_attempt(
        &self,
        user_id: &str,
        problem_id: ProblemId,
        is_correct: bool,
        difficulty: &str,
    ) -> ProgressRecord {
        self.record_attempt_with_report(user_id, problem_id, is_correct, difficulty)
            .0
    }

    /// Same as [`ProgressStore::record_attempt`], also reporting what changed
    pub fn record_attempt_with_report(
        &self,
        user_id: &str,
        problem_id: ProblemId,
        is_correct: bool,
        difficulty: &str,
    ) -> (ProgressRecord, AttemptReport) {
        self.with_user_lock(user_id, || {
            let mut record = self.load(user_id);
            let report = apply_attempt(&mut record, problem_id, is_correct, difficulty);
            debug!(
                "Attempt by {} on problem {} (correct: {}): {:+} points",
                user_id, problem_id, is_correct, report.points_delta
            );
            self.save(&mut record);
            (record, report)
        })
    }

    pub fn record_outcome(&self, outcome: &AttemptOutcome) -> (ProgressRecord, AttemptReport) {
        self.record_attempt_with_report(
            &outcome.user_id,
            outcome.problem_id,
            outcome.is_correct,
            &outcome.difficulty,
        )
    }
}
