//! Per-user progress record and its persistence
//!
//! A [`ProgressRecord`] keeps one entry per problem the user has submitted an
//! answer for, flagged when the problem has ever been answered correctly, so the
//! correct set can never hold a problem the solved set does not.
//!
//! On disk (or in whatever [`KeyValueStore`] backs the [`ProgressStore`]) the record
//! is a JSON object under the key `user_progress_{userId}`:
//!
//! ```json
//! {"userId":"u","solvedProblems":[1,2],"correctProblems":[1],"totalPoints":10,"lastUpdated":"2025-01-01T00:00:00Z"}
//! ```

use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifier of a problem in the catalog
pub type ProblemId = u64;

const KEY_PREFIX: &str = "user_progress_";

/// Storage key holding the progress record of `user_id`
pub fn storage_key(user_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, user_id)
}

/// Durable per-user aggregate of attempted problems and points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredProgress", into = "StoredProgress")]
pub struct ProgressRecord {
    user_id: String,
    /// problem id -> answered correctly at least once
    problems: BTreeMap<ProblemId, bool>,
    total_points: u32,
    last_updated: DateTime<Utc>,
}

/// Persisted JSON layout of a progress record
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    user_id: String,
    solved_problems: Vec<ProblemId>,
    correct_problems: Vec<ProblemId>,
    total_points: u32,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

impl From<StoredProgress> for ProgressRecord {
    fn from(stored: StoredProgress) -> Self {
        let mut record = ProgressRecord::from_parts(
            stored.user_id,
            stored.solved_problems,
            stored.correct_problems,
            stored.total_points,
        );
        record.last_updated = stored.last_updated;
        record
    }
}

impl From<ProgressRecord> for StoredProgress {
    fn from(record: ProgressRecord) -> Self {
        StoredProgress {
            solved_problems: record.solved_problems().collect(),
            correct_problems: record.correct_problems().collect(),
            user_id: record.user_id,
            total_points: record.total_points,
            last_updated: record.last_updated,
        }
    }
}

impl ProgressRecord {
    /// Empty record for a user who has not attempted anything yet
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            problems: BTreeMap::new(),
            total_points: 0,
            last_updated: Utc::now(),
        }
    }

    /// Build a record from independent solved/correct lists
    ///
    /// Duplicates collapse, and a problem listed as correct but missing from
    /// `solved` is treated as solved.
    pub fn from_parts(
        user_id: impl Into<String>,
        solved: impl IntoIterator<Item = ProblemId>,
        correct: impl IntoIterator<Item = ProblemId>,
        total_points: u32,
    ) -> Self {
        let mut record = Self::new(user_id);
        for id in solved {
            record.problems.entry(id).or_insert(false);
        }
        for id in correct {
            record.problems.insert(id, true);
        }
        record.total_points = total_points;
        record
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Every problem the user has submitted an answer for, ascending
    pub fn solved_problems(&self) -> impl Iterator<Item = ProblemId> + '_ {
        self.problems.keys().copied()
    }

    /// Every problem the user has answered correctly at least once, ascending
    pub fn correct_problems(&self) -> impl Iterator<Item = ProblemId> + '_ {
        self.problems
            .iter()
            .filter(|(_, correct)| **correct)
            .map(|(id, _)| *id)
    }

    pub fn solved_count(&self) -> usize {
        self.problems.len()
    }

    pub fn correct_count(&self) -> usize {
        self.problems.values().filter(|correct| **correct).count()
    }

    pub fn has_solved(&self, problem_id: ProblemId) -> bool {
        self.problems.contains_key(&problem_id)
    }

    pub fn has_correct(&self, problem_id: ProblemId) -> bool {
        self.problems.get(&problem_id).copied().unwrap_or(false)
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Returns true if the problem was not solved before
    pub(crate) fn mark_solved(&mut self, problem_id: ProblemId) -> bool {
        if self.problems.contains_key(&problem_id) {
            return false;
        }
        self.problems.insert(problem_id, false);
        true
    }

    /// Returns true if the problem was not correct before
    pub(crate) fn mark_correct(&mut self, problem_id: ProblemId) -> bool {
        let correct = self.problems.entry(problem_id).or_insert(false);
        let newly = !*correct;
        *correct = true;
        newly
    }

    pub(crate) fn add_points(&mut self, points: u32) {
        self.total_points = self.total_points.saturating_add(points);
    }

    /// Subtract points, never going below zero. Returns the amount actually removed.
    pub(crate) fn deduct_points(&mut self, points: u32) -> u32 {
        let removed = points.min(self.total_points);
        self.total_points -= removed;
        removed
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Loads, saves and purges progress records through a storage port
///
/// Never fails: a missing backend, an unreadable slot or a corrupt record all
/// degrade to a fresh default record, and failed writes are logged and dropped.
///
/// Read-modify-write cycles for one user are serialized by a per-user lock held
/// in the store, so concurrent attempts from several sessions all land. The lock
/// is process-local: two processes sharing one backend still race, last save wins.
/// Clones share the same locks.
#[derive(Debug, Clone)]
pub struct ProgressStore<S> {
    storage: S,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            locks: Arc::default(),
        }
    }

    /// Run `f` while holding the lock of `user_id`
    pub(crate) fn with_user_lock<T>(&self, user_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the progress record of a user
    ///
    /// # Arguments
    /// * `user_id` - Opaque user identifier from the identity provider
    ///
    /// # Returns
    /// * `ProgressRecord` - The stored record, or an empty one if none is stored
    ///   or the stored one cannot be parsed
    pub fn load(&self, user_id: &str) -> ProgressRecord {
        let key = storage_key(user_id);
        let stored = match self.storage.get(&key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return ProgressRecord::new(user_id),
            Err(e) => {
                warn!("Failed to read progress for {}: {}", user_id, e);
                return ProgressRecord::new(user_id);
            }
        };

        match serde_json::from_str::<ProgressRecord>(&stored) {
            Ok(record) if record.user_id == user_id => record,
            Ok(record) => {
                warn!(
                    "Progress slot {} holds a record for {}, ignoring it",
                    key, record.user_id
                );
                ProgressRecord::new(user_id)
            }
            Err(e) => {
                warn!("Failed to parse user progress for {}: {}", user_id, e);
                ProgressRecord::new(user_id)
            }
        }
    }

    /// Persist a progress record
    ///
    /// Stamps `last_updated` with the current time and replaces whatever was
    /// stored for the record's user.
    pub fn save(&self, record: &mut ProgressRecord) {
        record.touch();

        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize progress for {}: {}", record.user_id, e);
                return;
            }
        };

        match self.storage.set(&storage_key(&record.user_id), &json) {
            Ok(()) => debug!(
                "Saved progress for {}: {} solved, {} points",
                record.user_id,
                record.solved_count(),
                record.total_points
            ),
            Err(e) => warn!("Failed to save progress for {}: {}", record.user_id, e),
        }
    }

    /// Remove the stored progress of a user. Purging a missing record is a no-op.
    pub fn purge(&self, user_id: &str) {
        self.with_user_lock(user_id, || {
            if let Err(e) = self.storage.delete(&storage_key(user_id)) {
                warn!("Failed to purge progress for {}: {}", user_id, e);
            }
        });
    }

    /// Remove every stored progress record
    ///
    /// Returns the number of records removed.
    pub fn purge_all(&self) -> usize {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list progress records: {}", e);
                return 0;
            }
        };

        keys.iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .filter(|key| match self.storage.delete(key) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to purge {}: {}", key, e);
                    false
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, NullStore};

    #[test]
    fn missing_record_loads_as_default() {
        let store = ProgressStore::new(MemoryStore::new());
        let record = store.load("alice");
        assert_eq!(record.user_id(), "alice");
        assert_eq!(record.solved_count(), 0);
        assert_eq!(record.correct_count(), 0);
        assert_eq!(record.total_points(), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = ProgressStore::new(MemoryStore::new());
        let mut record = ProgressRecord::from_parts("alice", [3, 1, 2], [2], 45);
        let before = record.last_updated();
        store.save(&mut record);
        assert!(record.last_updated() >= before);

        let loaded = store.load("alice");
        assert_eq!(loaded, record);
        assert_eq!(loaded.solved_problems().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(loaded.correct_problems().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn save_replaces_the_whole_record() {
        let store = ProgressStore::new(MemoryStore::new());
        store.save(&mut ProgressRecord::from_parts("bob", [1, 2], [1], 10));
        store.save(&mut ProgressRecord::from_parts("bob", [7], [], 0));

        let loaded = store.load("bob");
        assert_eq!(loaded.solved_problems().collect::<Vec<_>>(), vec![7]);
        assert_eq!(loaded.total_points(), 0);
    }

    #[test]
    fn corrupt_record_loads_as_default() {
        let storage = MemoryStore::new();
        storage.set(&storage_key("carol"), "{not json").unwrap();
        let store = ProgressStore::new(storage);

        let record = store.load("carol");
        assert_eq!(record.solved_count(), 0);
        assert_eq!(record.total_points(), 0);
    }

    #[test]
    fn negative_points_count_as_corrupt() {
        let storage = MemoryStore::new();
        storage
            .set(
                &storage_key("dave"),
                r#"{"userId":"dave","solvedProblems":[1],"correctProblems":[],"totalPoints":-5,"lastUpdated":"2025-01-01T00:00:00Z"}"#,
            )
            .unwrap();
        let store = ProgressStore::new(storage);
        assert_eq!(store.load("dave").solved_count(), 0);
    }

    #[test]
    fn record_stored_under_wrong_key_is_ignored() {
        let storage = MemoryStore::new();
        let json = serde_json::to_string(&ProgressRecord::from_parts("erin", [1], [1], 10)).unwrap();
        storage.set(&storage_key("frank"), &json).unwrap();
        let store = ProgressStore::new(storage);
        assert_eq!(store.load("frank").total_points(), 0);
    }

    #[test]
    fn correct_problem_missing_from_solved_is_repaired() {
        let storage = MemoryStore::new();
        storage
            .set(
                &storage_key("gina"),
                r#"{"userId":"gina","solvedProblems":[1,1],"correctProblems":[4],"totalPoints":30,"lastUpdated":"2025-01-01T00:00:00Z"}"#,
            )
            .unwrap();
        let store = ProgressStore::new(storage);

        let record = store.load("gina");
        assert_eq!(record.solved_problems().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(record.correct_problems().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn wire_format_uses_camel_case_lists() {
        let record = ProgressRecord::from_parts("hana", [2, 1], [1], 10);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], "hana");
        assert_eq!(value["solvedProblems"], serde_json::json!([1, 2]));
        assert_eq!(value["correctProblems"], serde_json::json!([1]));
        assert_eq!(value["totalPoints"], 10);
        assert!(value["lastUpdated"].is_string());
    }

    #[test]
    fn purge_removes_the_record_and_is_idempotent() {
        let store = ProgressStore::new(MemoryStore::new());
        store.save(&mut ProgressRecord::from_parts("ivan", [1], [1], 10));
        store.purge("ivan");
        assert_eq!(store.load("ivan").total_points(), 0);
        store.purge("ivan");
        store.purge("nobody");
    }

    #[test]
    fn purge_all_only_touches_progress_keys() {
        let storage = MemoryStore::new();
        storage.set("sb-session", "token").unwrap();
        let store = ProgressStore::new(storage);
        store.save(&mut ProgressRecord::new("a"));
        store.save(&mut ProgressRecord::new("b"));

        assert_eq!(store.purge_all(), 2);
        assert_eq!(store.storage().get("sb-session").unwrap().as_deref(), Some("token"));
    }

    #[test]
    fn without_a_backend_everything_degrades_to_defaults() {
        let store = ProgressStore::new(NullStore);
        let mut record = ProgressRecord::from_parts("jo", [1], [1], 10);
        store.save(&mut record);
        assert_eq!(store.load("jo").total_points(), 0);
        store.purge("jo");
        assert_eq!(store.purge_all(), 0);
    }

    #[test]
    fn deduct_points_clamps_at_zero() {
        let mut record = ProgressRecord::from_parts("kim", [], [], 3);
        assert_eq!(record.deduct_points(5), 3);
        assert_eq!(record.total_points(), 0);
        assert_eq!(record.deduct_points(5), 0);
    }
}
