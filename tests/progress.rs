use classmate::{
    FileStore, KeyValueStore, MemoryStore, ProblemId, ProgressRecord, ProgressStore, UserStats,
    storage_key,
};
use std::sync::Arc;
use tempfile::tempdir;

fn ids(iter: impl Iterator<Item = ProblemId>) -> Vec<ProblemId> {
    iter.collect()
}

#[test]
fn scenarios_survive_a_restart() {
    let dir = tempdir().unwrap();

    {
        let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());

        // Scenario A
        let record = store.record_attempt("alice", 1, true, "easy");
        assert_eq!(ids(record.solved_problems()), vec![1]);
        assert_eq!(ids(record.correct_problems()), vec![1]);
        assert_eq!(record.total_points(), 10);
        assert_eq!(
            store.stats("alice"),
            UserStats {
                total_solved: 1,
                total_correct: 1,
                total_points: 10,
                accuracy: 100,
            }
        );

        // Scenario B
        let record = store.record_attempt("bob", 2, false, "medium");
        assert_eq!(record.total_points(), 0);
        assert_eq!(ids(record.solved_problems()), vec![2]);
        assert_eq!(record.correct_count(), 0);
        assert_eq!(store.stats("bob").accuracy, 0);
    }

    let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());

    // Scenario C
    let record = store.record_attempt("alice", 1, true, "easy");
    assert_eq!(record.total_points(), 10);
    assert_eq!(ids(record.solved_problems()), vec![1]);

    // Scenario D
    let record = store.record_attempt("bob", 2, true, "medium");
    assert_eq!(record.total_points(), 20);
    assert_eq!(ids(record.correct_problems()), vec![2]);
}

#[test]
fn stored_file_has_the_documented_shape() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(FileStore::open(dir.path()).unwrap());
    let store = ProgressStore::new(backend.clone());

    store.record_attempt("u1", 3, false, "hard");
    store.record_attempt("u1", 1, true, "hard");

    let raw = backend.get(&storage_key("u1")).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["userId"], "u1");
    assert_eq!(value["solvedProblems"], serde_json::json!([1, 3]));
    assert_eq!(value["correctProblems"], serde_json::json!([1]));
    assert_eq!(value["totalPoints"], 30);
    assert!(value["lastUpdated"].is_string());
}

#[test]
fn hand_written_record_is_read_back() {
    let store = ProgressStore::new(MemoryStore::new());
    store
        .storage()
        .set(
            &storage_key("carol"),
            r#"{"userId":"carol","solvedProblems":[4,5,6],"correctProblems":[5],"totalPoints":25,"lastUpdated":"2024-03-01T09:30:00Z"}"#,
        )
        .unwrap();

    let stats = store.stats("carol");
    assert_eq!(stats.total_solved, 3);
    assert_eq!(stats.total_correct, 1);
    assert_eq!(stats.total_points, 25);
    assert_eq!(stats.accuracy, 33);

    let record = store.record_attempt("carol", 4, true, "medium");
    assert_eq!(record.total_points(), 45);
    assert_eq!(ids(record.correct_problems()), vec![4, 5]);
}

#[test]
fn round_trip_keeps_everything_but_the_timestamp() {
    let store = ProgressStore::new(MemoryStore::new());
    let original = ProgressRecord::from_parts("dave", [1, 2, 3], [2], 15);

    let mut saved = original.clone();
    store.save(&mut saved);
    let loaded = store.load("dave");

    assert_eq!(loaded, saved);
    assert_eq!(ids(loaded.solved_problems()), ids(original.solved_problems()));
    assert_eq!(ids(loaded.correct_problems()), ids(original.correct_problems()));
    assert_eq!(loaded.total_points(), original.total_points());
    assert!(loaded.last_updated() >= original.last_updated());
}

/// Small deterministic generator so the attempt sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn invariants_hold_over_long_attempt_sequences() {
    let labels = ["easy", "medium", "hard", "legendary"];

    for seed in 0..20 {
        let mut rng = Lcg(seed);
        let store = ProgressStore::new(MemoryStore::new());
        let mut previous = store.load("eve");

        for _ in 0..200 {
            let problem = rng.next() % 15;
            let is_correct = rng.next() % 3 == 0;
            let label = labels[(rng.next() % 4) as usize];

            let record = store.record_attempt("eve", problem, is_correct, label);

            assert!(record.solved_count() >= previous.solved_count());
            assert!(record.correct_problems().all(|id| record.has_solved(id)));
            if is_correct && previous.has_correct(problem) {
                assert_eq!(record.total_points(), previous.total_points());
            }
            if !is_correct && !previous.has_correct(problem) && previous.total_points() < 5 {
                assert_eq!(record.total_points(), 0);
            }

            let stats = UserStats::from_record(&record);
            assert!(stats.accuracy <= 100);

            previous = record;
        }
    }
}

#[test]
fn purge_all_clears_every_user() {
    let dir = tempdir().unwrap();
    let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());
    for user in ["a", "b", "c"] {
        store.record_attempt(user, 1, true, "easy");
    }

    assert_eq!(store.purge_all(), 3);
    assert_eq!(store.stats("a"), UserStats::default());
    assert!(store.storage().keys().unwrap().is_empty());
}

#[test]
fn concurrent_attempts_for_one_user_all_count() {
    let dir = tempdir().unwrap();
    let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());

    std::thread::scope(|scope| {
        for worker in 0..8u64 {
            let store = &store;
            scope.spawn(move || {
                for n in 0..25 {
                    store.record_attempt("frank", worker * 100 + n, true, "easy");
                }
            });
        }
    });

    let record = store.load("frank");
    assert_eq!(record.solved_count(), 200);
    assert_eq!(record.correct_count(), 200);
    assert_eq!(record.total_points(), 2000);
}

#[test]
fn readers_never_see_a_half_written_record() {
    let dir = tempdir().unwrap();
    let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());
    let mut record = ProgressRecord::from_parts("grace", 0..2000, 0..1000, 10_000);
    store.save(&mut record);

    std::thread::scope(|scope| {
        let writer_store = &store;
        let mut writer_record = record.clone();
        scope.spawn(move || {
            for _ in 0..300 {
                writer_store.save(&mut writer_record);
            }
        });

        for _ in 0..3000 {
            let loaded = store.load("grace");
            assert_eq!(loaded.solved_count(), 2000);
            assert_eq!(loaded.total_points(), 10_000);
        }
    });
}

#[test]
fn users_with_similar_ids_keep_separate_records() {
    let dir = tempdir().unwrap();
    let store = ProgressStore::new(FileStore::open(dir.path()).unwrap());

    store.record_attempt("kim.lee", 1, true, "hard");
    store.record_attempt("kim_lee", 2, true, "easy");

    assert_eq!(store.load("kim.lee").total_points(), 30);
    assert_eq!(store.load("kim_lee").total_points(), 10);
    assert_eq!(store.purge_all(), 2);
}
