/*!
# Classmate

Progress tracking and scoring for the Classmate study site, built in Rust.

## Overview

Learners solve multiple-choice problems. Every submitted answer is recorded
against the learner's progress record, which keeps the problems they attempted,
the problems they answered correctly and a running point total. Records live
in a pluggable key-value store and are always read and written as a whole.

## Scoring

- Points per problem depend on difficulty: easy 10, medium 20, hard 30
- Unknown difficulty labels score as easy
- A wrong answer to a problem not yet answered correctly costs 5 points,
  never taking the total below zero
- Once a problem is answered correctly, further attempts change nothing

## Modules

- **scoring**: Difficulty levels and point values
- **storage**: Key-value storage port with in-memory, file and null backends
- **progress**: Progress record and its store (load, save, purge)
- **recorder**: Applies attempts to progress records
- **stats**: Display statistics (solved, correct, points, accuracy)
- **catalog**: Problems and answer checking
- **parser**: Plain-text problem sheet parser
- **upload**: Problem upload drafts and file import
- **login**: User accounts and sessions
- **config**: Environment configuration
- **error**: Error types
- **app**: Web routes and middleware (`web` feature)

## Storage layout

Each record is stored under `user_progress_{userId}` as camelCase JSON:

```json
{
  "userId": "u1",
  "solvedProblems": [1, 2],
  "correctProblems": [1],
  "totalPoints": 10,
  "lastUpdated": "2024-05-01T12:00:00Z"
}
```
*/

#[cfg(feature = "web")]
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod login;
pub mod parser;
pub mod progress;
pub mod recorder;
pub mod scoring;
pub mod stats;
pub mod storage;
pub mod upload;

pub use catalog::{Answer, Catalog, Problem};
pub use config::Config;
pub use error::{AppError, AuthError, StorageError, UploadError};
pub use progress::{ProblemId, ProgressRecord, ProgressStore, storage_key};
pub use recorder::{AttemptOutcome, AttemptReport, apply_attempt};
pub use scoring::{Difficulty, WRONG_ANSWER_PENALTY, points_for};
pub use stats::{UserStats, accuracy_percent};
pub use storage::{FileStore, KeyValueStore, MemoryStore, NullStore};
