use crate::catalog::Problem;
use crate::error::UploadError;
use crate::progress::ProblemId;
use crate::scoring::Difficulty;
use log::warn;
use serde::{Deserialize, Serialize};

/// Number of option slots on the upload form
pub const OPTION_SLOTS: usize = 4;

/// Minimum number of filled-in options a problem needs
pub const MIN_OPTIONS: usize = 2;

/// A problem as entered on the upload form
///
/// Every field is optional in imported JSON; missing ones take the form defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProblemDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub solution: String,
}

impl Default for ProblemDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            content: String::new(),
            subject: String::new(),
            difficulty: Difficulty::Medium,
            options: vec![String::new(); OPTION_SLOTS],
            correct_answer: 0,
            solution: String::new(),
        }
    }
}

impl ProblemDraft {
    /// Check the draft can become a problem
    ///
    /// # Errors
    /// * `TooFewOptions` if fewer than two options are filled in
    /// * `InvalidCorrectAnswer` if the correct answer points at a missing or blank option
    pub fn validate(&self) -> Result<(), UploadError> {
        let filled = self.options.iter().filter(|o| !o.trim().is_empty()).count();
        if filled < MIN_OPTIONS {
            return Err(UploadError::TooFewOptions);
        }

        match self.options.get(self.correct_answer) {
            Some(option) if !option.trim().is_empty() => Ok(()),
            _ => Err(UploadError::InvalidCorrectAnswer),
        }
    }

    /// Turn a valid draft into a catalog problem
    ///
    /// Blank options are dropped and the correct answer index is shifted to
    /// match.
    pub fn into_problem(self, id: ProblemId) -> Result<Problem, UploadError> {
        self.validate()?;

        let correct_answer = self.options[..self.correct_answer]
            .iter()
            .filter(|o| !o.trim().is_empty())
            .count();
        let options = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let solution = Some(self.solution.trim().to_string()).filter(|s| !s.is_empty());

        Ok(Problem {
            id,
            title: self.title,
            description: self.description,
            content: self.content,
            options,
            correct_answer,
            subject: self.subject,
            difficulty: self.difficulty,
            category: String::new(),
            solution,
        })
    }
}

/// Fill a draft from an uploaded file
///
/// `.json` files are read as a whole draft; any other file becomes the problem
/// text of an otherwise empty draft.
///
/// # Errors
/// * `MalformedFile` if a `.json` file does not hold a draft
pub fn import_file(file_name: &str, contents: &str) -> Result<ProblemDraft, UploadError> {
    if file_name.to_lowercase().ends_with(".json") {
        return serde_json::from_str(contents).map_err(|e| {
            warn!("Rejected problem file {}: {}", file_name, e);
            UploadError::MalformedFile(e.to_string())
        });
    }

    Ok(ProblemDraft {
        content: contents.to_string(),
        ..ProblemDraft::default()
    })
}
