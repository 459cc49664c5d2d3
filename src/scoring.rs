use serde::{Deserialize, Serialize};
use std::fmt;

/// Points removed for a wrong answer on a problem that was never answered correctly.
pub const WRONG_ANSWER_PENALTY: u32 = 5;

/// Difficulty level of a problem
///
/// Controls how many points a first correct answer is worth.
/// Serialized as the lowercase labels `easy`, `medium` and `hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 10 points
    #[default]
    Easy,

    /// 20 points
    Medium,

    /// 30 points
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Parse a difficulty label
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    ///
    /// # Examples
    /// ```
    /// use classmate::scoring::Difficulty;
    ///
    /// assert_eq!(Difficulty::from_label(" Hard "), Some(Difficulty::Hard));
    /// assert_eq!(Difficulty::from_label("expert"), None);
    /// ```
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Like [`Difficulty::from_label`] but unknown labels fall back to `Easy`.
    pub fn from_label_or_default(label: &str) -> Self {
        Self::from_label(label).unwrap_or_default()
    }

    pub fn points(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Label shown on the problem pages
    pub fn display_name(self) -> &'static str {
        match self {
            Difficulty::Easy => "쉬움",
            Difficulty::Medium => "보통",
            Difficulty::Hard => "어려움",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point value of a difficulty label
///
/// Total over all inputs: anything that is not `easy`, `medium` or `hard`
/// is worth the same as `easy`.
///
/// # Arguments
/// * `label` - Difficulty label as supplied by the problem catalog
///
/// # Returns
/// * `u32` - 10, 20 or 30
pub fn points_for(label: &str) -> u32 {
    Difficulty::from_label_or_default(label).points()
}
