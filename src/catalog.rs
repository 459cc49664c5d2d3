use crate::progress::ProblemId;
use crate::scoring::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A multiple-choice problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: ProblemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
    pub subject: String,
    pub difficulty: Difficulty,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

/// A submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Index of the chosen option
    Choice(usize),
    /// Free-text answer, compared against the text of the correct option
    Text(String),
}

impl Answer {
    /// Interpret raw form input: a bare option number (1-based) or ①-④ picks an
    /// option, anything else is free text.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if let Some(index) = ["①", "②", "③", "④"].iter().position(|mark| *mark == input) {
            return Answer::Choice(index);
        }
        match input.parse::<usize>() {
            Ok(number) if number >= 1 => Answer::Choice(number - 1),
            _ => Answer::Text(input.to_string()),
        }
    }
}

impl Problem {
    /// Whether `answer` is right for this problem
    ///
    /// Text answers are compared trimmed and case-insensitively.
    pub fn check(&self, answer: &Answer) -> bool {
        match answer {
            Answer::Choice(index) => *index == self.correct_answer,
            Answer::Text(text) => self
                .correct_option()
                .is_some_and(|option| option.trim().to_lowercase() == text.trim().to_lowercase()),
        }
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

/// In-memory problem collection, ordered by id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    problems: BTreeMap<ProblemId, Problem>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a problem, returning the one it replaced if the id was taken
    pub fn insert(&mut self, problem: Problem) -> Option<Problem> {
        self.problems.insert(problem.id, problem)
    }

    pub fn get(&self, id: ProblemId) -> Option<&Problem> {
        self.problems.get(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Problem> {
        self.problems.values()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Smallest id greater than every id in the catalog
    pub fn next_id(&self) -> ProblemId {
        self.problems.keys().next_back().map_or(1, |id| id + 1)
    }
}

impl FromIterator<Problem> for Catalog {
    fn from_iter<I: IntoIterator<Item = Problem>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for problem in iter {
            catalog.insert(problem);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(id: ProblemId) -> Problem {
        Problem {
            id,
            title: format!("문제 {}", id),
            description: String::new(),
            content: "15 + 27 = ?".to_string(),
            options: vec!["40".into(), "42".into(), "44".into(), "46".into()],
            correct_answer: 1,
            subject: "수학".to_string(),
            difficulty: Difficulty::Easy,
            category: "사칙연산 기초".to_string(),
            solution: None,
        }
    }

    #[test]
    fn choice_answers_compare_indexes() {
        let p = problem(1);
        assert!(p.check(&Answer::Choice(1)));
        assert!(!p.check(&Answer::Choice(0)));
        assert!(!p.check(&Answer::Choice(9)));
    }

    #[test]
    fn text_answers_compare_the_correct_option() {
        let mut p = problem(1);
        assert!(p.check(&Answer::Text(" 42 ".into())));
        assert!(!p.check(&Answer::Text("40".into())));

        p.options[1] = "X = 4".into();
        assert!(p.check(&Answer::Text("x = 4".into())));
    }

    #[test]
    fn form_input_is_interpreted() {
        assert_eq!(Answer::from_input("2"), Answer::Choice(1));
        assert_eq!(Answer::from_input("③"), Answer::Choice(2));
        assert_eq!(Answer::from_input("0"), Answer::Text("0".into()));
        assert_eq!(Answer::from_input(" x = 4 "), Answer::Text("x = 4".into()));
    }

    #[test]
    fn catalog_is_ordered_and_numbers_new_problems() {
        let mut catalog: Catalog = [problem(5), problem(2)].into_iter().collect();
        assert_eq!(catalog.list().map(|p| p.id).collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(catalog.next_id(), 6);
        assert!(catalog.insert(problem(5)).is_some());
        assert_eq!(catalog.len(), 2);
        assert_eq!(Catalog::new().next_id(), 1);
    }

    #[test]
    fn problem_json_uses_camel_case() {
        let value = serde_json::to_value(problem(3)).unwrap();
        assert_eq!(value["correctAnswer"], 1);
        assert_eq!(value["difficulty"], "easy");
        assert!(value.get("solution").is_none());
    }
}
