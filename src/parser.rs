//! Seed parser for plain-text problem sheets
//!
//! Understands the format the math worksheets are written in:
//!
//! ```text
//! ## 1-50: 사칙연산 기초
//! 1. 15 + 27 = ? ① 40 ② 42 ③ 44 ④ 46
//! ```
//!
//! Lines that do not look like a category heading or a problem are skipped.

use crate::catalog::Problem;
use crate::scoring::Difficulty;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    static ref PROBLEM_REGEX: Regex = Regex::new(r"^(\d+)\.\s*(.+?)\s*=\s*\?\s*(.+)$").unwrap();
    static ref OPTION_REGEX: Regex = Regex::new(r"[①②③④]\s*([^①②③④]+)").unwrap();
}

const DEFAULT_SUBJECT: &str = "수학";
const BASICS_MARKER: &str = "기초";

/// Parse every problem line in `text`
///
/// Difficulty is guessed from the category and the problem number, and the
/// correct answer is left at the first option for a human to fix later.
pub fn parse_problems(text: &str) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut category = String::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(pos) = line.find("##") {
            category = line[pos + 2..].trim().to_string();
            continue;
        }

        let Some(caps) = PROBLEM_REGEX.captures(line) else {
            continue;
        };
        let Ok(number) = caps[1].parse::<u64>() else {
            continue;
        };

        problems.push(Problem {
            id: number,
            title: format!("문제 {}", number),
            description: String::new(),
            content: format!("{} = ?", caps[2].trim()),
            options: parse_options(&caps[3]),
            correct_answer: 0,
            subject: DEFAULT_SUBJECT.to_string(),
            difficulty: guess_difficulty(&category, number),
            category: category.clone(),
            solution: None,
        });
    }

    debug!("Parsed {} problems", problems.len());
    problems
}

/// Options introduced by ①, ②, ③ or ④
pub fn parse_options(text: &str) -> Vec<String> {
    OPTION_REGEX
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

fn guess_difficulty(category: &str, number: u64) -> Difficulty {
    if category.contains(BASICS_MARKER) || number <= 50 {
        Difficulty::Easy
    } else if number <= 150 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}
