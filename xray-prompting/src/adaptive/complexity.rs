use serde::{Deserialize, Serialize};

use crate::models::ComplexityClass;

const HIGH: [&str; 6] = [
    "multiple",
    "bilateral",
    "complicated",
    "extensive",
    "severe",
    "unclear",
];
const MEDIUM: [&str; 5] = [
    "consolidation",
    "infiltrate",
    "opacity",
    "asymmetric",
    "moderate",
];
const LOW: [&str; 5] = ["normal", "clear", "no", "minimal", "mild"];

/// How many keywords of each tier appear in a response. Each keyword counts once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ComplexityScore {
    pub fn class(&self) -> ComplexityClass {
        if self.high >= 2 {
            ComplexityClass::High
        } else if self.medium >= 2 || (self.high >= 1 && self.medium >= 1) {
            ComplexityClass::Medium
        } else {
            ComplexityClass::Low
        }
    }
}

fn hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

pub fn score_complexity(text: &str) -> ComplexityScore {
    let lower = text.to_lowercase();
    ComplexityScore {
        high: hits(&lower, &HIGH),
        medium: hits(&lower, &MEDIUM),
        low: hits(&lower, &LOW),
    }
}

/// Classify the full text of an initial assessment.
pub fn classify_complexity(text: &str) -> ComplexityClass {
    score_complexity(text).class()
}
