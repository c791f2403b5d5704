use tracing::debug;

use crate::models::{Diagnosis, PolarityScore};

pub const POSITIVE_INDICATORS: [&str; 9] = [
    "pneumonia",
    "infection",
    "consolidation",
    "opacity",
    "infiltrate",
    "abnormal",
    "pathology",
    "disease",
    "positive",
];

pub const NEGATIVE_INDICATORS: [&str; 8] = [
    "normal",
    "clear",
    "negative",
    "no pneumonia",
    "healthy",
    "no signs",
    "no evidence",
    "unremarkable",
];

const HEDGES: [&str; 4] = ["questionable", "subtle", "uncertain", "unable"];

/// Non-overlapping occurrences of each indicator set in lower-cased text.
pub fn score(text: &str) -> PolarityScore {
    let lower = text.to_lowercase();
    PolarityScore {
        positive: occurrences(&lower, &POSITIVE_INDICATORS),
        negative: occurrences(&lower, &NEGATIVE_INDICATORS),
    }
}

fn occurrences(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().map(|n| haystack.matches(n).count()).sum()
}

/// Keyword vote over free text. Positive only on a strict majority, so a tie
/// (including no keywords at all) reads as negative.
pub fn classify_text(text: &str) -> (Diagnosis, PolarityScore) {
    let tally = score(text);
    if tally.is_tie() {
        debug!(
            positive = tally.positive,
            negative = tally.negative,
            "Polarity tie resolved to negative"
        );
    }
    let diagnosis = if tally.positive > tally.negative {
        Diagnosis::PositiveFinding
    } else {
        Diagnosis::NegativeFinding
    };
    (diagnosis, tally)
}

/// Map an explicit diagnosis line, falling back to keyword scoring.
///
/// Without a diagnosis line the whole response is scored instead.
pub fn classify(diagnosis_text: Option<&str>, raw_text: &str) -> (Diagnosis, Option<PolarityScore>) {
    let Some(diagnosis_text) = diagnosis_text else {
        let (diagnosis, tally) = classify_text(raw_text);
        return (diagnosis, Some(tally));
    };

    let lower = diagnosis_text.to_lowercase();
    if lower.contains("no pneumonia") || lower.contains("normal") {
        return (Diagnosis::NegativeFinding, None);
    }
    if lower.contains("pneumonia detected") || lower.contains("consolidation") {
        return (Diagnosis::PositiveFinding, None);
    }
    if HEDGES.iter().any(|h| lower.contains(h)) {
        return (Diagnosis::Indeterminate, None);
    }

    let tally = score(diagnosis_text);
    if tally.positive == 0 && tally.negative == 0 {
        return (Diagnosis::Indeterminate, Some(tally));
    }
    let (diagnosis, tally) = classify_text(diagnosis_text);
    (diagnosis, Some(tally))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_occurrence() {
        let tally = score("Pneumonia. Right lower lobe pneumonia with consolidation.");
        assert_eq!(tally.positive, 3);
        assert_eq!(tally.negative, 0);
    }

    #[test]
    fn tie_resolves_to_negative() {
        let (diagnosis, tally) = classify_text("pneumonia or normal");
        assert_eq!(tally, PolarityScore { positive: 1, negative: 1 });
        assert_eq!(diagnosis, Diagnosis::NegativeFinding);

        let (diagnosis, _) = classify_text("");
        assert_eq!(diagnosis, Diagnosis::NegativeFinding);
    }

    #[test]
    fn explicit_text_rules_in_order() {
        assert_eq!(
            classify(Some("No pneumonia detected"), "").0,
            Diagnosis::NegativeFinding
        );
        assert_eq!(
            classify(Some("Right lower lobe consolidation"), "").0,
            Diagnosis::PositiveFinding
        );
        assert_eq!(
            classify(Some("Questionable early infiltrate"), "").0,
            Diagnosis::Indeterminate
        );
        assert_eq!(
            classify(Some("Bacterial infection likely"), "").0,
            Diagnosis::PositiveFinding
        );
        assert_eq!(classify(Some("See report"), "").0, Diagnosis::Indeterminate);
    }

    #[test]
    fn absent_field_scores_whole_text() {
        let (diagnosis, tally) = classify(None, "Dense opacity and infiltrate, abnormal study");
        assert_eq!(diagnosis, Diagnosis::PositiveFinding);
        assert_eq!(tally.map(|t| t.positive), Some(3));
    }
}
