//! Heuristic scores attached to single-call outcomes, one per prompt variant.
//!
//! These are keyword tallies over the response text. They describe how
//! closely a response follows its prompt, not whether the diagnosis is right.

use serde::{Deserialize, Serialize};

use crate::models::PromptVariant;
use crate::parser::{confidence, steps};

const EXAMPLE_HEADINGS: [&str; 10] = [
    "TECHNICAL ASSESSMENT",
    "SYSTEMATIC EXAMINATION",
    "HEART",
    "BILATERAL LUNG",
    "PLEURAL SPACES",
    "RADIOLOGICAL FINDINGS",
    "CLINICAL INTERPRETATION",
    "CLINICAL REASONING",
    "KEY SUPPORTING EVIDENCE",
    "CLINICAL RECOMMENDATIONS",
];

const EXAMPLE_TERMS: [&str; 11] = [
    "consolidation",
    "air bronchograms",
    "opacity",
    "infiltrates",
    "pleural effusion",
    "costophrenic",
    "bilateral",
    "lobar",
    "vascular markings",
    "mediastinal",
    "cardiothoracic ratio",
];

/// Reference patterns shown in the multi-shot prompt, in prompt order.
const REFERENCE_PATTERNS: [(&str, [&str; 5]); 4] = [
    (
        "normal",
        ["clear", "normal", "no consolidation", "no pneumonia", "bilateral clear"],
    ),
    (
        "bacterial",
        ["consolidation", "air bronchograms", "lobar", "dense", "homogeneous"],
    ),
    (
        "viral",
        ["bilateral", "interstitial", "patchy", "infiltrates", "perihilar"],
    ),
    (
        "subtle",
        ["subtle", "mild", "early", "immunocompromised", "ill-defined"],
    ),
];

const SYNTHESIS_INDICATORS: [&str; 8] = [
    "systematic",
    "bilateral",
    "clinical correlation",
    "differential",
    "compared to",
    "similar to",
    "consistent with",
    "pattern",
];

const REQUIRED_ELEMENTS: [&str; 9] = [
    "technical",
    "quality",
    "lung",
    "cardiac",
    "pattern",
    "differential",
    "evidence",
    "diagnosis",
    "confidence",
];

const PROGRESSION_WORDS: [&str; 7] = [
    "first",
    "next",
    "then",
    "therefore",
    "based on",
    "given",
    "considering",
];

const REASONING_TERMS: [&str; 14] = [
    "consolidation",
    "infiltrate",
    "opacity",
    "bronchogram",
    "pneumonia",
    "radiograph",
    "lobe",
    "bilateral",
    "unilateral",
    "pathology",
    "differential",
    "etiology",
    "pathophysiology",
    "diagnosis",
];

const TEACHING_INDICATORS: [&str; 10] = [
    "explain",
    "demonstrate",
    "shows",
    "indicates",
    "suggests",
    "typical",
    "characteristic",
    "pathognomonic",
    "because",
    "since",
];

const REASONING_PHRASES: [&str; 5] = [
    "i observe",
    "i notice",
    "this shows",
    "this indicates",
    "my reasoning",
];

/// Number of needles present at least once in `haystack`.
fn present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn percent(hits: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (hits as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleAdherence {
    pub structure_adherence: u32,
    pub found_structures: Vec<String>,
    pub terminology_usage: u32,
    pub professional_format: bool,
    pub systematic_approach: bool,
    pub comprehensive: bool,
}

/// How closely a one-shot response mirrors the worked example's layout.
pub fn example_adherence(text: &str) -> ExampleAdherence {
    let found_structures: Vec<String> = EXAMPLE_HEADINGS
        .iter()
        .filter(|h| text.contains(*h))
        .map(|h| h.to_string())
        .collect();
    let lower = text.to_lowercase();

    ExampleAdherence {
        structure_adherence: percent(found_structures.len(), EXAMPLE_HEADINGS.len()),
        found_structures,
        terminology_usage: percent(present(&lower, &EXAMPLE_TERMS), EXAMPLE_TERMS.len()),
        professional_format: text.contains("DIAGNOSIS:") && text.contains("CONFIDENCE:"),
        systematic_approach: text.contains("SYSTEMATIC") || text.contains("BILATERAL"),
        comprehensive: text.len() > 500,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub pattern: String,
    pub raw_score: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAlignment {
    pub pattern: String,
    pub confidence: u64,
    pub expected_range: (u64, u64),
    pub is_appropriate: bool,
    pub assessment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisQuality {
    pub score: u32,
    pub indicators: usize,
    pub grade: SynthesisGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInfluence {
    pub scores: Vec<PatternScore>,
    pub most_influential: String,
    pub total_matches: usize,
    pub alignment: ConfidenceAlignment,
    pub diversity_index: f64,
    pub synthesis: SynthesisQuality,
}

fn expected_range(pattern: &str) -> (u64, u64) {
    match pattern {
        "normal" => (90, 98),
        "bacterial" => (85, 95),
        "viral" => (75, 90),
        "subtle" => (65, 80),
        _ => (70, 90),
    }
}

fn align_confidence(pattern: &str, confidence: u64) -> ConfidenceAlignment {
    let expected_range = expected_range(pattern);
    let is_appropriate = (expected_range.0..=expected_range.1).contains(&confidence);
    let assessment = if is_appropriate {
        format!("Confidence appropriately calibrated for {pattern} pattern presentation")
    } else {
        let direction = if confidence > 85 { "too high" } else { "too low" };
        format!("Confidence may be {direction} for {pattern} pattern")
    };
    ConfidenceAlignment {
        pattern: pattern.to_string(),
        confidence,
        expected_range,
        is_appropriate,
        assessment,
    }
}

fn synthesis_quality(lower: &str) -> SynthesisQuality {
    let indicators = present(lower, &SYNTHESIS_INDICATORS);
    let grade = match indicators {
        6.. => SynthesisGrade::Excellent,
        4..=5 => SynthesisGrade::Good,
        2..=3 => SynthesisGrade::Fair,
        _ => SynthesisGrade::Poor,
    };
    SynthesisQuality {
        score: percent(indicators, SYNTHESIS_INDICATORS.len()),
        indicators,
        grade,
    }
}

/// Which multi-shot reference patterns the response echoes.
pub fn pattern_influence(text: &str) -> PatternInfluence {
    let lower = text.to_lowercase();
    let scores: Vec<PatternScore> = REFERENCE_PATTERNS
        .iter()
        .map(|(pattern, keywords)| {
            let raw_score = present(&lower, keywords);
            PatternScore {
                pattern: pattern.to_string(),
                raw_score,
                percentage: percent(raw_score, keywords.len()),
            }
        })
        .collect();

    // Ties go to the later pattern.
    let most_influential = scores
        .iter()
        .reduce(|best, next| if best.raw_score > next.raw_score { best } else { next })
        .map(|s| s.pattern.clone())
        .unwrap_or_default();

    let total_matches = scores.iter().map(|s| s.raw_score).sum();
    let contributing = scores.iter().filter(|s| s.raw_score > 0).count();
    let confidence = confidence::from_field(Some(text)).unwrap_or(0);

    PatternInfluence {
        alignment: align_confidence(&most_influential, confidence),
        diversity_index: contributing as f64 / REFERENCE_PATTERNS.len() as f64 * 100.0,
        synthesis: synthesis_quality(&lower),
        scores,
        most_influential,
        total_matches,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningQuality {
    pub completeness: u32,
    pub logical_flow: u32,
    pub terminology: u32,
    pub educational_value: u32,
    pub transparency: u32,
    pub overall: u32,
}

/// Scores a chain-of-thought response on how much of its reasoning it shows.
pub fn reasoning_quality(text: &str) -> ReasoningQuality {
    let lower = text.to_lowercase();
    let structured = steps::extract_steps(text).len() >= 6;

    let completeness = percent(present(&lower, &REQUIRED_ELEMENTS), REQUIRED_ELEMENTS.len());

    let progression = present(&lower, &PROGRESSION_WORDS) as u32;
    let logical_flow = (u32::from(structured) * 30 + (progression * 10).min(70)).min(100);

    let terminology = percent(present(&lower, &REASONING_TERMS), REASONING_TERMS.len());
    let educational_value = percent(present(&lower, &TEACHING_INDICATORS), TEACHING_INDICATORS.len());

    let phrases = present(&lower, &REASONING_PHRASES) as u32;
    let transparency = (u32::from(structured) * 40 + (phrases * 15).min(60)).min(100);

    let sum = completeness + logical_flow + terminology + educational_value + transparency;
    ReasoningQuality {
        completeness,
        logical_flow,
        terminology,
        educational_value,
        transparency,
        overall: (sum as f64 / 5.0).round() as u32,
    }
}

/// Variant-specific scores carried on an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantExtras {
    ExampleAdherence(ExampleAdherence),
    PatternInfluence(PatternInfluence),
    ReasoningQuality(ReasoningQuality),
}

impl VariantExtras {
    pub fn for_variant(variant: PromptVariant, text: &str) -> Option<Self> {
        match variant {
            PromptVariant::OneShot => Some(Self::ExampleAdherence(example_adherence(text))),
            PromptVariant::MultiShot => Some(Self::PatternInfluence(pattern_influence(text))),
            PromptVariant::ChainOfThought => {
                Some(Self::ReasoningQuality(reasoning_quality(text)))
            }
            PromptVariant::ZeroShot | PromptVariant::Dynamic => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::steps::FULL_CHAIN;

    #[test]
    fn adherence_counts_reproduced_headings() {
        let text = "TECHNICAL ASSESSMENT:\nGood film.\nSYSTEMATIC EXAMINATION:\nBILATERAL LUNG FIELD ANALYSIS: consolidation with air bronchograms\nDIAGNOSIS: Pneumonia detected\nCONFIDENCE: 90%";
        let adherence = example_adherence(text);
        assert_eq!(adherence.structure_adherence, 30);
        assert_eq!(
            adherence.found_structures,
            vec!["TECHNICAL ASSESSMENT", "SYSTEMATIC EXAMINATION", "BILATERAL LUNG"]
        );
        // consolidation, air bronchograms, bilateral
        assert_eq!(adherence.terminology_usage, 27);
        assert!(adherence.professional_format);
        assert!(adherence.systematic_approach);
        assert!(!adherence.comprehensive);
    }

    #[test]
    fn headings_are_case_sensitive() {
        let adherence = example_adherence("technical assessment and heart");
        assert_eq!(adherence.structure_adherence, 0);
        assert!(!adherence.professional_format);
    }

    #[test]
    fn bacterial_pattern_wins_with_calibrated_confidence() {
        let text = "Primary Diagnosis: Pneumonia detected\nConfidence: 91%\nPattern Type: Dense lobar consolidation with air bronchograms, consistent with example 2";
        let influence = pattern_influence(text);
        assert_eq!(influence.most_influential, "bacterial");
        assert_eq!(influence.scores[1].raw_score, 4);
        assert_eq!(influence.scores[1].percentage, 80);
        assert_eq!(influence.alignment.confidence, 91);
        assert!(influence.alignment.is_appropriate);
        assert_eq!(
            influence.alignment.assessment,
            "Confidence appropriately calibrated for bacterial pattern presentation"
        );
    }

    #[test]
    fn tie_goes_to_later_pattern() {
        // "clear" scores normal, "patchy" scores viral.
        let influence = pattern_influence("clear apices, patchy bases");
        assert_eq!(influence.scores[0].raw_score, 1);
        assert_eq!(influence.scores[2].raw_score, 1);
        assert_eq!(influence.most_influential, "viral");
        assert_eq!(influence.diversity_index, 50.0);
    }

    #[test]
    fn miscalibrated_confidence_is_flagged() {
        let influence = pattern_influence("Subtle mild early opacity. Confidence: 95%");
        assert_eq!(influence.most_influential, "subtle");
        assert!(!influence.alignment.is_appropriate);
        assert_eq!(
            influence.alignment.assessment,
            "Confidence may be too high for subtle pattern"
        );
    }

    #[test]
    fn synthesis_grades() {
        assert_eq!(pattern_influence("nothing").synthesis.grade, SynthesisGrade::Poor);
        let good = pattern_influence(
            "Systematic review, bilateral findings, pattern similar to example 3, consistent with viral",
        );
        assert_eq!(good.synthesis.indicators, 5);
        assert_eq!(good.synthesis.grade, SynthesisGrade::Good);
    }

    #[test]
    fn structured_chain_scores_flow_and_transparency() {
        let quality = reasoning_quality(FULL_CHAIN);
        // eight steps plus "therefore"
        assert_eq!(quality.logical_flow, 40);
        assert_eq!(quality.transparency, 40);
        assert!(quality.completeness >= 80);
    }

    #[test]
    fn unstructured_text_scores_low() {
        let quality = reasoning_quality("Looks fine.");
        assert_eq!(quality.logical_flow, 0);
        assert_eq!(quality.transparency, 0);
        assert_eq!(quality.overall, 0);
    }

    #[test]
    fn extras_only_for_scored_variants() {
        assert!(VariantExtras::for_variant(PromptVariant::ZeroShot, "x").is_none());
        assert!(VariantExtras::for_variant(PromptVariant::Dynamic, "x").is_none());
        assert!(matches!(
            VariantExtras::for_variant(PromptVariant::ChainOfThought, FULL_CHAIN),
            Some(VariantExtras::ReasoningQuality(_))
        ));
    }
}
