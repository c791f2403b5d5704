//! One parser for every prompt variant.
//!
//! [`parse`] never fails: any field it cannot locate takes the documented
//! default from the variant's [`ParserProfile`], and confidence is always
//! clamped into `0..=100`.

pub mod confidence;
pub mod fields;
pub mod polarity;
pub mod profile;
pub mod steps;

use chrono::Utc;

use crate::models::{NarrativeSection, ParsedFinding};
use confidence::ConfidenceSource;
use fields::FieldMatch;

pub use fields::{MatchStyle, extract_field, find_field};
pub use profile::{DiagnosisRule, FieldDefault, FieldSpec, ParserProfile};

fn find_any(text: &str, labels: &[&str], style: MatchStyle) -> Option<FieldMatch> {
    labels
        .iter()
        .find_map(|label| find_field(text, label, style))
}

fn confidence_for(profile: &ParserProfile, text: &str) -> Option<u64> {
    let rule = &profile.confidence;
    match rule.source {
        ConfidenceSource::Field => {
            let field = find_any(text, rule.labels, profile.style);
            confidence::from_field(field.as_ref().map(|m| m.value.as_str()))
        }
        ConfidenceSource::FreeText => confidence::from_free_text(text),
        ConfidenceSource::General => confidence::from_general_text(text),
    }
}

pub fn parse(profile: &ParserProfile, text: &str) -> ParsedFinding {
    let (diagnosis_text, explicit) = match &profile.diagnosis {
        DiagnosisRule::Field(spec) => match find_any(text, spec.labels, profile.style) {
            Some(found) => (found.value.clone(), Some(found.value)),
            None => (spec.default.resolve(text), None),
        },
        DiagnosisRule::Reasoning { default } => {
            let concluded = steps::final_diagnosis(text);
            let concluded = if concluded.is_empty() {
                (*default).to_string()
            } else {
                concluded
            };
            (concluded.clone(), Some(concluded))
        }
        DiagnosisRule::Polarity => (String::new(), None),
    };

    let (diagnosis, polarity) = polarity::classify(explicit.as_deref(), text);
    let diagnosis_text = match profile.diagnosis {
        DiagnosisRule::Polarity => diagnosis.headline().to_string(),
        _ => diagnosis_text,
    };

    let confidence = confidence_for(profile, text);
    let confidence_percent = confidence
        .map(confidence::clamp_percent)
        .unwrap_or(profile.confidence.default);

    let mut found = Vec::new();
    let mut defaulted = Vec::new();
    for spec in profile.sections {
        match find_any(text, spec.labels, profile.style) {
            Some(m) => found.push((
                m.start,
                NarrativeSection {
                    name: spec.name.to_string(),
                    text: m.value,
                    defaulted: false,
                },
            )),
            None => defaulted.push(NarrativeSection {
                name: spec.name.to_string(),
                text: spec.default.resolve(text),
                defaulted: true,
            }),
        }
    }
    found.sort_by_key(|(start, _)| *start);
    let sections = found
        .into_iter()
        .map(|(_, section)| section)
        .chain(defaulted)
        .collect();

    ParsedFinding {
        diagnosis,
        diagnosis_text,
        confidence_percent,
        confidence_defaulted: confidence.is_none(),
        polarity,
        sections,
        steps: if profile.steps {
            steps::extract_steps(text)
        } else {
            Vec::new()
        },
        raw_text: text.to_string(),
        parsed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::profile::*;
    use super::*;
    use crate::models::Diagnosis;

    #[test]
    fn zero_shot_negative_scenario() {
        let finding = parse(&ZERO_SHOT, "DIAGNOSIS: No pneumonia detected\nCONFIDENCE: 88%");
        assert_eq!(finding.diagnosis, Diagnosis::NegativeFinding);
        assert_eq!(finding.confidence_percent, 88);
        assert_eq!(finding.diagnosis_text, "No pneumonia detected");
    }

    #[test]
    fn empty_text_defaults_everything() {
        for profile in [&ZERO_SHOT, &ONE_SHOT, &MULTI_SHOT, &ADAPTIVE_INITIAL] {
            let finding = parse(profile, "");
            assert_eq!(finding.confidence_percent, 0, "{}", profile.name);
            assert!(finding.confidence_defaulted);
            assert!(finding.sections.iter().all(|s| s.defaulted));
            assert_eq!(finding.diagnosis_text, "Unable to determine");
        }

        let general = parse(&GENERAL, "");
        assert_eq!(general.confidence_percent, 75);
        assert_eq!(general.diagnosis, Diagnosis::NegativeFinding);
    }

    #[test]
    fn zero_shot_defaults_are_named() {
        let finding = parse(&ZERO_SHOT, "DIAGNOSIS: Pneumonia detected");
        assert_eq!(finding.section("Reasoning"), Some("No reasoning provided"));
        assert_eq!(
            finding.section("Recommendations"),
            Some("Consult healthcare professional")
        );
        assert_eq!(finding.diagnosis, Diagnosis::PositiveFinding);
    }

    #[test]
    fn confidence_is_always_in_range() {
        let inputs = [
            "CONFIDENCE: 250%",
            "CONFIDENCE: 99999999999999999999999999",
            "Confidence: -5",
            "no digits at all",
            "DIAGNOSIS: x\nCONFIDENCE: 101",
        ];
        for text in inputs {
            for profile in [&ZERO_SHOT, &ONE_SHOT, &MULTI_SHOT, &CHAIN_OF_THOUGHT, &GENERAL] {
                assert!(parse(profile, text).confidence_percent <= 100);
            }
        }
    }

    #[test]
    fn sections_follow_order_of_appearance() {
        let text = "Recommendations: Repeat film\nPattern Type: Lobar\nPrimary Diagnosis: Bacterial pneumonia\nConfidence: 91%";
        let finding = parse(&MULTI_SHOT, text);
        let names: Vec<_> = finding.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Recommendations", "Pattern Type", "Clinical Reasoning"]
        );
        assert!(finding.sections[2].defaulted);
        assert_eq!(finding.confidence_percent, 91);
    }

    #[test]
    fn multi_shot_falls_back_to_alias() {
        let finding = parse(&MULTI_SHOT, "DIAGNOSIS: Consolidation in the left lower lobe");
        assert_eq!(
            finding.diagnosis_text,
            "Consolidation in the left lower lobe"
        );
        assert_eq!(finding.diagnosis, Diagnosis::PositiveFinding);
    }

    #[test]
    fn chain_of_thought_collects_steps_and_free_text_confidence() {
        let finding = parse(&CHAIN_OF_THOUGHT, steps::FULL_CHAIN);
        assert_eq!(finding.steps.len(), 8);
        assert_eq!(finding.confidence_percent, 87);
    }

    #[test]
    fn general_profile_reports_headline_and_tally() {
        let finding = parse(
            &GENERAL,
            "There is a dense opacity suggesting pneumonia. Confidence: 85",
        );
        assert_eq!(finding.diagnosis, Diagnosis::PositiveFinding);
        assert_eq!(finding.diagnosis_text, "PNEUMONIA DETECTED");
        assert_eq!(finding.confidence_percent, 85);
        assert!(finding.polarity.is_some());
    }

    #[test]
    fn contextual_follow_up_uses_excerpt_default() {
        let text = "x".repeat(300);
        let finding = parse(&FOLLOW_UP_CONTEXTUAL, &text);
        assert_eq!(finding.diagnosis_text.len(), 203);
        assert!(finding.diagnosis_text.ends_with("..."));
        assert_eq!(
            finding.section("Recommendations"),
            Some("Follow clinical protocols")
        );
    }
}
