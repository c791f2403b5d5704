use crate::models::{ComplexityClass, FollowUpCategory, PatientContext};

fn mentions(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Pick the follow-up for an initial assessment. The rules are checked in
/// order and the first match wins.
pub fn select_follow_up(
    diagnosis_text: &str,
    complexity: ComplexityClass,
    patient: &PatientContext,
) -> FollowUpCategory {
    let diagnosis = diagnosis_text.to_lowercase();

    if mentions(&diagnosis, &["normal", "no pneumonia"]) {
        return FollowUpCategory::Normal;
    }
    if mentions(&diagnosis, &["pneumonia detected", "consolidation"]) {
        return FollowUpCategory::Pathology;
    }
    if mentions(&diagnosis, &["questionable", "subtle"]) || complexity == ComplexityClass::High {
        return FollowUpCategory::Ambiguous;
    }

    match patient.known_age() {
        Some(age) if age < 18 => return FollowUpCategory::Pediatric,
        Some(age) if age >= 65 => return FollowUpCategory::Elderly,
        _ => {}
    }
    if patient.is_immunocompromised() {
        return FollowUpCategory::Immunocompromised;
    }
    if patient.is_emergency() {
        return FollowUpCategory::Emergency;
    }
    FollowUpCategory::Pathology
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aged(age: u32) -> PatientContext {
        PatientContext {
            age: Some(age),
            ..Default::default()
        }
    }

    #[test]
    fn diagnosis_outranks_patient_context() {
        // A child with a clear film still gets the normal follow-up.
        assert_eq!(
            select_follow_up("No pneumonia detected", ComplexityClass::Low, &aged(10)),
            FollowUpCategory::Normal
        );
        assert_eq!(
            select_follow_up("Right lower lobe consolidation", ComplexityClass::High, &aged(80)),
            FollowUpCategory::Pathology
        );
    }

    #[test]
    fn hedged_or_complex_goes_ambiguous() {
        assert_eq!(
            select_follow_up("Questionable left base opacity", ComplexityClass::Low, &aged(70)),
            FollowUpCategory::Ambiguous
        );
        assert_eq!(
            select_follow_up("Findings as described", ComplexityClass::High, &aged(70)),
            FollowUpCategory::Ambiguous
        );
    }

    #[test]
    fn patient_rules_in_order() {
        let neutral = "Findings as described";
        assert_eq!(
            select_follow_up(neutral, ComplexityClass::Medium, &aged(12)),
            FollowUpCategory::Pediatric
        );
        assert_eq!(
            select_follow_up(neutral, ComplexityClass::Medium, &aged(65)),
            FollowUpCategory::Elderly
        );

        let patient = PatientContext {
            age: Some(40),
            medical_history: Some("Immunocompromised".into()),
            urgency: Some("emergency".into()),
            ..Default::default()
        };
        assert_eq!(
            select_follow_up(neutral, ComplexityClass::Low, &patient),
            FollowUpCategory::Immunocompromised
        );

        let patient = PatientContext {
            urgency: Some("emergency".into()),
            ..Default::default()
        };
        assert_eq!(
            select_follow_up(neutral, ComplexityClass::Low, &patient),
            FollowUpCategory::Emergency
        );
    }

    #[test]
    fn unknown_age_falls_through_to_pathology() {
        assert_eq!(
            select_follow_up("Findings as described", ComplexityClass::Low, &aged(0)),
            FollowUpCategory::Pathology
        );
    }
}
