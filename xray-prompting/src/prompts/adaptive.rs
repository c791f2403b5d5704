//! Templates for the two-call adaptive analysis.

use super::template::{PromptTemplate, Slot};
use crate::models::{FollowUpCategory, ParsedFinding, PatientContext};

const CONTEXT_ONLY: &[Slot] = &[Slot::PatientContext];
const CONTEXT_AND_FINDINGS: &[Slot] = &[Slot::PatientContext, Slot::PreviousFindings];

pub const INITIAL: PromptTemplate = PromptTemplate::new(
    "initial",
    r#"You are an expert radiologist performing the INITIAL ASSESSMENT of a chest X-ray for pneumonia.

{PATIENT_CONTEXT}

This is the first of two steps. Perform a systematic initial assessment and judge how complex the case is so the follow-up can be chosen.

INITIAL ASSESSMENT:
1. Technical quality
2. Overall impression, normal or abnormal
3. Survey of both lung fields
4. Cardiac and mediastinal assessment
5. Preliminary diagnostic impression

COMPLEXITY:
- Simple: clearly normal or obvious pathology
- Moderate: a standard pneumonia pattern
- Complex: multiple or bilateral findings, complications or subtle changes

Answer in this format:
Primary Diagnosis: [clear statement]
Confidence: [percentage]
Complexity Level: [Simple/Moderate/Complex]
Key Findings: [brief summary]
Recommended Follow-up: [type of further analysis needed]
Clinical Reasoning: [initial thought process]

Adjust for the patient context: age-appropriate normals, symptom correlation and risk factors."#,
    CONTEXT_ONLY,
);

pub const NORMAL_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "normal-followup",
    r#"You are an expert radiologist reviewing a study whose initial assessment was normal.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Look again with enhanced scrutiny for:
1. Subtle early pneumonia
2. Age-appropriate normal variants
3. Technical factors that could hide pathology
4. Correlation with the clinical picture

Review the lung bases and periphery, minimal infiltrates or ground-glass change, and the vascular markings. Calibrate confidence to the symptoms, risk factors and image quality.

Final Assessment: [confirmed normal, or further imaging advised]
Clinical Correlation: [how the findings fit the presentation]
Recommendations: [next steps if any]"#,
    CONTEXT_AND_FINDINGS,
);

pub const PATHOLOGY_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "pathology-followup",
    r#"You are an expert radiologist performing a COMPREHENSIVE PATHOLOGY ANALYSIS after abnormal initial findings.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Building on the initial findings, describe:
- Consolidation: distribution (lobar, segmental, patchy), density, air bronchograms, margins
- Classification: bacterial or viral pattern, typical or atypical presentation
- Complications: pleural effusion, cavitation, multi-lobar involvement, signs of respiratory failure
- Severity: extent of involvement and likely impact on oxygenation
- Treatment: antibiotic considerations, need for admission, monitoring

Detailed Diagnosis: [full pathology description]
Severity Assessment: [Mild/Moderate/Severe with justification]
Complications: [present or absent, with details]
Treatment Recommendations: [evidence-based guidance]"#,
    CONTEXT_AND_FINDINGS,
);

pub const AMBIGUOUS_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "ambiguous-followup",
    r#"You are an expert radiologist resolving an UNCERTAIN initial assessment.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Re-evaluate systematically:
- Alternative diagnoses and technical causes of the uncertainty
- Pneumonia against other pulmonary conditions, acute against chronic change
- Correlation with symptoms, laboratory values and risk factors
- Immediate management, further studies and imaging timeline

Diagnostic Impression: [most likely diagnosis with alternatives]
Uncertainty Factors: [what makes the case difficult]
Clinical Correlation Needs: [specific information required]
Management Recommendations: [immediate and follow-up actions]"#,
    CONTEXT_AND_FINDINGS,
);

pub const PEDIATRIC_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "pediatric",
    r#"You are a pediatric radiologist performing a PEDIATRIC-SPECIFIC ANALYSIS.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Account for age-appropriate normals (thymus, heart size by age, bronchial wall thickness), pediatric patterns (viral predominance, round pneumonia, perihilar infiltrates, rapid progression), aspiration risk and congenital anomalies, and age-appropriate treatment and admission criteria.

Pediatric Assessment: [age-specific interpretation]
Development Considerations: [normal variants for age]
Treatment Adaptations: [pediatric-specific recommendations]
Family Guidance: [points for parents]"#,
    CONTEXT_AND_FINDINGS,
);

pub const ELDERLY_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "elderly",
    r#"You are a geriatric radiologist performing an ELDERLY-SPECIFIC ANALYSIS.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Separate chronic from acute change, consider positioning limits and background fibrosis or cardiomegaly, atypical and multi-lobar presentations, aspiration risk, and comorbidities such as COPD or heart failure.

Geriatric Assessment: [age-specific interpretation]
Comorbidity Impact: [how concurrent conditions affect the findings]
Functional Considerations: [impact on daily living]
Care Planning: [recommendations for an older patient]"#,
    CONTEXT_AND_FINDINGS,
);

pub const IMMUNOCOMPROMISED_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "immunocompromised",
    r#"You are a specialist radiologist analysing an IMMUNOCOMPROMISED patient.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Use a lower threshold for pathology, weigh subtle findings, and consider opportunistic organisms (PCP, fungal, viral) and rapid progression. Address intervention thresholds, isolation and intensified monitoring.

Immunocompromised Assessment: [high-sensitivity interpretation]
Infection Risk Stratification: [organism-specific considerations]
Treatment Urgency: [intervention timeline]
Monitoring Protocol: [enhanced surveillance plan]"#,
    CONTEXT_AND_FINDINGS,
);

pub const EMERGENCY_FOLLOW_UP: PromptTemplate = PromptTemplate::new(
    "emergency",
    r#"You are an emergency radiologist performing an URGENT PNEUMONIA ASSESSMENT.

{PATIENT_CONTEXT}

{PREVIOUS_FINDINGS}

Prioritise life-threatening findings, sepsis and respiratory failure indicators, ICU admission criteria, immediate antibiotic and respiratory support needs, and critical result communication.

Emergency Assessment: [urgent clinical interpretation]
Critical Findings: [life-threatening features]
Immediate Actions: [time-sensitive interventions]
Communication Plan: [urgent notification requirements]"#,
    CONTEXT_AND_FINDINGS,
);

pub fn follow_up_template(category: FollowUpCategory) -> &'static PromptTemplate {
    match category {
        FollowUpCategory::Normal => &NORMAL_FOLLOW_UP,
        FollowUpCategory::Pathology => &PATHOLOGY_FOLLOW_UP,
        FollowUpCategory::Ambiguous => &AMBIGUOUS_FOLLOW_UP,
        FollowUpCategory::Pediatric => &PEDIATRIC_FOLLOW_UP,
        FollowUpCategory::Elderly => &ELDERLY_FOLLOW_UP,
        FollowUpCategory::Immunocompromised => &IMMUNOCOMPROMISED_FOLLOW_UP,
        FollowUpCategory::Emergency => &EMERGENCY_FOLLOW_UP,
    }
}

fn or_unspecified(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Not specified")
}

fn presence(flag: bool) -> &'static str {
    if flag { "Present" } else { "Not reported" }
}

pub fn format_patient_context(context: &PatientContext) -> String {
    let age = context
        .known_age()
        .map_or_else(|| "Not specified".to_string(), |a| a.to_string());
    [
        "PATIENT CONTEXT:".to_string(),
        format!("- Age: {age} years ({})", context.age_group()),
        format!("- Symptoms: {}", or_unspecified(context.symptoms.as_deref())),
        format!("- Onset: {}", or_unspecified(context.onset.as_deref())),
        format!("- Severity: {}", or_unspecified(context.severity.as_deref())),
        format!(
            "- Medical History: {}",
            or_unspecified(context.medical_history.as_deref())
        ),
        format!(
            "- Clinical Urgency: {}",
            or_unspecified(context.urgency.as_deref())
        ),
        format!("- Fever: {}", presence(context.fever)),
        format!("- Cough: {}", presence(context.cough)),
        format!("- Dyspnea: {}", presence(context.dyspnea)),
    ]
    .join("\n")
}

pub fn format_previous_findings(finding: &ParsedFinding) -> String {
    let section = |name: &str, fallback: &'static str| {
        finding
            .section(name)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    };
    [
        "PREVIOUS ASSESSMENT FINDINGS:".to_string(),
        format!("- Initial Diagnosis: {}", finding.diagnosis_text),
        format!("- Confidence: {}%", finding.confidence_percent),
        format!("- Pattern Type: {}", section("Pattern Type", "Not specified")),
        format!(
            "- Key Findings: {}",
            section("Key Findings", "See detailed analysis")
        ),
        format!(
            "- Complexity Assessment: {}",
            section("Complexity Level", "Standard")
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{self, profile::ADAPTIVE_INITIAL};
    use crate::prompts::TemplateValues;

    #[test]
    fn every_follow_up_declares_both_slots() {
        for category in FollowUpCategory::ALL {
            let template = follow_up_template(category);
            assert_eq!(template.name, category.as_str());
            assert_eq!(template.slots(), CONTEXT_AND_FINDINGS);
        }
    }

    #[test]
    fn initial_renders_without_placeholders() {
        let values = TemplateValues::new().with(
            Slot::PatientContext,
            format_patient_context(&PatientContext::default()),
        );
        let prompt = INITIAL.render(&values).unwrap();
        assert!(prompt.contains("- Age: Not specified years (Unspecified)"));
        assert!(!prompt.contains("{PATIENT_CONTEXT}"));
    }

    #[test]
    fn follow_up_without_findings_fails() {
        let values = TemplateValues::new().with(Slot::PatientContext, "ctx");
        assert!(PATHOLOGY_FOLLOW_UP.render(&values).is_err());
    }

    #[test]
    fn patient_context_block() {
        let context = PatientContext {
            age: Some(72),
            symptoms: Some("productive cough".into()),
            fever: true,
            ..Default::default()
        };
        let block = format_patient_context(&context);
        assert!(block.starts_with("PATIENT CONTEXT:\n- Age: 72 years (Elderly)"));
        assert!(block.contains("- Symptoms: productive cough"));
        assert!(block.contains("- Onset: Not specified"));
        assert!(block.contains("- Fever: Present"));
        assert!(block.contains("- Dyspnea: Not reported"));
    }

    #[test]
    fn previous_findings_block() {
        let finding = parser::parse(
            &ADAPTIVE_INITIAL,
            "Primary Diagnosis: Possible infiltrate\nConfidence: 64%\nComplexity Level: Complex",
        );
        let block = format_previous_findings(&finding);
        assert!(block.contains("- Initial Diagnosis: Possible infiltrate"));
        assert!(block.contains("- Confidence: 64%"));
        assert!(block.contains("- Pattern Type: Not specified"));
        assert!(block.contains("- Key Findings: See detailed analysis"));
        assert!(block.contains("- Complexity Assessment: Complex"));
    }
}
