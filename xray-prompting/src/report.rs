//! Plain-text reports for download or terminal output.

use crate::analyzer::AnalysisOutcome;
use crate::models::{AnalysisSession, ParsedFinding};

const DISCLAIMER: &str = "This AI analysis is for educational purposes only and should not replace\n\
professional medical diagnosis. Always consult qualified healthcare\n\
professionals for medical decisions.";

/// What the report says about the uploaded file.
#[derive(Debug, Clone, Default)]
pub struct ImageSummary {
    pub name: Option<String>,
    pub size_bytes: usize,
}

fn heading(title: &str) -> String {
    format!("{title}\n{}", "-".repeat(title.len()))
}

fn header(finding: &ParsedFinding, image: Option<&ImageSummary>) -> Vec<String> {
    let mut lines = vec![
        "AI PNEUMONIA DETECTION REPORT".to_string(),
        "=".repeat(28),
        String::new(),
        format!(
            "Analysis Date: {}",
            finding.parsed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ];
    if let Some(image) = image {
        if let Some(name) = &image.name {
            lines.push(format!("Image File: {name}"));
        }
        lines.push(format!(
            "Image Size: {:.1} KB",
            image.size_bytes as f64 / 1024.0
        ));
    }
    lines.push(String::new());
    lines
}

fn diagnosis_block(finding: &ParsedFinding, analysis_type: &str) -> Vec<String> {
    vec![
        heading("DIAGNOSIS"),
        format!("Result: {}", finding.diagnosis.headline()),
        format!("Confidence Level: {}%", finding.confidence_percent),
        format!("Analysis Type: {analysis_type}"),
        String::new(),
    ]
}

fn footer() -> Vec<String> {
    vec![
        heading("DISCLAIMER"),
        DISCLAIMER.to_string(),
        String::new(),
        "Generated by AI Pneumonia Detection System".to_string(),
    ]
}

/// Report for a single-call analysis.
pub fn render_report(outcome: &AnalysisOutcome, image: &ImageSummary) -> String {
    let finding = &outcome.finding;
    let mut lines = header(finding, Some(image));
    lines.extend(diagnosis_block(finding, outcome.variant.label()));
    lines.extend([
        heading("AI ASSESSMENT"),
        finding.raw_text.trim().to_string(),
        String::new(),
        heading("TECHNICAL DETAILS"),
        format!("AI Model Temperature: {}", outcome.temperature),
        format!("Tokens Used: {}", outcome.tokens_used),
        format!("Prompt Type: {}", outcome.variant),
        String::new(),
    ]);
    lines.extend(footer());
    lines.join("\n")
}

/// Report for an adaptive session: every step in order, then totals.
/// Returns `None` while the session has no completed step.
pub fn render_adaptive_report(session: &AnalysisSession) -> Option<String> {
    let last = session.steps.last()?;
    let mut lines = header(&last.finding, None);
    lines.push(format!("Session: {}", session.session_id));
    lines.push(String::new());
    lines.extend(diagnosis_block(&last.finding, "Adaptive Multi-Step Analysis"));

    lines.push(heading("ANALYSIS STEPS"));
    for (i, step) in session.steps.iter().enumerate() {
        lines.push(format!(
            "Step {}: {} ({} ms, {} tokens)",
            i + 1,
            step.label,
            step.elapsed_ms,
            step.tokens_used
        ));
        lines.push(format!(
            "Diagnosis: {} ({}% confidence)",
            step.finding.diagnosis_text, step.finding.confidence_percent
        ));
        lines.push(step.finding.raw_text.trim().to_string());
        lines.push(String::new());
    }

    lines.push(heading("TECHNICAL DETAILS"));
    if let Some(complexity) = session.complexity {
        lines.push(format!("Complexity: {complexity}"));
    }
    if let Some(follow_up) = session.follow_up {
        lines.push(format!("Follow-up: {follow_up}"));
    }
    lines.push(format!("Total Tokens: {}", session.total_tokens()));
    lines.push(format!("Total Time: {} ms", session.total_elapsed_ms()));
    lines.push(String::new());
    lines.extend(footer());
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AdaptiveState, ComplexityClass, FollowUpCategory, PatientContext, PromptVariant,
        StepRecord,
    };
    use crate::parser::{self, ParserProfile};
    use chrono::Utc;

    fn outcome() -> AnalysisOutcome {
        let text = "DIAGNOSIS: Pneumonia detected\nCONFIDENCE: 81%\nREASONING: Right lower lobe consolidation.";
        AnalysisOutcome {
            variant: PromptVariant::ZeroShot,
            finding: parser::parse(ParserProfile::for_variant(PromptVariant::ZeroShot), text),
            tokens_used: 512,
            elapsed_ms: 1800,
            temperature: 0.3,
            extras: None,
        }
    }

    #[test]
    fn single_report_sections() {
        let report = render_report(
            &outcome(),
            &ImageSummary {
                name: Some("chest.png".into()),
                size_bytes: 2048,
            },
        );
        assert!(report.starts_with("AI PNEUMONIA DETECTION REPORT\n============================\n"));
        assert!(report.contains("Image File: chest.png"));
        assert!(report.contains("Image Size: 2.0 KB"));
        assert!(report.contains("DIAGNOSIS\n---------\nResult: PNEUMONIA DETECTED"));
        assert!(report.contains("Confidence Level: 81%"));
        assert!(report.contains("Analysis Type: Zero-Shot Prompting"));
        assert!(report.contains("Tokens Used: 512"));
        assert!(report.contains("Prompt Type: zero-shot"));
        assert!(report.ends_with("Generated by AI Pneumonia Detection System"));
    }

    #[test]
    fn adaptive_report_lists_steps_and_totals() {
        let profile = ParserProfile::for_follow_up(FollowUpCategory::Pathology);
        let finding = parser::parse(profile, "Detailed Diagnosis: Lobar pneumonia\nConfidence: 85%");
        let step = |label: &str, ms, tokens| StepRecord {
            label: label.to_string(),
            finding: finding.clone(),
            elapsed_ms: ms,
            tokens_used: tokens,
        };
        let session = AnalysisSession {
            session_id: "abc".into(),
            state: AdaptiveState::Complete,
            patient_context: PatientContext::default(),
            complexity: Some(ComplexityClass::Medium),
            follow_up: Some(FollowUpCategory::Pathology),
            steps: vec![
                step("Initial Assessment", 1200, 800),
                step("Follow-up: pathology-followup", 1500, 900),
            ],
            error: None,
            created_at: Utc::now(),
        };

        let report = render_adaptive_report(&session).unwrap();
        assert!(report.contains("Step 1: Initial Assessment (1200 ms, 800 tokens)"));
        assert!(report.contains("Step 2: Follow-up: pathology-followup"));
        assert!(report.contains("Complexity: medium"));
        assert!(report.contains("Total Tokens: 1700"));
        assert!(report.contains("Total Time: 2700 ms"));
    }

    #[test]
    fn adaptive_report_needs_a_step() {
        let session = AnalysisSession {
            session_id: "abc".into(),
            state: AdaptiveState::Failed,
            patient_context: PatientContext::default(),
            complexity: None,
            follow_up: None,
            steps: Vec::new(),
            error: Some("Initial assessment failed".into()),
            created_at: Utc::now(),
        };
        assert!(render_adaptive_report(&session).is_none());
    }
}
