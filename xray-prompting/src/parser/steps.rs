use regex::Regex;
use std::sync::LazyLock;

use crate::models::ReasoningStep;

static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("🔍|🫁|❤\u{FE0F}?|🔬|🧩|⚖\u{FE0F}?|🎯|✅").expect("valid step marker regex")
});

static CONCLUSIONS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)(?:diagnosis|conclusion|assessment)[^\n]*?:([^\n]*?)(?:\.|confidence|\z)",
        r"(?i)(?:final|my)[^\n]*?(?:diagnosis|conclusion)[^\n]*?:([^\n]*?)(?:\.|confidence|\z)",
        r"(?i)therefore([^\n]*?)(?:\.|confidence|\z)",
    ]
    .map(|p| Regex::new(p).expect("valid conclusion regex"))
});

fn title_for(marker: &str) -> Option<&'static str> {
    match marker.trim_end_matches('\u{FE0F}') {
        "🔍" => Some("Technical Assessment"),
        "🫁" => Some("Systematic Lung Examination"),
        "❤" => Some("Cardiac and Mediastinal Assessment"),
        "🔬" => Some("Pattern Analysis and Recognition"),
        "🧩" => Some("Differential Diagnosis Reasoning"),
        "⚖" => Some("Evidence Weighing"),
        "🎯" => Some("Final Diagnostic Reasoning"),
        "✅" => Some("Confidence Assessment"),
        _ => None,
    }
}

/// Drop the heading that follows a marker, up to the first colon on its line.
fn strip_heading(section: &str) -> &str {
    let first_line = section.split('\n').next().unwrap_or_default();
    match first_line.find(':') {
        Some(colon) => &section[colon + 1..],
        None => section,
    }
}

/// Split chain-of-thought output at each step marker, in order of appearance.
/// Text before the first marker is preamble and is not a step.
pub fn extract_steps(text: &str) -> Vec<ReasoningStep> {
    let markers: Vec<_> = STEP_MARKER.find_iter(text).collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            let content = strip_heading(&text[marker.end()..end]).trim().to_string();
            let number = i + 1;
            ReasoningStep {
                number,
                marker: marker.as_str().to_string(),
                title: title_for(marker.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Step {number}")),
                word_count: content.split_whitespace().count(),
                content,
            }
        })
        .collect()
}

/// The concluding statement of a reasoning chain.
///
/// Each phrase pattern is tried once, leftmost occurrence only. When none
/// yields text, falls back to a pneumonia keyword check over the whole chain.
pub fn final_diagnosis(text: &str) -> String {
    let concluded = CONCLUSIONS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
    });
    if let Some(conclusion) = concluded {
        return conclusion.to_string();
    }

    let lower = text.to_lowercase();
    if lower.contains("pneumonia") {
        if lower.contains("no pneumonia") || lower.contains("normal") {
            "No pneumonia detected".to_string()
        } else {
            "Pneumonia detected".to_string()
        }
    } else {
        "Unable to extract diagnosis".to_string()
    }
}

#[cfg(test)]
pub(crate) const FULL_CHAIN: &str = "Let me reason through this.\n\
🔍 STEP 1 - TECHNICAL ASSESSMENT: PA view, adequate inspiration.\n\
🫁 STEP 2 - SYSTEMATIC LUNG EXAMINATION: Right lower lobe opacity.\n\
❤️ STEP 3 - CARDIAC AND MEDIASTINAL ASSESSMENT: Normal heart size.\n\
🔬 STEP 4 - PATTERN ANALYSIS AND RECOGNITION: Lobar pattern with air bronchograms.\n\
🧩 STEP 5 - DIFFERENTIAL DIAGNOSIS REASONING: Bacterial pneumonia versus atelectasis.\n\
⚖️ STEP 6 - EVIDENCE WEIGHING: Air bronchograms favour infection.\n\
🎯 STEP 7 - FINAL DIAGNOSTIC REASONING: Therefore right lower lobe pneumonia.\n\
✅ STEP 8 - CONFIDENCE ASSESSMENT: Confidence 87%.";
