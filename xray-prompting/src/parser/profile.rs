use super::confidence::ConfidenceSource;
use super::fields::MatchStyle;
use crate::models::{FollowUpCategory, PromptVariant};

/// Value used when a field's label cannot be found.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    Text(&'static str),
    /// The first N characters of the response followed by `...`.
    Excerpt(usize),
}

impl FieldDefault {
    pub fn resolve(&self, raw_text: &str) -> String {
        match self {
            FieldDefault::Text(text) => (*text).to_string(),
            FieldDefault::Excerpt(chars) => {
                let excerpt: String = raw_text.chars().take(*chars).collect();
                format!("{excerpt}...")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Labels tried in order; the first one found wins.
    pub labels: &'static [&'static str],
    pub default: FieldDefault,
}

const fn field(
    name: &'static str,
    labels: &'static [&'static str],
    default: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        labels,
        default: FieldDefault::Text(default),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DiagnosisRule {
    /// An explicit labeled diagnosis line.
    Field(FieldSpec),
    /// Conclusion phrases inside step-by-step reasoning.
    Reasoning { default: &'static str },
    /// No label at all; decided by keyword vote over the whole response.
    Polarity,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceRule {
    pub source: ConfidenceSource,
    pub labels: &'static [&'static str],
    pub default: u8,
}

/// Per-variant parsing configuration for the shared response parser.
#[derive(Debug, Clone, Copy)]
pub struct ParserProfile {
    pub name: &'static str,
    pub style: MatchStyle,
    pub diagnosis: DiagnosisRule,
    pub confidence: ConfidenceRule,
    pub sections: &'static [FieldSpec],
    pub steps: bool,
}

const FIELD_CONFIDENCE: ConfidenceRule = ConfidenceRule {
    source: ConfidenceSource::Field,
    labels: &["Confidence"],
    default: 0,
};

pub static ZERO_SHOT: ParserProfile = ParserProfile {
    name: "zero-shot",
    style: MatchStyle::Strict,
    diagnosis: DiagnosisRule::Field(field("Diagnosis", &["DIAGNOSIS"], "Unable to determine")),
    confidence: ConfidenceRule {
        source: ConfidenceSource::Field,
        labels: &["CONFIDENCE"],
        default: 0,
    },
    sections: &[
        field("Reasoning", &["REASONING"], "No reasoning provided"),
        field("Key Findings", &["KEY_FINDINGS"], "No specific findings extracted"),
        field(
            "Recommendations",
            &["RECOMMENDATIONS"],
            "Consult healthcare professional",
        ),
    ],
    steps: false,
};

pub static ONE_SHOT: ParserProfile = ParserProfile {
    name: "one-shot",
    style: MatchStyle::FirstMatch,
    diagnosis: DiagnosisRule::Field(field("Diagnosis", &["DIAGNOSIS"], "Unable to determine")),
    confidence: ConfidenceRule {
        source: ConfidenceSource::Field,
        labels: &["CONFIDENCE"],
        default: 0,
    },
    sections: &[
        field("Severity", &["SEVERITY"], "Not specified"),
        field(
            "Clinical Reasoning",
            &["CLINICAL REASONING"],
            "No reasoning provided",
        ),
        field(
            "Radiological Findings",
            &["RADIOLOGICAL FINDINGS"],
            "No specific findings extracted",
        ),
        field(
            "Recommendations",
            &["CLINICAL RECOMMENDATIONS"],
            "Consult healthcare professional",
        ),
    ],
    steps: false,
};

pub static MULTI_SHOT: ParserProfile = ParserProfile {
    name: "multi-shot",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(field(
        "Diagnosis",
        &["Primary Diagnosis", "DIAGNOSIS"],
        "Unable to determine",
    )),
    confidence: ConfidenceRule {
        source: ConfidenceSource::Field,
        labels: &["Confidence", "CONFIDENCE"],
        default: 0,
    },
    sections: &[
        field("Pattern Type", &["Pattern Type", "PATTERN"], "Not specified"),
        field(
            "Clinical Reasoning",
            &["Clinical Reasoning", "REASONING"],
            "No reasoning provided",
        ),
        field(
            "Recommendations",
            &["Recommendations", "RECOMMENDATIONS"],
            "Consult healthcare professional",
        ),
    ],
    steps: false,
};

pub static CHAIN_OF_THOUGHT: ParserProfile = ParserProfile {
    name: "chain-of-thought",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Reasoning {
        default: "Unable to determine from reasoning",
    },
    confidence: ConfidenceRule {
        source: ConfidenceSource::FreeText,
        labels: &[],
        default: 0,
    },
    sections: &[],
    steps: true,
};

/// Single-call general analysis with the dynamic prompt.
pub static GENERAL: ParserProfile = ParserProfile {
    name: "general",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Polarity,
    confidence: ConfidenceRule {
        source: ConfidenceSource::General,
        labels: &[],
        default: 75,
    },
    sections: &[],
    steps: false,
};

pub static ADAPTIVE_INITIAL: ParserProfile = ParserProfile {
    name: "adaptive-initial",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(field(
        "Diagnosis",
        &["Primary Diagnosis"],
        "Unable to determine",
    )),
    confidence: FIELD_CONFIDENCE,
    sections: &[
        field("Complexity Level", &["Complexity Level"], "Standard"),
        field("Key Findings", &["Key Findings"], "See detailed analysis"),
        field(
            "Recommended Follow-up",
            &["Recommended Follow-up"],
            "Standard analysis",
        ),
        field(
            "Clinical Reasoning",
            &["Clinical Reasoning"],
            "No reasoning provided",
        ),
    ],
    steps: false,
};

pub static FOLLOW_UP_NORMAL: ParserProfile = ParserProfile {
    name: "normal-followup",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(field(
        "Final Assessment",
        &["Final Assessment"],
        "Normal study confirmed",
    )),
    confidence: FIELD_CONFIDENCE,
    sections: &[
        field(
            "Clinical Correlation",
            &["Clinical Correlation"],
            "No specific correlation",
        ),
        field("Recommendations", &["Recommendations"], "Routine follow-up"),
    ],
    steps: false,
};

pub static FOLLOW_UP_PATHOLOGY: ParserProfile = ParserProfile {
    name: "pathology-followup",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(field(
        "Detailed Diagnosis",
        &["Detailed Diagnosis"],
        "Pneumonia detected",
    )),
    confidence: FIELD_CONFIDENCE,
    sections: &[
        field("Severity Assessment", &["Severity Assessment"], "Moderate"),
        field("Complications", &["Complications"], "None detected"),
        field(
            "Treatment Recommendations",
            &["Treatment Recommendations"],
            "Standard treatment",
        ),
    ],
    steps: false,
};

pub static FOLLOW_UP_AMBIGUOUS: ParserProfile = ParserProfile {
    name: "ambiguous-followup",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(field(
        "Diagnostic Impression",
        &["Diagnostic Impression"],
        "Uncertain findings",
    )),
    confidence: FIELD_CONFIDENCE,
    sections: &[
        field(
            "Uncertainty Factors",
            &["Uncertainty Factors"],
            "Multiple factors",
        ),
        field(
            "Clinical Correlation Needs",
            &["Clinical Correlation Needs"],
            "Additional information needed",
        ),
        field(
            "Management Recommendations",
            &["Management Recommendations"],
            "Clinical follow-up",
        ),
    ],
    steps: false,
};

/// Pediatric, elderly, immunocompromised and emergency follow-ups.
pub static FOLLOW_UP_CONTEXTUAL: ParserProfile = ParserProfile {
    name: "contextual-followup",
    style: MatchStyle::Lenient,
    diagnosis: DiagnosisRule::Field(FieldSpec {
        name: "Assessment",
        labels: &["Assessment"],
        default: FieldDefault::Excerpt(200),
    }),
    confidence: FIELD_CONFIDENCE,
    sections: &[field(
        "Recommendations",
        &["Recommendations"],
        "Follow clinical protocols",
    )],
    steps: false,
};

impl ParserProfile {
    pub fn for_variant(variant: PromptVariant) -> &'static ParserProfile {
        match variant {
            PromptVariant::ZeroShot => &ZERO_SHOT,
            PromptVariant::OneShot => &ONE_SHOT,
            PromptVariant::MultiShot => &MULTI_SHOT,
            PromptVariant::ChainOfThought => &CHAIN_OF_THOUGHT,
            PromptVariant::Dynamic => &GENERAL,
        }
    }

    pub fn for_follow_up(category: FollowUpCategory) -> &'static ParserProfile {
        match category {
            FollowUpCategory::Normal => &FOLLOW_UP_NORMAL,
            FollowUpCategory::Pathology => &FOLLOW_UP_PATHOLOGY,
            FollowUpCategory::Ambiguous => &FOLLOW_UP_AMBIGUOUS,
            FollowUpCategory::Pediatric
            | FollowUpCategory::Elderly
            | FollowUpCategory::Immunocompromised
            | FollowUpCategory::Emergency => &FOLLOW_UP_CONTEXTUAL,
        }
    }
}
