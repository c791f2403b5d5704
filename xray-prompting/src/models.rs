use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};

/// Upload ceiling applied before any network call.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            MediaType::Jpeg => ImageFormat::Jpeg,
            MediaType::Png => ImageFormat::Png,
            MediaType::Webp => ImageFormat::WebP,
        }
    }

    /// Media type from a file extension, used by the command-line tool.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            "webp" => Some(MediaType::Webp),
            _ => None,
        }
    }
}

impl FromStr for MediaType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/webp" => Ok(MediaType::Webp),
            other => Err(AnalysisError::InvalidInput(format!(
                "unsupported media type {other}; expected image/jpeg, image/png or image/webp"
            ))),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated image bytes plus their declared media type.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    media_type: MediaType,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Result<Self> {
        if bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AnalysisError::InvalidInput(format!(
                "image is {} bytes; the limit is 10MB",
                bytes.len()
            )));
        }

        let sniffed = image::guess_format(&bytes).map_err(|_| {
            AnalysisError::InvalidInput("image data is not a recognised format".to_string())
        })?;
        if sniffed != media_type.image_format() {
            return Err(AnalysisError::InvalidInput(format!(
                "declared {media_type} but the data looks like {sniffed:?}"
            )));
        }

        Ok(Self { bytes, media_type })
    }

    /// Decode a base64 upload, as sent by the HTTP surface.
    pub fn from_base64(data: &str, media_type: MediaType) -> Result<Self> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| AnalysisError::InvalidInput(format!("image is not valid base64: {e}")))?;
        Self::new(bytes, media_type)
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_inline(&self) -> InlineImage {
        InlineImage {
            mime_type: self.media_type.as_str().to_string(),
            data: STANDARD.encode(&self.bytes),
        }
    }
}

/// Base64 image as it travels in the outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptVariant {
    ZeroShot,
    OneShot,
    MultiShot,
    ChainOfThought,
    Dynamic,
}

impl PromptVariant {
    pub const ALL: [PromptVariant; 5] = [
        PromptVariant::ZeroShot,
        PromptVariant::OneShot,
        PromptVariant::MultiShot,
        PromptVariant::ChainOfThought,
        PromptVariant::Dynamic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVariant::ZeroShot => "zero-shot",
            PromptVariant::OneShot => "one-shot",
            PromptVariant::MultiShot => "multi-shot",
            PromptVariant::ChainOfThought => "chain-of-thought",
            PromptVariant::Dynamic => "dynamic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PromptVariant::ZeroShot => "Zero-Shot Prompting",
            PromptVariant::OneShot => "One-Shot Prompting",
            PromptVariant::MultiShot => "Multi-Shot Prompting",
            PromptVariant::ChainOfThought => "Chain of Thought Prompting",
            PromptVariant::Dynamic => "Dynamic Prompting",
        }
    }
}

impl FromStr for PromptVariant {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "zero-shot" => Ok(PromptVariant::ZeroShot),
            "one-shot" => Ok(PromptVariant::OneShot),
            "multi-shot" | "few-shot" => Ok(PromptVariant::MultiShot),
            "chain-of-thought" | "cot" => Ok(PromptVariant::ChainOfThought),
            "dynamic" => Ok(PromptVariant::Dynamic),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown prompt variant {other}"
            ))),
        }
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis request: a validated image and the strategy to prompt it with.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: ImagePayload,
    pub variant: PromptVariant,
    /// Overrides the variant's sampling temperature when set.
    pub temperature: Option<f32>,
}

impl AnalysisRequest {
    pub fn new(image: ImagePayload, variant: PromptVariant) -> Self {
        Self {
            image,
            variant,
            temperature: None,
        }
    }
}

/// Text and usage returned by the vision endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModelResponse {
    pub text: String,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    PositiveFinding,
    NegativeFinding,
    Indeterminate,
}

impl Diagnosis {
    pub fn headline(&self) -> &'static str {
        match self {
            Diagnosis::PositiveFinding => "PNEUMONIA DETECTED",
            Diagnosis::NegativeFinding => "NORMAL CHEST X-RAY",
            Diagnosis::Indeterminate => "INDETERMINATE",
        }
    }
}

/// Keyword tallies behind a polarity decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolarityScore {
    pub positive: usize,
    pub negative: usize,
}

impl PolarityScore {
    pub fn is_tie(&self) -> bool {
        self.positive == self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub name: String,
    pub text: String,
    /// True when the label was not found and the documented default was used.
    pub defaulted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub number: usize,
    pub marker: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFinding {
    pub diagnosis: Diagnosis,
    pub diagnosis_text: String,
    pub confidence_percent: u8,
    /// Set when confidence came from the parser default rather than the text.
    pub confidence_defaulted: bool,
    /// Present when the diagnosis was decided by keyword scoring.
    pub polarity: Option<PolarityScore>,
    /// Found sections in order of appearance, then defaulted ones.
    pub sections: Vec<NarrativeSection>,
    pub steps: Vec<ReasoningStep>,
    pub raw_text: String,
    pub parsed_at: DateTime<Utc>,
}

impl ParsedFinding {
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.text.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplexityClass {
    Low,
    Medium,
    High,
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComplexityClass::Low => "low",
            ComplexityClass::Medium => "medium",
            ComplexityClass::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Unspecified,
    Pediatric,
    Adult,
    Elderly,
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgeGroup::Unspecified => "Unspecified",
            AgeGroup::Pediatric => "Pediatric",
            AgeGroup::Adult => "Adult",
            AgeGroup::Elderly => "Elderly",
        })
    }
}

/// Caller-supplied clinical context for adaptive analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientContext {
    pub age: Option<u32>,
    pub symptoms: Option<String>,
    pub onset: Option<String>,
    pub severity: Option<String>,
    pub medical_history: Option<String>,
    pub urgency: Option<String>,
    pub fever: bool,
    pub cough: bool,
    pub dyspnea: bool,
}

impl PatientContext {
    /// Age in years; zero counts as not given.
    pub fn known_age(&self) -> Option<u32> {
        self.age.filter(|age| *age > 0)
    }

    pub fn age_group(&self) -> AgeGroup {
        match self.known_age() {
            None => AgeGroup::Unspecified,
            Some(age) if age < 18 => AgeGroup::Pediatric,
            Some(age) if age >= 65 => AgeGroup::Elderly,
            Some(_) => AgeGroup::Adult,
        }
    }

    pub fn is_immunocompromised(&self) -> bool {
        self.medical_history
            .as_deref()
            .is_some_and(|h| h.trim().eq_ignore_ascii_case("immunocompromised"))
    }

    pub fn is_emergency(&self) -> bool {
        self.urgency
            .as_deref()
            .is_some_and(|u| u.trim().eq_ignore_ascii_case("emergency"))
    }

    /// Number of fields the caller actually filled in.
    pub fn provided_fields(&self) -> usize {
        let texts = [
            &self.symptoms,
            &self.onset,
            &self.severity,
            &self.medical_history,
            &self.urgency,
        ];
        usize::from(self.known_age().is_some())
            + texts
                .iter()
                .filter(|t| t.as_deref().is_some_and(|s| !s.trim().is_empty()))
                .count()
            + [self.fever, self.cough, self.dyspnea]
                .iter()
                .filter(|flag| **flag)
                .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowUpCategory {
    #[serde(rename = "normal-followup")]
    Normal,
    #[serde(rename = "pathology-followup")]
    Pathology,
    #[serde(rename = "ambiguous-followup")]
    Ambiguous,
    #[serde(rename = "pediatric")]
    Pediatric,
    #[serde(rename = "elderly")]
    Elderly,
    #[serde(rename = "immunocompromised")]
    Immunocompromised,
    #[serde(rename = "emergency")]
    Emergency,
}

impl FollowUpCategory {
    pub const ALL: [FollowUpCategory; 7] = [
        FollowUpCategory::Normal,
        FollowUpCategory::Pathology,
        FollowUpCategory::Ambiguous,
        FollowUpCategory::Pediatric,
        FollowUpCategory::Elderly,
        FollowUpCategory::Immunocompromised,
        FollowUpCategory::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpCategory::Normal => "normal-followup",
            FollowUpCategory::Pathology => "pathology-followup",
            FollowUpCategory::Ambiguous => "ambiguous-followup",
            FollowUpCategory::Pediatric => "pediatric",
            FollowUpCategory::Elderly => "elderly",
            FollowUpCategory::Immunocompromised => "immunocompromised",
            FollowUpCategory::Emergency => "emergency",
        }
    }
}

impl fmt::Display for FollowUpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an adaptive session is in the two-call protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveState {
    AwaitingInitial,
    InitialInFlight,
    ClassifyingComplexity,
    FollowUpInFlight,
    Complete,
    Failed,
}

/// One model call inside an adaptive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub label: String,
    pub finding: ParsedFinding,
    pub elapsed_ms: u64,
    pub tokens_used: u32,
}

/// The append-only record of a two-step adaptive analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub session_id: String,
    pub state: AdaptiveState,
    pub patient_context: PatientContext,
    pub complexity: Option<ComplexityClass>,
    pub follow_up: Option<FollowUpCategory>,
    pub steps: Vec<StepRecord>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisSession {
    pub fn total_tokens(&self) -> u32 {
        self.steps.iter().map(|s| s.tokens_used).sum()
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.elapsed_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn rejects_unsupported_media_type() {
        let err = "image/gif".parse::<MediaType>().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn rejects_oversized_image() {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(MAX_IMAGE_BYTES + 1, 0);
        let err = ImagePayload::new(bytes, MediaType::Png).unwrap_err();
        assert!(err.to_string().contains("10MB"));
    }

    #[test]
    fn rejects_mismatched_declared_type() {
        let err = ImagePayload::new(PNG_MAGIC.to_vec(), MediaType::Jpeg).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn accepts_png_and_encodes_inline() {
        let payload = ImagePayload::new(PNG_MAGIC.to_vec(), MediaType::Png).unwrap();
        let inline = payload.to_inline();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(STANDARD.decode(inline.data).unwrap(), PNG_MAGIC);
    }

    #[test]
    fn variant_names_parse() {
        assert_eq!(
            "chain_of_thought".parse::<PromptVariant>().unwrap(),
            PromptVariant::ChainOfThought
        );
        assert_eq!(
            serde_json::to_string(&PromptVariant::MultiShot).unwrap(),
            "\"multi-shot\""
        );
    }

    #[test]
    fn age_groups() {
        let mut ctx = PatientContext::default();
        assert_eq!(ctx.age_group(), AgeGroup::Unspecified);
        ctx.age = Some(10);
        assert_eq!(ctx.age_group(), AgeGroup::Pediatric);
        ctx.age = Some(65);
        assert_eq!(ctx.age_group(), AgeGroup::Elderly);
        ctx.age = Some(40);
        assert_eq!(ctx.age_group(), AgeGroup::Adult);
        ctx.age = Some(0);
        assert_eq!(ctx.age_group(), AgeGroup::Unspecified);
    }

    #[test]
    fn follow_up_identifiers_serialize() {
        assert_eq!(
            serde_json::to_string(&FollowUpCategory::Ambiguous).unwrap(),
            "\"ambiguous-followup\""
        );
    }
}
