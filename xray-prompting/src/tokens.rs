//! Token estimation, prompt compaction and cost planning.
//!
//! Counts here are heuristics tuned for English clinical prose. They are for
//! comparing prompts against each other, not for billing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{AnalysisError, Result};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OUTPUT_TOKENS: u64 = 800;
pub const RESERVED_OUTPUT_TOKENS: u64 = 1000;
pub const DEFAULT_BATCH_TOKENS: u64 = 3000;

const REQUESTS_PER_DAY: f64 = 100.0;
const WORKING_DAYS_PER_YEAR: f64 = 250.0;
const BATCH_HEADER: &str = "Analyze these chest X-rays for pneumonia:\n\n";

static MEDICAL_TERMS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"(?i)\b(pneumonia|bronchitis|tuberculosis|asthma)\b",
        r"(?i)\b(radiograph|radiography|imaging|scan)\b",
        r"(?i)\b(diagnosis|prognosis|treatment|therapy)\b",
        r"(?i)\b(patient|doctor|physician|radiologist)\b",
        r"(?i)\b(chest|lung|heart|cardiac|pulmonary)\b",
    ]
    .map(|p| Regex::new(p).expect("valid medical term regex"))
});

const ABBREVIATIONS: [(&str, &str); 30] = [
    ("computed tomography", "CT"),
    ("magnetic resonance imaging", "MRI"),
    ("posteroanterior", "PA"),
    ("anteroposterior", "AP"),
    ("bilateral", "bilat"),
    ("pneumonia", "PNA"),
    ("consolidation", "consol"),
    ("infiltrate", "infiltr"),
    ("examination", "exam"),
    ("patient", "pt"),
    ("history", "hx"),
    ("diagnosis", "dx"),
    ("treatment", "tx"),
    ("radiograph", "XR"),
    ("chest X-ray", "CXR"),
    ("electrocardiogram", "ECG"),
    ("echocardiogram", "echo"),
    ("ultrasound", "US"),
    ("intensive care unit", "ICU"),
    ("emergency room", "ER"),
    ("emergency department", "ED"),
    ("blood pressure", "BP"),
    ("heart rate", "HR"),
    ("respiratory rate", "RR"),
    ("temperature", "temp"),
    ("oxygen saturation", "O2 sat"),
    ("white blood cell", "WBC"),
    ("red blood cell", "RBC"),
    ("hemoglobin", "Hgb"),
    ("hematocrit", "Hct"),
];

static ABBREVIATION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(full, short)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(full));
            (
                Regex::new(&pattern).expect("valid abbreviation regex"),
                *short,
            )
        })
        .collect()
});

static FILLER_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:very|quite|extremely|completely|thoroughly|carefully|please|kindly)\s+")
        .expect("valid filler regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const STRUCTURED_REQUEST: &str = "Analyze chest image:\n\
1. Lung fields\n\
2. Heart size\n\
3. Pleural spaces\n\
4. Pathology\n\
Format: Diagnosis | Confidence | Evidence";

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word_tokens(word: &str) -> f64 {
    let clean_len = word.chars().filter(|c| is_word_char(*c)).count();
    let base = match clean_len {
        0..=6 => 1,
        7..=10 => 2,
        n => n.div_ceil(4),
    };
    let punctuation = word
        .chars()
        .filter(|c| !is_word_char(*c) && !c.is_whitespace())
        .count();
    (base + punctuation) as f64
}

/// Medical vocabulary found in `text`, in pattern order.
pub fn medical_terms(text: &str) -> Vec<String> {
    MEDICAL_TERMS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect()
}

/// Estimated token count. Empty or whitespace-only text is zero.
pub fn estimate_tokens(text: &str) -> u64 {
    let words: f64 = text.split_whitespace().map(word_tokens).sum();
    if words == 0.0 {
        return 0;
    }
    let adjustment = medical_terms(text).len() as f64 * 0.5;
    (words + adjustment).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Conservative => "conservative",
            Strategy::Balanced => "balanced",
            Strategy::Aggressive => "aggressive",
        }
    }

    fn abbreviates(&self) -> bool {
        matches!(self, Strategy::Balanced | Strategy::Aggressive)
    }

    fn compresses(&self) -> bool {
        matches!(self, Strategy::Aggressive)
    }

    fn restructures(&self) -> bool {
        matches!(self, Strategy::Balanced | Strategy::Conservative)
    }
}

impl FromStr for Strategy {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Strategy::Conservative),
            "balanced" => Ok(Strategy::Balanced),
            "aggressive" => Ok(Strategy::Aggressive),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown optimization strategy {other}"
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationKind {
    Abbreviation,
    Compression,
    Structuring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub kind: OptimizationKind,
    pub before: String,
    pub after: String,
    pub token_savings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub strategy: Strategy,
    pub original: String,
    pub optimized: String,
    pub original_tokens: u64,
    pub optimized_tokens: u64,
    pub token_savings: i64,
    pub savings_percent: f64,
    pub steps: Vec<OptimizationStep>,
}

pub fn abbreviate(text: &str) -> String {
    ABBREVIATION_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (re, short)| {
            re.replace_all(&acc, *short).into_owned()
        })
}

pub fn remove_redundancy(text: &str) -> String {
    let stripped = FILLER_WORDS.replace_all(text, "");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

/// Replace a free-form chest analysis request with a compact checklist.
/// Other text is returned unchanged.
pub fn structure_request(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.contains("analyze") && lower.contains("chest") {
        STRUCTURED_REQUEST.to_string()
    } else {
        text.to_string()
    }
}

fn savings(before: u64, after: u64) -> i64 {
    before as i64 - after as i64
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

pub fn optimize(text: &str, strategy: Strategy) -> Optimization {
    let original_tokens = estimate_tokens(text);
    let passes: [(OptimizationKind, bool, fn(&str) -> String); 3] = [
        (OptimizationKind::Abbreviation, strategy.abbreviates(), abbreviate),
        (OptimizationKind::Compression, strategy.compresses(), remove_redundancy),
        (OptimizationKind::Structuring, strategy.restructures(), structure_request),
    ];

    let mut current = text.to_string();
    let mut steps = Vec::new();
    for (kind, enabled, pass) in passes {
        if !enabled {
            continue;
        }
        let next = pass(&current);
        if next != current {
            steps.push(OptimizationStep {
                kind,
                token_savings: savings(estimate_tokens(&current), estimate_tokens(&next)),
                before: std::mem::replace(&mut current, next.clone()),
                after: next,
            });
        }
    }

    let optimized_tokens = estimate_tokens(&current);
    let token_savings = savings(original_tokens, optimized_tokens);
    Optimization {
        strategy,
        original: text.to_string(),
        optimized: current,
        original_tokens,
        optimized_tokens,
        token_savings,
        savings_percent: percent_of(token_savings as f64, original_tokens as f64),
        steps,
    }
}

/// Per-1K-token pricing and context size of a hosted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostModel {
    pub name: &'static str,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub context_limit: u64,
}

pub const COST_MODELS: [CostModel; 5] = [
    CostModel {
        name: "gpt-3.5-turbo",
        input_per_1k: 0.0015,
        output_per_1k: 0.002,
        context_limit: 4096,
    },
    CostModel {
        name: "gpt-4",
        input_per_1k: 0.03,
        output_per_1k: 0.06,
        context_limit: 8192,
    },
    CostModel {
        name: "gpt-4-32k",
        input_per_1k: 0.06,
        output_per_1k: 0.12,
        context_limit: 32768,
    },
    CostModel {
        name: "gemini-pro",
        input_per_1k: 0.001,
        output_per_1k: 0.002,
        context_limit: 32768,
    },
    CostModel {
        name: "claude-3-sonnet",
        input_per_1k: 0.003,
        output_per_1k: 0.015,
        context_limit: 200_000,
    },
];

pub fn cost_model(name: &str) -> Result<&'static CostModel> {
    COST_MODELS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| AnalysisError::UnknownModel(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

pub fn cost(input_tokens: u64, output_tokens: u64, model: &str) -> Result<CostBreakdown> {
    let pricing = cost_model(model)?;
    let input_cost = input_tokens as f64 / 1000.0 * pricing.input_per_1k;
    let output_cost = output_tokens as f64 / 1000.0 * pricing.output_per_1k;
    Ok(CostBreakdown {
        model: model.to_string(),
        input_tokens,
        output_tokens,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsProjection {
    pub per_request: f64,
    pub per_day: f64,
    pub per_month: f64,
    pub per_year: f64,
}

/// Scale a per-request saving to 100 requests a day over 250 working days.
pub fn project_savings(per_request: f64) -> SavingsProjection {
    let per_day = per_request * REQUESTS_PER_DAY;
    SavingsProjection {
        per_request,
        per_day,
        per_month: per_day * 30.0,
        per_year: per_day * WORKING_DAYS_PER_YEAR,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSavings {
    pub original: CostBreakdown,
    pub optimized: CostBreakdown,
    pub savings: f64,
    pub savings_percent: f64,
    pub projection: SavingsProjection,
}

pub fn cost_savings(
    original_tokens: u64,
    optimized_tokens: u64,
    output_tokens: u64,
    model: &str,
) -> Result<CostSavings> {
    let original = cost(original_tokens, output_tokens, model)?;
    let optimized = cost(optimized_tokens, output_tokens, model)?;
    let savings = original.total_cost - optimized.total_cost;
    Ok(CostSavings {
        savings_percent: percent_of(savings, original.total_cost),
        projection: project_savings(savings),
        original,
        optimized,
        savings,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Indices into the input case list.
    pub cases: Vec<usize>,
    pub token_count: u64,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSavings {
    pub individual: u64,
    pub batched: u64,
    pub savings: i64,
    pub efficiency_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,
    pub average_cases_per_batch: u64,
    pub savings: BatchSavings,
}

fn batch_prompt(cases: &[&str]) -> String {
    let body: Vec<String> = cases
        .iter()
        .enumerate()
        .map(|(i, description)| format!("Case {}: {description}", i + 1))
        .collect();
    format!("{BATCH_HEADER}{}", body.join("\n"))
}

fn batch_savings(cases: usize, batches: usize) -> BatchSavings {
    let individual = cases as u64 * 200;
    let batched = batches as u64 * 100;
    let savings = savings(individual, batched);
    BatchSavings {
        individual,
        batched,
        savings,
        efficiency_percent: percent_of(savings as f64, individual as f64),
    }
}

/// Greedily pack case descriptions under a shared header.
pub fn plan_batches(descriptions: &[&str], max_tokens: u64) -> BatchPlan {
    let header_tokens = estimate_tokens(BATCH_HEADER);
    let mut batches = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_tokens = 0;

    let flush = |current: &[usize], tokens: u64| Batch {
        cases: current.to_vec(),
        token_count: tokens + header_tokens,
        prompt: batch_prompt(&current.iter().map(|i| descriptions[*i]).collect::<Vec<_>>()),
    };

    for (index, description) in descriptions.iter().enumerate() {
        let case_tokens = estimate_tokens(&format!("Case {}: {description}\n", index + 1));
        if current_tokens + case_tokens + header_tokens > max_tokens && !current.is_empty() {
            batches.push(flush(&current, current_tokens));
            current.clear();
            current_tokens = 0;
        }
        current.push(index);
        current_tokens += case_tokens;
    }
    if !current.is_empty() {
        batches.push(flush(&current, current_tokens));
    }

    let average_cases_per_batch = if batches.is_empty() {
        0
    } else {
        (descriptions.len() as f64 / batches.len() as f64).round() as u64
    };
    BatchPlan {
        savings: batch_savings(descriptions.len(), batches.len()),
        average_cases_per_batch,
        batches,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: String,
    pub priority: Priority,
    pub message: String,
}

fn recommend(kind: &str, priority: Priority, message: &str) -> Recommendation {
    Recommendation {
        kind: kind.to_string(),
        priority,
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub system: u64,
    pub user: u64,
    pub examples: u64,
    pub total: u64,
    pub available: u64,
    pub remaining: i64,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPlan {
    /// Indices of the examples that fit, always a prefix of the input.
    pub selected_examples: Vec<usize>,
    pub usage: TokenUsage,
    pub recommendations: Vec<Recommendation>,
}

fn context_recommendations(used: u64, available: u64) -> Vec<Recommendation> {
    let utilization = if available == 0 {
        1.0
    } else {
        used as f64 / available as f64
    };
    if utilization > 0.9 {
        vec![recommend(
            "warning",
            Priority::High,
            "Context window is nearly full. Consider prompt optimization.",
        )]
    } else if utilization > 0.8 {
        vec![recommend(
            "caution",
            Priority::Medium,
            "High context utilization. Monitor for truncation.",
        )]
    } else if utilization < 0.3 {
        vec![recommend(
            "optimization",
            Priority::Low,
            "Low context utilization. Consider adding more examples.",
        )]
    } else {
        Vec::new()
    }
}

/// Admit examples in order while the prompt stays strictly under the model's
/// context limit minus the reserved output budget. Stops at the first misfit.
pub fn fit_context_window(
    system: &str,
    user: &str,
    examples: &[&str],
    model: &str,
) -> Result<ContextPlan> {
    let pricing = cost_model(model)?;
    let available = pricing.context_limit.saturating_sub(RESERVED_OUTPUT_TOKENS);
    let system_tokens = estimate_tokens(system);
    let user_tokens = estimate_tokens(user);

    let mut example_tokens = 0;
    let mut selected_examples = Vec::new();
    for (index, example) in examples.iter().enumerate() {
        let tokens = estimate_tokens(example);
        if system_tokens + user_tokens + example_tokens + tokens >= available {
            break;
        }
        selected_examples.push(index);
        example_tokens += tokens;
    }

    let total = system_tokens + user_tokens + example_tokens;
    Ok(ContextPlan {
        selected_examples,
        usage: TokenUsage {
            system: system_tokens,
            user: user_tokens,
            examples: example_tokens,
            total,
            available,
            remaining: savings(available, total),
            utilization_percent: percent_of(total as f64, available as f64),
        },
        recommendations: context_recommendations(total, available),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEfficiency {
    pub chars_per_token: f64,
    pub unique_word_ratio: f64,
    pub repetition: f64,
}

pub fn text_efficiency(text: &str) -> TextEfficiency {
    let tokens = estimate_tokens(text);
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    let unique = words.iter().collect::<HashSet<_>>().len();
    let unique_word_ratio = if words.is_empty() {
        0.0
    } else {
        unique as f64 / words.len() as f64
    };
    TextEfficiency {
        chars_per_token: if tokens == 0 {
            0.0
        } else {
            text.len() as f64 / tokens as f64
        },
        unique_word_ratio,
        repetition: if words.is_empty() {
            0.0
        } else {
            1.0 - unique_word_ratio
        },
    }
}

/// Full breakdown of one prompt: estimate, vocabulary, balanced optimization,
/// cost against `model` and what to try next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAnalysis {
    pub characters: usize,
    pub word_count: usize,
    pub estimated_tokens: u64,
    pub medical_terms: Vec<String>,
    pub medical_term_density: f64,
    pub efficiency: TextEfficiency,
    pub optimization: Optimization,
    pub cost: CostBreakdown,
    pub savings: CostSavings,
    pub recommendations: Vec<Recommendation>,
}

fn efficiency_recommendations(
    terms: usize,
    efficiency: &TextEfficiency,
    tokens: u64,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    if terms > 5 {
        recommendations.push(recommend(
            "abbreviation",
            Priority::High,
            "Use standard medical abbreviations to reduce the token count",
        ));
    }
    if efficiency.repetition > 0.2 {
        recommendations.push(recommend(
            "redundancy",
            Priority::Medium,
            "Remove redundant words and phrases",
        ));
    }
    if tokens > 1000 {
        recommendations.push(recommend(
            "restructuring",
            Priority::High,
            "Break the prompt into smaller, focused prompts",
        ));
    }
    if tokens < 50 {
        recommendations.push(recommend(
            "batching",
            Priority::Low,
            "Batch several short requests together",
        ));
    }
    recommendations
}

pub fn analyze_text(text: &str, strategy: Strategy, model: &str) -> Result<TokenAnalysis> {
    let estimated_tokens = estimate_tokens(text);
    let medical_terms = medical_terms(text);
    let word_count = text.split_whitespace().count();
    let efficiency = text_efficiency(text);
    let optimization = optimize(text, strategy);

    let cost = cost(estimated_tokens, DEFAULT_OUTPUT_TOKENS, model)?;
    let savings = cost_savings(
        optimization.original_tokens,
        optimization.optimized_tokens,
        DEFAULT_OUTPUT_TOKENS,
        model,
    )?;

    Ok(TokenAnalysis {
        characters: text.len(),
        word_count,
        medical_term_density: percent_of(medical_terms.len() as f64, word_count as f64),
        recommendations: efficiency_recommendations(
            medical_terms.len(),
            &efficiency,
            estimated_tokens,
        ),
        estimated_tokens,
        medical_terms,
        efficiency,
        optimization,
        cost,
        savings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_length_buckets() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 0);
        // 1 + 1 + 2
        assert_eq!(estimate_tokens("a small opacities"), 4);
        // 14 chars -> ceil(14 / 4)
        assert_eq!(estimate_tokens("consolidations"), 4);
        // "--" has no word characters: one token plus two punctuation
        assert_eq!(estimate_tokens("--"), 3);
    }

    #[test]
    fn punctuation_and_medical_terms_add_tokens() {
        // "Chest," -> 1 + 1, "X-ray." -> 1 + 2, one term adds 0.5 -> 5.5 rounds to 6
        assert_eq!(estimate_tokens("Chest, X-ray."), 6);
        assert_eq!(medical_terms("Chest, X-ray."), vec!["Chest"]);
    }

    #[test]
    fn abbreviations_apply_in_table_order() {
        assert_eq!(
            abbreviate("The patient had a Chest X-ray showing bilateral pneumonia"),
            "The pt had a CXR showing bilat PNA"
        );
        assert_eq!(abbreviate("radiographic"), "radiographic");
    }

    #[test]
    fn redundancy_removal_collapses_whitespace() {
        assert_eq!(
            remove_redundancy("Please   very carefully review  the film "),
            "review the film"
        );
    }

    #[test]
    fn conservative_only_restructures() {
        let result = optimize("Analyze this chest radiograph thoroughly", Strategy::Conservative);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].kind, OptimizationKind::Structuring);
        assert!(result.optimized.starts_with("Analyze chest image:"));
    }

    #[test]
    fn aggressive_abbreviates_then_compresses() {
        let result = optimize(
            "Please very carefully review the patient history",
            Strategy::Aggressive,
        );
        let kinds: Vec<_> = result.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![OptimizationKind::Abbreviation, OptimizationKind::Compression]
        );
        assert_eq!(result.optimized, "review the pt hx");
        assert!(result.token_savings > 0);
        assert!(result.savings_percent > 0.0);
    }

    #[test]
    fn unchanged_text_records_no_steps() {
        let result = optimize("hello world", Strategy::Balanced);
        assert!(result.steps.is_empty());
        assert_eq!(result.token_savings, 0);
        assert_eq!(optimize("", Strategy::Balanced).savings_percent, 0.0);
    }

    #[test]
    fn cost_uses_per_thousand_pricing() {
        let breakdown = cost(1000, 500, "gpt-4").unwrap();
        assert!((breakdown.input_cost - 0.03).abs() < 1e-12);
        assert!((breakdown.output_cost - 0.03).abs() < 1e-12);
        assert!((breakdown.total_cost - 0.06).abs() < 1e-12);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let err = cost(10, 10, "gpt-5").unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownModel(name) if name == "gpt-5"));
    }

    #[test]
    fn savings_projection() {
        let projection = project_savings(0.01);
        assert!((projection.per_day - 1.0).abs() < 1e-9);
        assert!((projection.per_month - 30.0).abs() < 1e-9);
        assert!((projection.per_year - 250.0).abs() < 1e-9);
    }

    #[test]
    fn batches_respect_token_ceiling() {
        let cases = ["fever and cough"; 5];
        let plan = plan_batches(&cases, DEFAULT_BATCH_TOKENS);
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0].cases, vec![0, 1, 2, 3, 4]);
        assert!(plan.batches[0].prompt.starts_with(BATCH_HEADER));
        assert!(plan.batches[0].prompt.ends_with("Case 5: fever and cough"));
        assert_eq!(plan.savings.individual, 1000);
        assert_eq!(plan.savings.batched, 100);

        // Header is 11 tokens and each case 6, so 24 fits two cases per batch.
        let plan = plan_batches(&cases, 24);
        let sizes: Vec<_> = plan.batches.iter().map(|b| b.cases.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(plan.batches[1].prompt.lines().nth(2), Some("Case 1: fever and cough"));
        assert_eq!(plan.average_cases_per_batch, 2);
    }

    #[test]
    fn oversize_case_still_gets_its_own_batch() {
        let plan = plan_batches(&["fever and cough"], 1);
        assert_eq!(plan.batches.len(), 1);
        assert!(plan_batches(&[], 100).batches.is_empty());
    }

    #[test]
    fn context_window_admits_a_prefix() {
        let examples = ["one two three four"; 3];
        let plan = fit_context_window("system", "user", &examples, "gpt-3.5-turbo").unwrap();
        assert_eq!(plan.selected_examples, vec![0, 1, 2]);
        assert_eq!(plan.usage.available, 3096);
        assert_eq!(plan.usage.total, 14);
        assert_eq!(plan.recommendations[0].kind, "optimization");

        let long = "word ".repeat(3100);
        let examples = ["short example", long.as_str(), "short example"];
        let plan = fit_context_window("system", "user", &examples, "gpt-3.5-turbo").unwrap();
        assert_eq!(plan.selected_examples, vec![0]);
    }

    #[test]
    fn recommendations_follow_thresholds() {
        let analysis = analyze_text("analyze analyze analyze", Strategy::Balanced, DEFAULT_MODEL)
            .unwrap();
        let kinds: Vec<_> = analysis.recommendations.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["redundancy", "batching"]);
        assert_eq!(analysis.cost.output_tokens, DEFAULT_OUTPUT_TOKENS);
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("Aggressive".parse::<Strategy>().unwrap(), Strategy::Aggressive);
        assert!("extreme".parse::<Strategy>().is_err());
    }
}
