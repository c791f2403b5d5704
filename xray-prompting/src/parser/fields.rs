//! Labeled-field extraction from free model text.
//!
//! Model output is not under our control, so every lookup is an ordered
//! list of progressively looser patterns. A pattern captures everything
//! after the label up to the earliest terminator of that pattern.

use dashmap::DashMap;
use regex::Regex;
use std::sync::LazyLock;

/// Compiled label patterns, keyed by pattern source. Labels come from a
/// fixed set of profiles, so this stays small.
static LABEL_PATTERNS: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

static LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\n[A-Z][A-Z\s]*:").expect("valid label-line regex"));
static LABEL_LINE_NONEMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\n[A-Z][A-Z\s]+:").expect("valid label-line regex"));
static SNAKE_LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\n[A-Z_]+:").expect("valid label-line regex"));
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n").expect("valid blank-line regex"));

/// How hard to look for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStyle {
    /// `LABEL:` only, ending at the next `SNAKE_CASE:` line.
    Strict,
    /// Colon, dash, then bare label; first non-empty capture wins.
    Lenient,
    /// Same three forms, but the first form that matches at all is final,
    /// even when its capture is blank.
    FirstMatch,
}

/// A captured field and the byte offset of its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub start: usize,
    pub value: String,
}

#[derive(Clone, Copy)]
enum Terminator {
    LabelLine,
    LabelLineNonEmpty,
    SnakeLabelLine,
    BlankLine,
}

impl Terminator {
    fn regex(self) -> &'static Regex {
        match self {
            Terminator::LabelLine => &*LABEL_LINE,
            Terminator::LabelLineNonEmpty => &*LABEL_LINE_NONEMPTY,
            Terminator::SnakeLabelLine => &*SNAKE_LABEL_LINE,
            Terminator::BlankLine => &*BLANK_LINE,
        }
    }
}

struct Form {
    label_suffix: &'static str,
    terminators: &'static [Terminator],
}

const STRICT: &[Form] = &[Form {
    label_suffix: r":\s*",
    terminators: &[Terminator::SnakeLabelLine],
}];

const LENIENT: &[Form] = &[
    Form {
        label_suffix: r":\s*",
        terminators: &[Terminator::LabelLine, Terminator::BlankLine],
    },
    Form {
        label_suffix: r"\s*-\s*",
        terminators: &[Terminator::LabelLine, Terminator::BlankLine],
    },
    Form {
        label_suffix: r"\s*",
        terminators: &[Terminator::BlankLine],
    },
];

const FIRST_MATCH: &[Form] = &[
    Form {
        label_suffix: r":\s*",
        terminators: &[Terminator::LabelLineNonEmpty],
    },
    Form {
        label_suffix: r"\s*-\s*",
        terminators: &[Terminator::LabelLineNonEmpty],
    },
    Form {
        label_suffix: r"\s*",
        terminators: &[Terminator::BlankLine],
    },
];

fn label_pattern(label: &str, suffix: &str) -> Option<Regex> {
    let pattern = format!("(?i){}{}", regex::escape(label), suffix);
    if let Some(cached) = LABEL_PATTERNS.get(&pattern) {
        return Some(cached.clone());
    }
    let compiled = Regex::new(&pattern).ok()?;
    LABEL_PATTERNS.insert(pattern, compiled.clone());
    Some(compiled)
}

impl Form {
    fn capture(&self, text: &str, label: &str) -> Option<FieldMatch> {
        let found = label_pattern(label, self.label_suffix)?.find(text)?;
        let rest = &text[found.end()..];
        let end = self
            .terminators
            .iter()
            .filter_map(|t| t.regex().find(rest).map(|m| m.start()))
            .min()
            .unwrap_or(rest.len());
        Some(FieldMatch {
            start: found.start(),
            value: rest[..end].trim().to_string(),
        })
    }
}

/// Locate `label` in `text`. Blank captures are reported as absent.
pub fn find_field(text: &str, label: &str, style: MatchStyle) -> Option<FieldMatch> {
    match style {
        MatchStyle::Strict => STRICT[0].capture(text, label).filter(|m| !m.value.is_empty()),
        MatchStyle::Lenient => LENIENT
            .iter()
            .filter_map(|form| form.capture(text, label))
            .find(|m| !m.value.is_empty()),
        MatchStyle::FirstMatch => FIRST_MATCH
            .iter()
            .find_map(|form| form.capture(text, label))
            .filter(|m| !m.value.is_empty()),
    }
}

pub fn extract_field(text: &str, label: &str, style: MatchStyle) -> Option<String> {
    find_field(text, label, style).map(|m| m.value)
}
