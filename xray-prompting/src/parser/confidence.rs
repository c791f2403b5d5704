use regex::Regex;
use std::sync::LazyLock;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid number regex"));

static FREE_TEXT: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)confidence[^\n]*?([0-9]+)%",
        r"(?i)([0-9]+)%[^\n]*?confidence",
        r"(?i)confidence[^\n]*?level[^\n]*?([0-9]+)",
    ]
    .map(|p| Regex::new(p).expect("valid confidence regex"))
});

static GENERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]{1,3})%|confidence[:\s]*([0-9]{1,3})|([0-9]{1,3})\s*percent")
        .expect("valid confidence regex")
});

/// Where a profile looks for its confidence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceSource {
    /// First number inside the labeled confidence field.
    Field,
    /// Prose patterns anywhere in the response.
    FreeText,
    /// Percent-style mentions anywhere in the response.
    General,
}

fn parse_number(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

pub fn from_field(field: Option<&str>) -> Option<u64> {
    field
        .and_then(|f| FIRST_NUMBER.find(f))
        .map(|m| parse_number(m.as_str()))
}

pub fn from_free_text(text: &str) -> Option<u64> {
    FREE_TEXT
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| parse_number(m.as_str()))
}

pub fn from_general_text(text: &str) -> Option<u64> {
    let caps = GENERAL.captures(text)?;
    (1..=3)
        .find_map(|i| caps.get(i))
        .map(|m| parse_number(m.as_str()))
}

pub fn clamp_percent(value: u64) -> u8 {
    value.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_takes_first_number() {
        assert_eq!(from_field(Some("88% (high)")), Some(88));
        assert_eq!(from_field(Some("high")), None);
        assert_eq!(from_field(None), None);
    }

    #[test]
    fn free_text_patterns_in_priority_order() {
        assert_eq!(from_free_text("My confidence in this is 85%."), Some(85));
        assert_eq!(from_free_text("I am 70% sure; confidence moderate"), Some(70));
        assert_eq!(from_free_text("Confidence level: 9 out of 10"), Some(9));
        assert_eq!(from_free_text("confidence\n90%"), None);
    }

    #[test]
    fn general_uses_first_matching_alternative() {
        assert_eq!(from_general_text("Confidence: 92"), Some(92));
        assert_eq!(from_general_text("about 60 percent likely"), Some(60));
        assert_eq!(from_general_text("findings 80% consistent"), Some(80));
        assert_eq!(from_general_text("no numbers"), None);
    }

    #[test]
    fn clamps_into_percent_range() {
        assert_eq!(clamp_percent(250), 100);
        assert_eq!(clamp_percent(from_field(Some("99999999999999999999999")).unwrap()), 100);
        assert_eq!(clamp_percent(42), 42);
    }
}
