use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Z][A-Z_]*\}").expect("valid placeholder regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {template} requires a value for {slot}")]
    MissingSlot { template: &'static str, slot: Slot },

    #[error("template {template} left placeholder {placeholder} unresolved")]
    UnresolvedPlaceholder {
        template: &'static str,
        placeholder: String,
    },
}

/// Named insertion points a template may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    PatientContext,
    PreviousFindings,
}

impl Slot {
    pub fn token(&self) -> &'static str {
        match self {
            Slot::PatientContext => "{PATIENT_CONTEXT}",
            Slot::PreviousFindings => "{PREVIOUS_FINDINGS}",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    values: HashMap<Slot, String>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}

/// Prompt text with declared slots. Rendering either fills every slot or fails.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    body: &'static str,
    slots: &'static [Slot],
}

impl PromptTemplate {
    pub const fn new(name: &'static str, body: &'static str, slots: &'static [Slot]) -> Self {
        Self { name, body, slots }
    }

    pub fn slots(&self) -> &'static [Slot] {
        self.slots
    }

    pub fn render(&self, values: &TemplateValues) -> Result<String, TemplateError> {
        // Checked against the body so that braces inside caller values pass through.
        if let Some(undeclared) = PLACEHOLDER
            .find_iter(self.body)
            .find(|m| !self.slots.iter().any(|s| s.token() == m.as_str()))
        {
            return Err(TemplateError::UnresolvedPlaceholder {
                template: self.name,
                placeholder: undeclared.as_str().to_string(),
            });
        }

        let mut rendered = self.body.trim().to_string();
        for slot in self.slots {
            let value = values.get(*slot).ok_or(TemplateError::MissingSlot {
                template: self.name,
                slot: *slot,
            })?;
            rendered = rendered.replace(slot.token(), value);
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: PromptTemplate = PromptTemplate::new(
        "greeting",
        "Context:\n{PATIENT_CONTEXT}\nPrior:\n{PREVIOUS_FINDINGS}",
        &[Slot::PatientContext, Slot::PreviousFindings],
    );

    #[test]
    fn renders_every_slot() {
        let values = TemplateValues::new()
            .with(Slot::PatientContext, "age 70")
            .with(Slot::PreviousFindings, "normal");
        assert_eq!(
            GREETING.render(&values).unwrap(),
            "Context:\nage 70\nPrior:\nnormal"
        );
    }

    #[test]
    fn missing_slot_fails_loudly() {
        let values = TemplateValues::new().with(Slot::PatientContext, "age 70");
        assert_eq!(
            GREETING.render(&values).unwrap_err(),
            TemplateError::MissingSlot {
                template: "greeting",
                slot: Slot::PreviousFindings,
            }
        );
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let template = PromptTemplate::new("partial", "{PATIENT_CONTEXT} {PREVIOUS_FINDINGS}", &[
            Slot::PatientContext,
        ]);
        let values = TemplateValues::new().with(Slot::PatientContext, "ctx");
        assert!(matches!(
            template.render(&values),
            Err(TemplateError::UnresolvedPlaceholder { .. })
        ));
    }

    #[test]
    fn braces_in_values_are_kept() {
        let values = TemplateValues::new()
            .with(Slot::PatientContext, "{SYMPTOMS}")
            .with(Slot::PreviousFindings, "none");
        assert!(GREETING.render(&values).unwrap().contains("{SYMPTOMS}"));
    }
}
