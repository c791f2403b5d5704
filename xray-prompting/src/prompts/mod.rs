pub mod adaptive;
pub mod template;
pub mod variants;

pub use adaptive::{follow_up_template, format_patient_context, format_previous_findings};
pub use template::{PromptTemplate, Slot, TemplateError, TemplateValues};
pub use variants::prompt_for;
