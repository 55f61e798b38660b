//! Built-in prompt definitions compiled into the binary.

use crate::types::{PromptDefinition, PromptMode};

pub(crate) const LEGAL_METHOD: &str = include_str!("../templates/legal_method.hbs");
pub(crate) const LEGAL_RESOURCES: &str = include_str!("../templates/legal_resources.hbs");

const DIRECT_QUESTION: &str = include_str!("../templates/direct_question.hbs");
const PAIRED_SCENARIO: &str = include_str!("../templates/paired_scenario.hbs");

/// Partials every template may reference with `{{> name}}`.
pub(crate) const PARTIALS: [(&str, &str); 2] = [
    ("legal_method", LEGAL_METHOD),
    ("legal_resources", LEGAL_RESOURCES),
];

/// Collections with a dedicated slot in the resources partial.
pub const NAMED_EVIDENCE_SLOTS: [&str; 5] = [
    "primary_legislation",
    "secondary_legislation",
    "case_law",
    "non_statutory_rules",
    "insurance_qa",
];

/// The compiled-in definition for a mode.
pub fn builtin_prompt(mode: PromptMode) -> PromptDefinition {
    let (title, template) = match mode {
        PromptMode::DirectQuestion => ("Direct legal question", DIRECT_QUESTION),
        PromptMode::PairedScenario => ("Policy and claim coverage check", PAIRED_SCENARIO),
    };

    PromptDefinition {
        id: mode.prompt_id().to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "odes".to_string(),
        template: template.to_string(),
    }
}
