//! Prompt builder for rendering templates with retrieved evidence.

use crate::templates::{NAMED_EVIDENCE_SLOTS, PARTIALS};
use crate::types::{
    BuiltPrompt, BuiltPromptMetadata, EvidenceSection, PromptDefinition, PromptInputs,
};
use handlebars::Handlebars;
use odes_core::{AppError, AppResult};
use serde_json::{json, Map, Value};

/// Build a prompt from a definition, the user's inputs and per-collection evidence.
///
/// Evidence for the five standard collections fills its named slot. Any
/// other collection is listed under `additional_evidence` so custom
/// catalogs still reach the model.
///
/// # Example
/// ```
/// use odes_prompt::{build_prompt, builtin_prompt, PromptInputs, PromptMode};
///
/// let def = builtin_prompt(PromptMode::DirectQuestion);
/// let built = build_prompt(&def, &PromptInputs::question("Is theft covered?"), &[]).unwrap();
/// assert!(built.text.contains("Is theft covered?"));
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    inputs: &PromptInputs,
    evidence: &[EvidenceSection],
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let data = template_data(inputs, evidence);
    let text = render_template(&definition.template, &data)?;

    let evidence_sections = evidence
        .iter()
        .filter(|section| !section.text.is_empty())
        .map(|section| section.id.clone())
        .collect();

    Ok(BuiltPrompt {
        text,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            mode: inputs.mode(),
            evidence_sections,
        },
    })
}

fn template_data(inputs: &PromptInputs, evidence: &[EvidenceSection]) -> Value {
    let mut data = Map::new();

    match inputs {
        PromptInputs::DirectQuestion { question } => {
            data.insert("question".to_string(), json!(question));
        }
        PromptInputs::PairedScenario {
            policy_wording,
            claim_summary,
        } => {
            data.insert("policy_wording".to_string(), json!(policy_wording));
            data.insert("claim_summary".to_string(), json!(claim_summary));
        }
    }

    let mut additional = Vec::new();
    for section in evidence {
        if NAMED_EVIDENCE_SLOTS.iter().any(|slot| *slot == section.id) {
            data.insert(section.id.clone(), json!(section.text));
        } else {
            additional.push(json!({
                "id": section.id,
                "name": section.name,
                "text": section.text,
            }));
        }
    }
    data.insert("additional_evidence".to_string(), Value::Array(additional));

    Value::Object(data)
}

/// Render a Handlebars template with the shared partials registered.
pub(crate) fn render_template(template: &str, data: &Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompt; evidence must reach the model unescaped
    handlebars.register_escape_fn(handlebars::no_escape);

    for (name, partial) in PARTIALS {
        handlebars
            .register_partial(name, partial)
            .map_err(|e| AppError::Prompt(format!("Failed to register partial {}: {}", name, e)))?;
    }

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::builtin_prompt;
    use crate::types::PromptMode;

    fn section(id: &str, name: &str, text: &str) -> EvidenceSection {
        EvidenceSection {
            id: id.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{question}}", &json!({"question": "Hello & bye"}));
        assert_eq!(result.unwrap(), "Question: Hello & bye");
    }

    #[test]
    fn test_direct_prompt_fills_slots_and_fallbacks() {
        let def = builtin_prompt(PromptMode::DirectQuestion);
        let evidence = vec![
            section(
                "primary_legislation",
                "Primary Legislation",
                "Insurance Act 2015 s.10\nSource: ia2015.pdf (Page 4)",
            ),
            section("case_law", "Case Law", ""),
        ];

        let inputs = PromptInputs::question("What is a warranty?");
        let built = build_prompt(&def, &inputs, &evidence).unwrap();

        assert!(built.text.contains("What is a warranty?"));
        assert!(built.text.contains("Source: ia2015.pdf (Page 4)"));
        assert!(built.text.contains("No relevant case law found."));
        assert!(built.text.contains("No relevant Q&A found."));
        assert!(built.text.contains("Step 2: Apply the Hierarchy of Legal Authority"));
        assert_eq!(built.metadata.source_prompt_id, "odes.direct");
        assert_eq!(built.metadata.evidence_sections, vec!["primary_legislation"]);
    }

    #[test]
    fn test_scenario_prompt_includes_policy_and_claim() {
        let def = builtin_prompt(PromptMode::PairedScenario);
        let inputs = PromptInputs::scenario("Escape of water is covered.", "Pipe burst in loft.");

        let built = build_prompt(&def, &inputs, &[]).unwrap();

        assert!(built.text.contains("Policy Wording: Escape of water is covered."));
        assert!(built.text.contains("Claim Summary : Pipe burst in loft."));
        assert!(built.text.contains("is this claim covered under this policy?"));
        assert_eq!(built.metadata.mode, PromptMode::PairedScenario);
        assert!(built.metadata.evidence_sections.is_empty());
    }

    #[test]
    fn test_unknown_collections_rendered_as_additional_evidence() {
        let def = builtin_prompt(PromptMode::DirectQuestion);
        let evidence = vec![section("ombudsman", "Ombudsman Decisions", "DRN-123 upheld")];

        let built = build_prompt(&def, &PromptInputs::question("Q"), &evidence).unwrap();

        assert!(built.text.contains("Ombudsman Decisions:"));
        assert!(built.text.contains("DRN-123 upheld"));
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let result = render_template("{{#if question}}unterminated", &json!({}));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
