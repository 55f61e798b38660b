//! Prompt types for the Odes assistant.
//!
//! This module defines the domain entities for the prompt system.

use odes_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Which instruction template frames the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// A single free-form question
    DirectQuestion,

    /// Policy wording plus claim summary: "is this claim covered?"
    PairedScenario,
}

impl PromptMode {
    /// Prompt identifier, also the file stem of a workspace override.
    pub fn prompt_id(self) -> &'static str {
        match self {
            PromptMode::DirectQuestion => "odes.direct",
            PromptMode::PairedScenario => "odes.scenario",
        }
    }
}

/// User-supplied inputs for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PromptInputs {
    DirectQuestion {
        question: String,
    },
    PairedScenario {
        policy_wording: String,
        claim_summary: String,
    },
}

impl PromptInputs {
    pub fn question(question: impl Into<String>) -> Self {
        PromptInputs::DirectQuestion {
            question: question.into(),
        }
    }

    pub fn scenario(policy_wording: impl Into<String>, claim_summary: impl Into<String>) -> Self {
        PromptInputs::PairedScenario {
            policy_wording: policy_wording.into(),
            claim_summary: claim_summary.into(),
        }
    }

    pub fn mode(&self) -> PromptMode {
        match self {
            PromptInputs::DirectQuestion { .. } => PromptMode::DirectQuestion,
            PromptInputs::PairedScenario { .. } => PromptMode::PairedScenario,
        }
    }

    /// Reject blank inputs. Must pass before any network call is made.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            PromptInputs::DirectQuestion { question } => {
                if question.trim().is_empty() {
                    return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
                }
            }
            PromptInputs::PairedScenario {
                policy_wording,
                claim_summary,
            } => {
                if policy_wording.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "Policy wording cannot be empty".to_string(),
                    ));
                }
                if claim_summary.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "Claim summary cannot be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Text sent to the retrieval service.
    pub fn query_text(&self) -> String {
        match self {
            PromptInputs::DirectQuestion { question } => question.clone(),
            PromptInputs::PairedScenario {
                policy_wording,
                claim_summary,
            } => format!("{} {}", policy_wording, claim_summary),
        }
    }

    /// Content recorded as the user's conversation turn.
    pub fn user_turn(&self) -> String {
        match self {
            PromptInputs::DirectQuestion { question } => question.clone(),
            PromptInputs::PairedScenario {
                policy_wording,
                claim_summary,
            } => format!(
                "Policy Wording:\n{}\n\nClaim Summary:\n{}",
                policy_wording, claim_summary
            ),
        }
    }
}

/// Formatted evidence from one collection, in authority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSection {
    /// Collection identifier
    pub id: String,

    /// Collection display name
    pub name: String,

    /// Formatted evidence text; empty when nothing survived
    pub text: String,
}

/// A prompt definition, either built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// A fully rendered prompt ready for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    pub mode: PromptMode,

    /// Collections whose evidence was non-empty
    #[serde(rename = "evidenceSections")]
    pub evidence_sections: Vec<String>,
}
