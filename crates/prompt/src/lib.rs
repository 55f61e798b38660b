//! Prompt system for Odes.
//!
//! Renders the legal-method instruction templates with the user's inputs
//! and per-collection evidence. Built-in templates can be overridden per
//! workspace with YAML files under `.odes/prompts/`.

pub mod builder;
pub mod loader;
pub mod templates;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, resolve_prompt, validate_prompt};
pub use templates::{builtin_prompt, NAMED_EVIDENCE_SLOTS};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, EvidenceSection, PromptDefinition, PromptInputs, PromptMode,
};
