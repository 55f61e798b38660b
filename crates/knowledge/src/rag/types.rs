//! Conversation and answer types.

use crate::citation::Segment;
use chrono::{DateTime, Utc};
use odes_llm::SessionState;
use odes_prompt::PromptMode;
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of one question run through the pipeline.
///
/// A failed generation is still an outcome: `state` is
/// [`SessionState::Failed`] and `error` says why.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub mode: PromptMode,
    pub state: SessionState,
    pub answer: String,

    /// Answer split into text and citations
    pub segments: Vec<Segment>,

    /// Collections that contributed evidence
    pub sources: Vec<String>,

    /// Estimated evidence tokens placed in the prompt
    pub context_tokens: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AskOutcome {
    /// An outcome that ended before any generation took place.
    pub(crate) fn without_answer(
        mode: PromptMode,
        state: SessionState,
        error: Option<String>,
    ) -> Self {
        Self {
            mode,
            state,
            answer: String::new(),
            segments: Vec::new(),
            sources: Vec::new(),
            context_tokens: 0,
            status: None,
            error,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == SessionState::Failed
    }
}

/// Assistant message recorded when generation fails.
pub fn failure_message(status: Option<u16>) -> String {
    match status {
        Some(status) => format!("Error: Failed to get response from LLM. Status: {}.", status),
        None => "Error: Failed to get response from LLM. Status: unavailable.".to_string(),
    }
}
