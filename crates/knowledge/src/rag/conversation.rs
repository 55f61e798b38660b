//! Append-only conversation history.

use crate::rag::ask::{AskOptions, Pipeline};
use crate::rag::types::{failure_message, AskOutcome, ConversationTurn};
use chrono::{DateTime, Utc};
use odes_core::AppResult;
use odes_llm::SessionState;
use odes_prompt::PromptInputs;
use serde::Serialize;
use uuid::Uuid;

/// A sequence of exchanges with the assistant.
///
/// `ask` borrows the conversation mutably, so only one generation session
/// can be active per conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    id: Uuid,
    created_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Run one exchange and record it.
    ///
    /// Invalid inputs return an error and leave the history untouched. Any
    /// other failure still records a single assistant error turn.
    pub async fn ask(
        &mut self,
        pipeline: &Pipeline,
        inputs: PromptInputs,
        options: AskOptions,
    ) -> AppResult<AskOutcome> {
        inputs.validate()?;

        tracing::info!(conversation = %self.id, mode = inputs.mode().prompt_id(), "New exchange");
        self.turns.push(ConversationTurn::user(inputs.user_turn()));

        let outcome = match pipeline.run(&inputs, options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(conversation = %self.id, "Exchange failed: {}", e);
                self.turns
                    .push(ConversationTurn::assistant(failure_message(e.status())));
                return Err(e);
            }
        };

        match outcome.state {
            SessionState::Complete | SessionState::CancelledComplete => {
                let answer = outcome.answer.trim();
                if !answer.is_empty() {
                    self.turns.push(ConversationTurn::assistant(answer));
                }
            }
            SessionState::Failed => {
                self.turns
                    .push(ConversationTurn::assistant(failure_message(outcome.status)));
            }
            _ => {}
        }

        Ok(outcome)
    }
}
