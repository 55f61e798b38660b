//! Ask command handler.
//!
//! Answers a single free-form question.

use super::exchange::{run_exchange, ExchangeOptions};
use clap::Args;
use odes_core::{config::AppConfig, AppError, AppResult};
use odes_prompt::PromptInputs;
use std::path::PathBuf;

/// Ask a legal or insurance question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.get_question()?;

        run_exchange(
            config,
            PromptInputs::question(question),
            ExchangeOptions {
                json: self.json,
                no_stream: self.no_stream,
            },
        )
        .await
    }

    /// Get the question text from the argument or file.
    fn get_question(&self) -> AppResult<String> {
        if let Some(question) = &self.question {
            return Ok(question.clone());
        }
        match &self.file {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Err(AppError::InvalidInput("No question provided".to_string())),
        }
    }
}
