//! Scenario command handler.
//!
//! Asks whether a claim is covered under a policy wording.

use super::exchange::{run_exchange, ExchangeOptions};
use clap::Args;
use odes_core::{config::AppConfig, AppResult};
use odes_prompt::PromptInputs;
use std::path::PathBuf;

/// Check whether a claim is covered by a policy wording
#[derive(Args, Debug)]
pub struct ScenarioCommand {
    /// Policy wording text
    #[arg(long, required_unless_present = "policy_file")]
    pub policy: Option<String>,

    /// Read the policy wording from a file
    #[arg(long, conflicts_with = "policy")]
    pub policy_file: Option<PathBuf>,

    /// Claim summary text
    #[arg(long, required_unless_present = "claim_file")]
    pub claim: Option<String>,

    /// Read the claim summary from a file
    #[arg(long, conflicts_with = "claim")]
    pub claim_file: Option<PathBuf>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ScenarioCommand {
    /// Execute the scenario command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing scenario command");

        let policy = read_input(&self.policy, &self.policy_file)?;
        let claim = read_input(&self.claim, &self.claim_file)?;
        let inputs = PromptInputs::scenario(policy, claim);

        // Reject blanks before any client is built
        inputs.validate()?;

        run_exchange(
            config,
            inputs,
            ExchangeOptions {
                json: self.json,
                no_stream: self.no_stream,
            },
        )
        .await
    }
}

fn read_input(text: &Option<String>, file: &Option<PathBuf>) -> AppResult<String> {
    match (text, file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) => Ok(String::new()),
    }
}
