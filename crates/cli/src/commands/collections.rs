//! Collections command handler.

use clap::Args;
use odes_core::{config::AppConfig, AppResult};

/// Show the configured knowledge collections
#[derive(Args, Debug)]
pub struct CollectionsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CollectionsCommand {
    /// Execute the collections command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing collections command");

        if self.json {
            println!("{}", serde_json::to_string_pretty(&config.collections)?);
            return Ok(());
        }

        println!("{:<24} {:<24} {:>9}", "ID", "NAME", "N_RESULTS");
        for collection in config.collections.iter() {
            println!(
                "{:<24} {:<24} {:>9}",
                collection.id,
                collection.name,
                config.collections.results_for(&collection.id)
            );
        }
        Ok(())
    }
}
