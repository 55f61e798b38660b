//! Download command handler.

use clap::Args;
use odes_core::{config::AppConfig, AppResult};
use odes_knowledge::DocumentDownloader;
use std::path::PathBuf;

/// Download a cited source document
#[derive(Args, Debug)]
pub struct DownloadCommand {
    /// Document filename as it appears in a citation
    pub filename: String,

    /// Where to write the document (default: ./<filename>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DownloadCommand {
    /// Execute the download command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing download command");

        let downloader = DocumentDownloader::from_config(config)?;
        let path = downloader
            .download_to(&self.filename, self.output.as_deref())
            .await?;

        println!("Saved {} to {}", self.filename, path.display());
        Ok(())
    }
}
