//! Command handlers for the Odes CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod collections;
pub mod download;
mod exchange;
pub mod prompts;
pub mod scenario;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use collections::CollectionsCommand;
pub use download::DownloadCommand;
pub use prompts::PromptsCommand;
pub use scenario::ScenarioCommand;
