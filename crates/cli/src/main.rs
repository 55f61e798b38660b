//! Odes CLI
//!
//! Main entry point for the odes command-line tool.
//! Answers legal and insurance questions from the retrieval service's
//! collections and streams the generated answer with its citations.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CollectionsCommand, DownloadCommand, PromptsCommand, ScenarioCommand,
};
use odes_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Odes - retrieval-augmented insurance law assistant
#[derive(Parser, Debug)]
#[command(name = "odes")]
#[command(about = "Retrieval-augmented insurance law assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ODES_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.odes/config.yaml)
    #[arg(short, long, global = true, env = "ODES_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Model identifier
    #[arg(short, long, global = true, env = "ODES_MODEL")]
    model: Option<String>,

    /// Retrieval service base URL
    #[arg(long, global = true, env = "ODES_RAG_URL")]
    rag_url: Option<String>,

    /// Generation endpoint URL
    #[arg(long, global = true, env = "ODES_LLM_URL")]
    llm_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a legal or insurance question
    Ask(AskCommand),

    /// Check whether a claim is covered by a policy wording
    Scenario(ScenarioCommand),

    /// Download a cited source document
    Download(DownloadCommand),

    /// Show the configured knowledge collections
    Collections(CollectionsCommand),

    /// List the prompts in effect for this workspace
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from the workspace and environment
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.rag_url,
        cli.llm_url,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("Odes CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Retrieval service: {}", config.rag_url);
    tracing::debug!("Generation endpoint: {} (model {})", config.llm_url, config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Scenario(_) => "scenario",
        Commands::Download(_) => "download",
        Commands::Collections(_) => "collections",
        Commands::Prompts(_) => "prompts",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = {
        use tracing::Instrument;
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).instrument(span).await,
            Commands::Scenario(cmd) => cmd.execute(&config).instrument(span).await,
            Commands::Download(cmd) => cmd.execute(&config).instrument(span).await,
            Commands::Collections(cmd) => span.in_scope(|| cmd.execute(&config)),
            Commands::Prompts(cmd) => span.in_scope(|| cmd.execute(&config)),
        }
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scenario_with_files() {
        let cli = Cli::try_parse_from([
            "odes",
            "scenario",
            "--policy-file",
            "policy.txt",
            "--claim",
            "Pipe burst",
            "--rag-url",
            "http://rag:8082",
        ])
        .unwrap();

        assert_eq!(cli.rag_url.as_deref(), Some("http://rag:8082"));
        match cli.command {
            Commands::Scenario(cmd) => {
                assert_eq!(cmd.policy_file, Some(PathBuf::from("policy.txt")));
                assert_eq!(cmd.claim.as_deref(), Some("Pipe burst"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_scenario_requires_claim() {
        assert!(Cli::try_parse_from(["odes", "scenario", "--policy", "p"]).is_err());
    }

    #[test]
    fn test_parse_ask_json() {
        let cli = Cli::try_parse_from(["odes", "ask", "Is theft covered?", "--json"]).unwrap();
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question.as_deref(), Some("Is theft covered?"));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_prompts_json() {
        let cli = Cli::try_parse_from(["odes", "prompts", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Prompts(PromptsCommand { json: true })));
    }
}
