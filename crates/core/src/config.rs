//! Configuration management for the Odes assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.odes/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources override earlier ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collections::{Collection, CollectionCatalog};
use crate::error::{AppError, AppResult};

pub const DEFAULT_RAG_URL: &str = "http://localhost:8082";
pub const DEFAULT_LLM_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "mistral";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .odes/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Base URL of the retrieval service (`/query`, `/download/{file}`)
    pub rag_url: String,

    /// Full URL of the generation endpoint
    pub llm_url: String,

    /// Generation model identifier
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub retrieval: RetrievalConfig,

    pub context: ContextConfig,

    pub generation: GenerationConfig,

    /// Ordered collection catalog
    pub collections: CollectionCatalog,
}

/// Evidence retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Per-request HTTP timeout for one collection query
    #[serde(rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,

    /// Upper bound on the whole fan-out wait
    #[serde(rename = "fanoutDeadlineSecs")]
    pub fanout_deadline_secs: u64,

    /// Extra attempts per collection after a failed query
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            fanout_deadline_secs: 60,
            max_retries: 0,
        }
    }
}

/// Context budget parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Matches with a distance above this are discarded
    #[serde(rename = "relevanceThreshold")]
    pub relevance_threshold: f64,

    /// Characters per estimated token
    #[serde(rename = "charsPerToken")]
    pub chars_per_token: usize,

    /// Token ceiling for the whole prompt
    #[serde(rename = "maxTokens")]
    pub max_tokens: usize,

    /// Tokens reserved for the instruction template
    #[serde(rename = "systemPromptTokens")]
    pub system_prompt_tokens: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.5,
            chars_per_token: 4,
            max_tokens: 7000,
            system_prompt_tokens: 500,
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.chars_per_token == 0 {
            return Err(AppError::Config(
                "context.charsPerToken must be greater than zero".to_string(),
            ));
        }
        if !self.relevance_threshold.is_finite() || self.relevance_threshold <= 0.0 {
            return Err(AppError::Config(format!(
                "context.relevanceThreshold must be a positive number, got {}",
                self.relevance_threshold
            )));
        }
        if self.system_prompt_tokens > self.max_tokens {
            return Err(AppError::Config(format!(
                "context.systemPromptTokens ({}) exceeds context.maxTokens ({})",
                self.system_prompt_tokens, self.max_tokens
            )));
        }
        Ok(())
    }
}

/// Generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on one streamed exchange
    #[serde(rename = "streamDeadlineSecs")]
    pub stream_deadline_secs: u64,

    /// Request an incremental response
    pub stream: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stream_deadline_secs: 300,
            stream: true,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    endpoints: Option<EndpointsConfig>,
    model: Option<String>,
    retrieval: Option<RetrievalConfig>,
    context: Option<ContextConfig>,
    generation: Option<GenerationConfig>,
    collections: Option<Vec<Collection>>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EndpointsConfig {
    #[serde(rename = "ragUrl")]
    rag_url: Option<String>,
    #[serde(rename = "llmUrl")]
    llm_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            rag_url: DEFAULT_RAG_URL.to_string(),
            llm_url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
            collections: CollectionCatalog::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file, and environment variables.
    ///
    /// Environment variables:
    /// - `ODES_WORKSPACE`: Override workspace path
    /// - `ODES_CONFIG`: Path to config file
    /// - `ODES_RAG_URL`: Retrieval service base URL
    /// - `ODES_LLM_URL`: Generation endpoint URL
    /// - `ODES_MODEL`: Model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use odes_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Retrieval service: {}", config.rag_url);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `ODES_WORKSPACE` and `ODES_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace =
            workspace.or_else(|| std::env::var("ODES_WORKSPACE").ok().map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        let config_file =
            config_file.or_else(|| std::env::var("ODES_CONFIG").ok().map(PathBuf::from));
        if let Some(config_file) = config_file {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.odes_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(rag_url) = std::env::var("ODES_RAG_URL") {
            config.rag_url = rag_url;
        }

        if let Ok(llm_url) = std::env::var("ODES_LLM_URL") {
            config.llm_url = llm_url;
        }

        if let Ok(model) = std::env::var("ODES_MODEL") {
            config.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        self.merge(config_file)
    }

    fn merge(&self, config_file: ConfigFile) -> AppResult<Self> {
        let mut result = self.clone();

        if let Some(endpoints) = config_file.endpoints {
            if let Some(rag_url) = endpoints.rag_url {
                result.rag_url = rag_url;
            }
            if let Some(llm_url) = endpoints.llm_url {
                result.llm_url = llm_url;
            }
        }

        if let Some(model) = config_file.model {
            result.model = model;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(context) = config_file.context {
            result.context = context;
        }

        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }

        if let Some(collections) = config_file.collections {
            result.collections = CollectionCatalog::new(collections)?;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        rag_url: Option<String>,
        llm_url: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(rag_url) = rag_url {
            self.rag_url = rag_url;
        }

        if let Some(llm_url) = llm_url {
            self.llm_url = llm_url;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .odes directory.
    pub fn odes_dir(&self) -> PathBuf {
        self.workspace.join(".odes")
    }

    /// Validate the effective configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model cannot be empty".to_string()));
        }

        for (name, url) in [("rag_url", &self.rag_url), ("llm_url", &self.llm_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{} must be an http(s) URL, got: {}",
                    name, url
                )));
            }
        }

        self.collections.validate()?;
        self.context.validate()?;

        Ok(())
    }
}
