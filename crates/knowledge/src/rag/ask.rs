//! Question answering pipeline.
//!
//! Fans the query out to every collection, assembles a bounded context,
//! renders the mode's prompt and runs one generation session over it.

use crate::citation::extract_segments;
use crate::client::{EvidenceSource, HttpEvidenceClient};
use crate::context::{AssembledContext, ContextAssembler};
use crate::fanout::fan_out;
use crate::rag::types::AskOutcome;
use odes_core::{AppConfig, AppError, AppResult, CollectionCatalog};
use odes_llm::{create_client, LlmClient, LlmRequest, SessionState, StreamSession};
use odes_prompt::{build_prompt, resolve_prompt, BuiltPrompt, PromptInputs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Per-request controls supplied by the caller.
#[derive(Debug, Default)]
pub struct AskOptions {
    /// Cancels retrieval or generation; any partial answer is kept
    pub cancel: CancellationToken,

    /// Receives a snapshot of the answer after every fragment
    pub progress: Option<watch::Sender<String>>,
}

impl AskOptions {
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: watch::Sender<String>) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Wiring of retrieval, prompt rendering and generation.
pub struct Pipeline {
    source: Arc<dyn EvidenceSource>,
    llm: Arc<dyn LlmClient>,
    catalog: CollectionCatalog,
    assembler: ContextAssembler,
    model: String,
    workspace: PathBuf,
    fanout_deadline: Option<Duration>,
    stream_deadline: Option<Duration>,
    stream: bool,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn EvidenceSource>,
        llm: Arc<dyn LlmClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            llm,
            catalog: config.collections.clone(),
            assembler: ContextAssembler::new(&config.context),
            model: config.model.clone(),
            workspace: config.workspace.clone(),
            fanout_deadline: non_zero_secs(config.retrieval.fanout_deadline_secs),
            stream_deadline: non_zero_secs(config.generation.stream_deadline_secs),
            stream: config.generation.stream,
        }
    }

    /// Build the HTTP-backed pipeline described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let source = Arc::new(HttpEvidenceClient::from_config(config)?);
        let llm = create_client("ollama", Some(&config.llm_url))?;
        Ok(Self::new(source, llm, config))
    }

    pub fn catalog(&self) -> &CollectionCatalog {
        &self.catalog
    }

    /// Fan out and assemble the evidence for a query.
    pub async fn retrieve(&self, query: &str) -> AppResult<AssembledContext> {
        let outcomes = fan_out(
            Arc::clone(&self.source),
            &self.catalog,
            query,
            self.fanout_deadline,
        )
        .await?;
        Ok(self.assembler.assemble(&outcomes))
    }

    /// Render the prompt for `inputs` over an assembled context.
    pub fn build(
        &self,
        inputs: &PromptInputs,
        context: &AssembledContext,
    ) -> AppResult<BuiltPrompt> {
        let definition = resolve_prompt(&self.workspace, inputs.mode())?;
        build_prompt(&definition, inputs, &context.evidence_sections())
    }

    /// Answer one question end to end.
    ///
    /// Invalid inputs are rejected before any network call. Retrieval and
    /// generation failures are reported through the outcome state. Cancelling
    /// during retrieval ends the exchange without calling the generator.
    pub async fn run(&self, inputs: &PromptInputs, options: AskOptions) -> AppResult<AskOutcome> {
        inputs.validate()?;
        let mode = inputs.mode();

        let query = inputs.query_text();
        let retrieval = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => {
                tracing::info!("Cancelled during retrieval");
                return Ok(AskOutcome::without_answer(mode, SessionState::CancelledComplete, None));
            }
            retrieval = self.retrieve(&query) => retrieval,
        };

        let context = match retrieval {
            Ok(context) => context,
            Err(AppError::Retrieval(reason)) => {
                tracing::error!("Retrieval failed: {}", reason);
                return Ok(AskOutcome::without_answer(
                    mode,
                    SessionState::Failed,
                    Some(reason),
                ));
            }
            Err(e) => return Err(e),
        };

        let prompt = self.build(inputs, &context)?;
        tracing::debug!(
            prompt_id = prompt.metadata.source_prompt_id.as_str(),
            chars = prompt.text.len(),
            "Prompt built"
        );

        let mut request = LlmRequest::new(prompt.text, self.model.clone());
        if self.stream {
            request = request.with_streaming();
        }

        let sources = context.sources();
        let mut session = StreamSession::new(options.cancel).with_sources(sources.clone());
        if let Some(deadline) = self.stream_deadline {
            session = session.with_deadline(deadline);
        }
        if let Some(progress) = options.progress {
            session = session.with_progress(progress);
        }

        let outcome = session.run(self.llm.as_ref(), &request).await;

        tracing::info!(
            state = outcome.state.as_str(),
            chunks = outcome.chunks,
            skipped = outcome.skipped_chunks,
            "Generation finished"
        );

        Ok(AskOutcome {
            mode,
            state: outcome.state,
            segments: extract_segments(&outcome.answer),
            answer: outcome.answer,
            sources,
            context_tokens: context.total_tokens(),
            status: outcome.status,
            error: outcome.error,
        })
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
