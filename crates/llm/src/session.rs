//! Streamed generation sessions.
//!
//! A [`StreamSession`] drives one request/response exchange with a
//! generation endpoint:
//!
//! ```text
//! Idle → Sending → Streaming → { Complete | CancelledComplete | Failed }
//! ```
//!
//! The read loop is the only writer of the accumulated answer. Observers get
//! a snapshot through a `watch` channel after every fragment. Cancellation is
//! driven by a caller-owned [`CancellationToken`] and is checked before every
//! read, so it takes effect at the next fragment boundary at the latest.
//! Cancelling keeps the text received so far as the final answer.

use crate::client::{LlmClient, LlmRequest};
use futures::StreamExt;
use odes_core::AppError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Complete,
    CancelledComplete,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::CancelledComplete | SessionState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Sending => "sending",
            SessionState::Streaming => "streaming",
            SessionState::Complete => "complete",
            SessionState::CancelledComplete => "cancelled_complete",
            SessionState::Failed => "failed",
        }
    }
}

/// Final result of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Terminal state
    pub state: SessionState,

    /// Accumulated answer (partial when cancelled or failed mid-stream)
    pub answer: String,

    /// HTTP status of a rejected request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Collections that contributed evidence to the prompt
    pub sources: BTreeSet<String>,

    /// Fragments appended to the answer
    pub chunks: usize,

    /// Malformed fragments that were skipped
    pub skipped_chunks: usize,

    /// Every state the session went through, in order
    pub transitions: Vec<SessionState>,
}

impl SessionOutcome {
    /// Whether the answer should be kept (complete or cancelled-complete).
    pub fn has_answer(&self) -> bool {
        matches!(
            self.state,
            SessionState::Complete | SessionState::CancelledComplete
        )
    }
}

/// Live state of one generation exchange.
pub struct StreamSession {
    state: SessionState,
    answer: String,
    sources: BTreeSet<String>,
    cancel: CancellationToken,
    deadline: Option<Duration>,
    progress: watch::Sender<String>,
    transitions: Vec<SessionState>,
    chunks: usize,
    skipped_chunks: usize,
}

impl StreamSession {
    pub fn new(cancel: CancellationToken) -> Self {
        let (progress, _) = watch::channel(String::new());
        Self {
            state: SessionState::Idle,
            answer: String::new(),
            sources: BTreeSet::new(),
            cancel,
            deadline: None,
            progress,
            transitions: vec![SessionState::Idle],
            chunks: 0,
            skipped_chunks: 0,
        }
    }

    /// Bound the whole exchange. Hitting the deadline while streaming ends the
    /// session as cancelled-complete; hitting it before the stream starts fails it.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Record which collections the prompt drew evidence from.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Publish answer snapshots on a caller-owned channel.
    pub fn with_progress(mut self, progress: watch::Sender<String>) -> Self {
        self.progress = progress;
        self
    }

    /// Observe answer snapshots.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.progress.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the exchange to a terminal state.
    ///
    /// Never returns an error: failures end in [`SessionState::Failed`] with
    /// the status and message recorded on the outcome.
    pub async fn run(mut self, client: &dyn LlmClient, request: &LlmRequest) -> SessionOutcome {
        let deadline = self.deadline.map(|d| Instant::now() + d);
        self.transition(SessionState::Sending);

        if request.stream {
            self.run_streaming(client, request, deadline).await
        } else {
            self.run_complete(client, request, deadline).await
        }
    }

    async fn run_streaming(
        mut self,
        client: &dyn LlmClient,
        request: &LlmRequest,
        deadline: Option<Instant>,
    ) -> SessionOutcome {
        let cancel = self.cancel.clone();

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.cancelled(),
            _ = wait_until(deadline) => {
                return self.fail(None, "deadline exceeded before the stream started".to_string())
            }
            result = client.stream(request) => result,
        };

        let mut stream = match started {
            Ok(stream) => stream,
            Err(e) => return self.fail_with(e),
        };

        self.transition(SessionState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(),
                _ = wait_until(deadline) => {
                    tracing::warn!(
                        chars = self.answer.len(),
                        "Stream deadline reached, keeping partial answer"
                    );
                    return self.finish(SessionState::CancelledComplete);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    self.chunks += 1;
                    self.append(&chunk.content);
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(AppError::ChunkDecode(reason))) => {
                    self.skipped_chunks += 1;
                    tracing::warn!("Skipping malformed stream chunk: {}", reason);
                }
                Some(Err(e)) => return self.fail_with(e),
                None => break,
            }
        }

        self.finish(SessionState::Complete)
    }

    async fn run_complete(
        mut self,
        client: &dyn LlmClient,
        request: &LlmRequest,
        deadline: Option<Instant>,
    ) -> SessionOutcome {
        let cancel = self.cancel.clone();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.cancelled(),
            _ = wait_until(deadline) => {
                return self.fail(None, "deadline exceeded waiting for the response".to_string())
            }
            result = client.complete(request) => result,
        };

        match result {
            Ok(response) => {
                self.transition(SessionState::Streaming);
                self.chunks = 1;
                self.append(&response.content);
                self.finish(SessionState::Complete)
            }
            Err(e) => self.fail_with(e),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "Session transition");
        self.state = next;
        self.transitions.push(next);
    }

    fn append(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.answer.push_str(fragment);
        self.progress.send_replace(self.answer.clone());
    }

    fn cancelled(self) -> SessionOutcome {
        tracing::info!(chars = self.answer.len(), "Generation cancelled, keeping partial answer");
        self.finish(SessionState::CancelledComplete)
    }

    fn fail_with(self, error: AppError) -> SessionOutcome {
        let status = error.status();
        self.fail(status, error.to_string())
    }

    fn fail(mut self, status: Option<u16>, error: String) -> SessionOutcome {
        tracing::error!(status = ?status, "Generation failed: {}", error);
        self.transition(SessionState::Failed);
        self.into_outcome(status, Some(error))
    }

    fn finish(mut self, state: SessionState) -> SessionOutcome {
        self.transition(state);
        self.into_outcome(None, None)
    }

    fn into_outcome(self, status: Option<u16>, error: Option<String>) -> SessionOutcome {
        SessionOutcome {
            state: self.state,
            answer: self.answer,
            status,
            error,
            sources: self.sources,
            chunks: self.chunks,
            skipped_chunks: self.skipped_chunks,
            transitions: self.transitions,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmResponse, LlmStream, LlmStreamChunk};
    use odes_core::AppResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Frag {
        Text(&'static str),
        Done(&'static str),
        Garbage,
        Fatal,
    }

    struct ScriptedClient {
        status: Option<u16>,
        frags: Vec<Frag>,
        hang_after: bool,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn streaming(frags: Vec<Frag>, hang_after: bool) -> Self {
            Self {
                status: None,
                frags,
                hang_after,
                calls: AtomicUsize::new(0),
            }
        }

        fn rejecting(status: u16) -> Self {
            Self {
                status: Some(status),
                frags: Vec::new(),
                hang_after: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn check_status(&self) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.status {
                Some(status) => Err(AppError::LlmStatus {
                    status,
                    body: "internal error".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.check_status()?;
            let content = self
                .frags
                .iter()
                .filter_map(|f| match f {
                    Frag::Text(t) | Frag::Done(t) => Some(*t),
                    _ => None,
                })
                .collect();
            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                done: true,
            })
        }

        async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
            self.check_status()?;
            let items: Vec<AppResult<LlmStreamChunk>> = self
                .frags
                .iter()
                .map(|f| match f {
                    Frag::Text(t) => Ok(LlmStreamChunk::text(*t)),
                    Frag::Done(t) => Ok(LlmStreamChunk::last(*t)),
                    Frag::Garbage => Err(AppError::ChunkDecode("expected value".to_string())),
                    Frag::Fatal => Err(AppError::Llm("connection reset".to_string())),
                })
                .collect();

            let stream = futures::stream::iter(items);
            if self.hang_after {
                Ok(Box::pin(stream.chain(futures::stream::pending())))
            } else {
                Ok(Box::pin(stream))
            }
        }
    }

    fn request() -> LlmRequest {
        LlmRequest::new("prompt", "mistral").with_streaming()
    }

    #[tokio::test]
    async fn test_clean_stream_completes() {
        let client = ScriptedClient::streaming(
            vec![Frag::Text("Hello"), Frag::Text(", world"), Frag::Done("")],
            false,
        );
        let session = StreamSession::new(CancellationToken::new());
        let progress = session.subscribe();

        let outcome = session.run(&client, &request()).await;

        assert_eq!(outcome.state, SessionState::Complete);
        assert_eq!(outcome.answer, "Hello, world");
        assert_eq!(*progress.borrow(), "Hello, world");
        assert_eq!(
            outcome.transitions,
            vec![
                SessionState::Idle,
                SessionState::Sending,
                SessionState::Streaming,
                SessionState::Complete
            ]
        );
    }

    #[tokio::test]
    async fn test_done_fragment_stops_reading() {
        let client = ScriptedClient::streaming(vec![Frag::Done("All of it")], true);
        let outcome = StreamSession::new(CancellationToken::new())
            .run(&client, &request())
            .await;

        assert_eq!(outcome.state, SessionState::Complete);
        assert_eq!(outcome.answer, "All of it");
    }

    #[tokio::test]
    async fn test_malformed_chunks_are_skipped() {
        let client = ScriptedClient::streaming(
            vec![Frag::Text("a"), Frag::Garbage, Frag::Text("b")],
            false,
        );
        let outcome = StreamSession::new(CancellationToken::new())
            .run(&client, &request())
            .await;

        assert_eq!(outcome.state, SessionState::Complete);
        assert_eq!(outcome.answer, "ab");
        assert_eq!(outcome.chunks, 2);
        assert_eq!(outcome.skipped_chunks, 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_keeps_partial_answer() {
        let client =
            ScriptedClient::streaming(vec![Frag::Text("Partial"), Frag::Text(" answer")], true);
        let token = CancellationToken::new();
        let session = StreamSession::new(token.clone());
        let mut progress = session.subscribe();

        let canceller = async {
            while progress.changed().await.is_ok() {
                if *progress.borrow() == "Partial answer" {
                    token.cancel();
                    break;
                }
            }
        };

        let request = request();
        let (outcome, _) = tokio::join!(session.run(&client, &request), canceller);

        assert_eq!(outcome.state, SessionState::CancelledComplete);
        assert_eq!(outcome.answer, "Partial answer");
        assert!(outcome.error.is_none());
        assert!(outcome.has_answer());
    }

    #[tokio::test]
    async fn test_rejected_request_fails_before_streaming() {
        let client = ScriptedClient::rejecting(500);
        let outcome = StreamSession::new(CancellationToken::new())
            .run(&client, &request())
            .await;

        assert_eq!(outcome.state, SessionState::Failed);
        assert_eq!(outcome.status, Some(500));
        assert!(outcome.answer.is_empty());
        assert!(!outcome.transitions.contains(&SessionState::Streaming));
        assert!(!outcome.has_answer());
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream_fails_with_partial_text() {
        let client = ScriptedClient::streaming(vec![Frag::Text("Half"), Frag::Fatal], false);
        let outcome = StreamSession::new(CancellationToken::new())
            .run(&client, &request())
            .await;

        assert_eq!(outcome.state, SessionState::Failed);
        assert_eq!(outcome.answer, "Half");
        assert_eq!(outcome.status, None);
        assert!(outcome.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_cancelled_before_sending_never_calls_endpoint() {
        let client = ScriptedClient::streaming(vec![Frag::Text("unused")], false);
        let token = CancellationToken::new();
        token.cancel();

        let outcome = StreamSession::new(token).run(&client, &request()).await;

        assert_eq!(outcome.state, SessionState::CancelledComplete);
        assert!(outcome.answer.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_while_streaming_is_cancelled_complete() {
        let client = ScriptedClient::streaming(vec![Frag::Text("Slow")], true);
        let outcome = StreamSession::new(CancellationToken::new())
            .with_deadline(Duration::from_millis(50))
            .run(&client, &request())
            .await;

        assert_eq!(outcome.state, SessionState::CancelledComplete);
        assert_eq!(outcome.answer, "Slow");
    }

    #[tokio::test]
    async fn test_non_streaming_request_uses_complete() {
        let client =
            ScriptedClient::streaming(vec![Frag::Text("Whole "), Frag::Done("answer")], false);
        let (tx, rx) = watch::channel(String::new());
        let outcome = StreamSession::new(CancellationToken::new())
            .with_progress(tx)
            .with_sources(["case_law", "primary_legislation"])
            .run(&client, &LlmRequest::new("prompt", "mistral"))
            .await;

        assert_eq!(outcome.state, SessionState::Complete);
        assert_eq!(outcome.answer, "Whole answer");
        assert_eq!(*rx.borrow(), "Whole answer");
        assert_eq!(
            outcome.sources.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["case_law", "primary_legislation"]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
        assert!(SessionState::CancelledComplete.is_terminal());
        assert_eq!(SessionState::CancelledComplete.as_str(), "cancelled_complete");
    }
}
