//! Shared runner for a single question/answer exchange.

use odes_core::{config::AppConfig, AppError, AppResult};
use odes_knowledge::rag::failure_message;
use odes_knowledge::{cited_documents, AskOptions, AskOutcome, Conversation, Pipeline};
use odes_llm::SessionState;
use odes_prompt::PromptInputs;
use std::io::Write;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Output switches shared by `ask` and `scenario`.
pub struct ExchangeOptions {
    pub json: bool,
    pub no_stream: bool,
}

/// Run one exchange, streaming the answer to stdout as it arrives.
///
/// Ctrl-C cancels generation and keeps the partial answer.
pub async fn run_exchange(
    config: &AppConfig,
    inputs: PromptInputs,
    options: ExchangeOptions,
) -> AppResult<()> {
    let mut config = config.clone();
    if options.no_stream {
        config.generation.stream = false;
    }

    let pipeline = Pipeline::from_config(&config)?;
    let mut conversation = Conversation::new();

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling generation");
                cancel.cancel();
            }
        }
    });

    let (progress, snapshots) = watch::channel(String::new());
    let printer = tokio::spawn(print_deltas(snapshots, !options.json));

    let ask_options = AskOptions::default()
        .with_cancel(cancel)
        .with_progress(progress);
    let result = conversation.ask(&pipeline, inputs, ask_options).await;

    interrupt.abort();
    if let Err(e) = printer.await {
        tracing::debug!("Printer task ended abnormally: {}", e);
    }

    let outcome = result?;

    if options.json {
        let output = serde_json::json!({
            "conversationId": conversation.id(),
            "outcome": outcome,
            "turns": conversation.turns(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&outcome);
    }

    if outcome.state == SessionState::Failed {
        return Err(AppError::Llm(
            outcome
                .error
                .unwrap_or_else(|| failure_message(outcome.status)),
        ));
    }

    Ok(())
}

/// Print the unseen tail of each answer snapshot.
async fn print_deltas(mut snapshots: watch::Receiver<String>, enabled: bool) {
    let mut printed = 0;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if enabled {
            if let Some(delta) = snapshot.get(printed..) {
                print!("{}", delta);
                std::io::stdout().flush().ok();
            }
        }
        printed = snapshot.len();
    }
}

fn print_summary(outcome: &AskOutcome) {
    if !outcome.answer.is_empty() {
        println!();
    }

    match outcome.state {
        SessionState::CancelledComplete => eprintln!("\n[generation stopped; partial answer kept]"),
        SessionState::Failed => eprintln!("{}", failure_message(outcome.status)),
        _ => {}
    }

    let cited = cited_documents(&outcome.segments);
    if !cited.is_empty() {
        println!("\nSources:");
        for (i, (filename, page)) in cited.iter().enumerate() {
            println!("  [{}] {} (Page {})", i + 1, filename, page);
        }
        println!("\nFetch a document with: odes download \"<filename>\"");
    }

    tracing::debug!(
        "Evidence from {:?} ({} tokens)",
        outcome.sources,
        outcome.context_tokens
    );
}
