//! Evidence retrieval and answering for Odes.
//!
//! Queries the legal knowledge collections in parallel, budgets the
//! returned passages into a prompt context, streams the generated answer
//! and maps its citations back to downloadable documents.

pub mod citation;
pub mod client;
pub mod context;
pub mod download;
pub mod fanout;
pub mod rag;
pub mod types;


// Re-export commonly used types
pub use citation::{cited_documents, extract_segments, reconstruct, Segment};
pub use client::{EvidenceSource, HttpEvidenceClient};
pub use context::{AssembledContext, ContextAssembler, ContextBudget, ContextSection};
pub use download::DocumentDownloader;
pub use fanout::fan_out;
pub use rag::{AskOptions, AskOutcome, Conversation, ConversationTurn, Pipeline, Role};
pub use types::{CollectionOutcome, Match, MatchMetadata, SourceOutcome};
