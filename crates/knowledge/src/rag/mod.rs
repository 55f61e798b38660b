//! Retrieval-augmented answering over the legal collections.

pub mod ask;
pub mod conversation;
pub mod types;

pub use ask::{AskOptions, Pipeline};
pub use conversation::Conversation;
pub use types::{failure_message, AskOutcome, ConversationTurn, Role};
