//! Conversation persistence.
//!
//! Messages form a tree: each saved message points at its parent, and a
//! conversation is identified by the id of its leaf message. Saved ids are
//! stamped into [`Message::extra`] so a later save skips everything already
//! on disk.
//!
//! [`Message::extra`]: crate::llm::provider::Message

pub mod store;

pub use store::{ConversationSummary, MessageRecord, MessageStore, StoreError};

/// `Message::extra` key carrying the persisted message id.
pub const MESSAGE_ID_KEY: &str = "message_id";
