//! Session domain model.
//!
//! A session is an ordered sequence of messages archived under a generated
//! identifier and a title derived from its first user message.

use super::message::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Maximum length of a derived session title before truncation.
const TITLE_MAX_CHARS: usize = 40;

/// An archived conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session title, derived from the first user message
    pub title: String,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Timestamp when the session was archived (ISO 8601 format)
    pub created_at: String,
}

impl Session {
    /// Archives a message list into a new session with a derived title.
    pub fn archive(messages: Vec<Message>) -> Self {
        let title = derive_title(&messages);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            messages,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Derives a session title from its messages.
///
/// The title is the first user message truncated to 40 characters (with a
/// `...` suffix when truncated); sessions with no user message fall back to
/// a timestamped label.
pub fn derive_title(messages: &[Message]) -> String {
    let first_user = messages.iter().find(|m| m.role == MessageRole::User);
    match first_user {
        Some(msg) => {
            let chars: Vec<char> = msg.content.chars().collect();
            if chars.len() > TITLE_MAX_CHARS {
                let head: String = chars[..TITLE_MAX_CHARS].iter().collect();
                format!("{}...", head)
            } else {
                msg.content.clone()
            }
        }
        None => format!("Session {}", chrono::Local::now().format("%H:%M:%S")),
    }
}
