//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including roles, attachments, and search-grounding citations.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// An inline binary attachment carried by a message.
///
/// The payload is base64-encoded as required by the generation API's inline
/// data parts. No validation is performed beyond "non-empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base64-encoded bytes.
    pub data: String,
    /// Media type of the encoded bytes (e.g. `image/png`).
    pub mime_type: String,
}

/// One source entry inside a citation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CitationSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A search-grounding citation attached to streamed output.
///
/// The shape is dictated entirely by the external service and is treated as
/// opaque pass-through: every field is optional and unknown fields are
/// ignored on deserialization rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<CitationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps: Option<CitationSource>,
}

impl Citation {
    /// Returns the first usable (uri, title) pair, preferring web sources.
    pub fn link(&self) -> Option<(&str, &str)> {
        for source in [self.web.as_ref(), self.maps.as_ref()].into_iter().flatten() {
            if let Some(uri) = source.uri.as_deref() {
                return Some((uri, source.title.as_deref().unwrap_or(uri)));
            }
        }
        None
    }
}

/// A single message in a conversation history.
///
/// Messages are immutable once appended, except the single trailing
/// assistant message of the in-flight turn, which is filled in place as
/// streamed fragments arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The text content of the message.
    pub content: String,
    /// Creation timestamp (epoch milliseconds).
    pub timestamp: i64,
    /// Optional inline attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Citations accumulated while this message streamed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl Message {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            attachment,
            citations: None,
        }
    }

    /// Creates an empty assistant message, ready to be filled by a stream.
    pub fn assistant_placeholder() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            attachment: None,
            citations: None,
        }
    }
}
