//! Backend seam for the generation service.
//!
//! Wire types for a streaming `generateContent`-style request, the chunk
//! type the backend yields, and the two-class error model (capacity versus
//! everything else) that drives the retry policy.

use async_trait::async_trait;
use lumina_core::session::Citation;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors produced by a generative backend.
///
/// Only two classes matter to the caller: capacity exhaustion (rate/quota
/// limits, retried with backoff) and everything else (not retried).
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The service reported a rate/quota limit (HTTP 429 or a
    /// `RESOURCE_EXHAUSTED` status marker).
    #[error("capacity exhausted: {0}")]
    Capacity(String),

    /// The request could not be sent or the service rejected it.
    #[error("request failed: {0}")]
    Request(String),

    /// The response arrived but could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// True for errors that the orchestrator retries with backoff.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity(_))
    }
}

/// One unit of streamed output from the service.
///
/// A chunk may carry a text delta, citation entries, both, or neither
/// (keep-alive chunks are possible and simply produce nothing).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    /// Incremental text delta.
    pub text: Option<String>,
    /// Grounding citations attached to this chunk, verbatim.
    pub citations: Option<Vec<Citation>>,
}

/// Receiver half of a backend chunk stream.
///
/// Mid-stream failures arrive as `Err` items; the channel closing without
/// an error means the remote stream completed normally.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, BackendError>>;

/// A streaming text-generation backend.
///
/// Each call starts a fresh request; consumption is forward-only and
/// single-pass. Implementations must not share mutable state between calls.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Starts a streaming generation request.
    async fn stream_generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ChunkReceiver, BackendError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Sampling temperature used for every request.
pub const TEMPERATURE: f64 = 0.5;
/// Nucleus-sampling threshold used for every request.
///
/// f64 so the wire value is exactly 0.9 (an f32 widens to 0.89999997...).
pub const TOP_P: f64 = 0.9;

/// A full generation request: instruction, ordered turns, and parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GenerateRequest {
    /// Standard request shape: fixed sampling parameters and the web-search
    /// augmentation tool enabled.
    pub fn new(system_instruction: String, contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part::text(system_instruction)],
            }),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
            },
            tools: vec![Tool::google_search()],
        }
    }
}

/// One conversation turn on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// A part of a turn: text or inline binary data.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline_data(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataPayload {
    pub mime_type: String,
    pub data: String,
}

/// Generation parameters; fixed for every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
}

/// A tool augmentation flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleSearch {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateRequest::new(
            "be brief".to_string(),
            vec![Content {
                role: "user".to_string(),
                parts: vec![Part::text("hi")],
            }],
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["topP"], 0.9);
        assert!(json["tools"][0]["googleSearch"].is_object());
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn test_inline_data_part_shape() {
        let part = Part::inline_data("aGk=", "image/png");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["inlineData"]["data"], "aGk=");
    }

    #[test]
    fn test_capacity_classification() {
        assert!(BackendError::Capacity("429".to_string()).is_capacity());
        assert!(!BackendError::Request("boom".to_string()).is_capacity());
        assert!(!BackendError::Malformed("bad json".to_string()).is_capacity());
    }
}
