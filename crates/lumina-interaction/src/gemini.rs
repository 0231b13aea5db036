//! Gemini streaming client.
//!
//! Calls the Gemini REST API's `streamGenerateContent` endpoint with
//! `alt=sse` and decodes the server-sent event stream into [`StreamChunk`]s.
//! Configuration comes from `secret.json`; the client itself is an explicit,
//! caller-constructed object passed to whoever owns conversation state.

use crate::backend::{BackendError, ChunkReceiver, GenerateRequest, GenerativeBackend, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use lumina_core::config::SecretConfig;
use lumina_core::session::Citation;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;

/// Default model when secret.json does not name one.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Chunk channel depth; the remote stream is paced by consumption.
const CHANNEL_CAPACITY: usize = 32;

/// Streaming client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Builds a client from a loaded secret configuration.
    ///
    /// Model name defaults to `gemini-3-flash-preview` if not specified.
    pub fn try_from_config(config: &SecretConfig) -> Result<Self, BackendError> {
        let gemini = config.gemini.as_ref().ok_or_else(|| {
            BackendError::Request("Gemini configuration not found in secret.json".to_string())
        })?;
        let model = gemini
            .model_name
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        Ok(Self::new(gemini.api_key.clone(), model))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the endpoint base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{model}:streamGenerateContent?alt=sse&key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ChunkReceiver, BackendError> {
        let response = self
            .client
            .post(self.stream_url())
            .json(&request)
            .send()
            .await
            .map_err(|err| BackendError::Request(format!("Gemini API request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = SseLineBuffer::default();

            while let Some(item) = bytes.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx
                            .send(Err(BackendError::Request(format!(
                                "Gemini stream interrupted: {err}"
                            ))))
                            .await;
                        return;
                    }
                };

                for payload in buffer.push(&chunk) {
                    match decode_stream_payload(&payload) {
                        Ok(Some(update)) => {
                            if tx.send(Ok(update)).await.is_err() {
                                // Receiver dropped; stop consuming quietly.
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// SSE decoding
// ---------------------------------------------------------------------------

/// Reassembles `data:` event payloads from an arbitrarily-chunked byte
/// stream. Gemini sends one JSON document per `data:` line.
#[derive(Default)]
struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    /// Feeds raw bytes in; returns the complete event payloads they finish.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

/// Decodes one `data:` payload into a chunk, or `None` when the chunk
/// carries neither text nor citations.
fn decode_stream_payload(payload: &str) -> Result<Option<StreamChunk>, BackendError> {
    let parsed: StreamResponse = serde_json::from_str(payload)
        .map_err(|err| BackendError::Malformed(format!("Failed to parse Gemini chunk: {err}")))?;

    let Some(candidate) = parsed.candidates.and_then(|mut c| {
        if c.is_empty() { None } else { Some(c.remove(0)) }
    }) else {
        return Ok(None);
    };

    let text = candidate.content.map(|content| {
        content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>()
    });
    let text = text.filter(|t| !t.is_empty());

    let citations = candidate
        .grounding_metadata
        .and_then(|metadata| metadata.grounding_chunks)
        .filter(|chunks| !chunks.is_empty());

    if text.is_none() && citations.is_none() {
        return Ok(None);
    }
    Ok(Some(StreamChunk { text, citations }))
}

#[derive(Deserialize)]
struct StreamResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    grounding_chunks: Option<Vec<Citation>>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Maps a non-success HTTP response to the two-class error model.
fn map_http_error(status: StatusCode, body: String) -> BackendError {
    let parsed = serde_json::from_str::<ErrorWrapper>(&body).ok();
    let status_text = parsed
        .as_ref()
        .and_then(|w| w.error.status.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|w| w.error.message)
        .unwrap_or_else(|| body.clone());

    let detail = if status_text.is_empty() {
        format!("{}: {}", status.as_u16(), message)
    } else {
        format!("{}: {}", status_text, message)
    };

    if status == StatusCode::TOO_MANY_REQUESTS || status_text == "RESOURCE_EXHAUSTED" {
        BackendError::Capacity(detail)
    } else {
        BackendError::Request(detail)
    }
}
