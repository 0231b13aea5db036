//! Streaming interaction layer for LUMINA.
//!
//! Contains the request/response wire types for the generation API, the
//! Gemini SSE client, and the response orchestrator that the front-end
//! consumes one turn at a time.

pub mod backend;
pub mod gemini;
pub mod orchestrator;
pub mod sanitize;

pub use backend::{BackendError, ChunkReceiver, GenerativeBackend, StreamChunk};
pub use gemini::GeminiClient;
pub use orchestrator::{ResponseOrchestrator, StreamUpdate, TurnInput};
