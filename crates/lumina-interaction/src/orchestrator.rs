//! Response orchestrator.
//!
//! Owns one turn end to end: assembles the request from history, mode,
//! memory, and identity; drives the backend stream; sanitizes text deltas;
//! accumulates citations; and applies the capacity retry policy. The
//! front-end consumes a plain channel of [`StreamUpdate`]s and never sees
//! transport details.

use crate::backend::{BackendError, Content, GenerateRequest, GenerativeBackend, Part};
use crate::sanitize;
use lumina_core::memory::MemoryItem;
use lumina_core::mode::ChatMode;
use lumina_core::prompt;
use lumina_core::session::{Attachment, Citation, Message, MessageRole};
use lumina_core::user::UserIdentity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Total attempts per turn (one initial try plus three capacity retries).
const MAX_ATTEMPTS: u32 = 4;

/// Update channel depth; the backend stream is paced by consumption.
const CHANNEL_CAPACITY: usize = 32;

/// Shown when every attempt hit a capacity limit.
pub const CAPACITY_NOTICE: &str = "### System Capacity Notification\nThe neural link is currently at peak capacity. Please pause for a moment.";

/// Shown when the turn failed for any non-capacity reason.
pub const INTERRUPTION_NOTICE: &str =
    "### Technical Interruption\nAn unexpected state occurred. Please try again.";

/// Everything one turn needs from the caller.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Active conversation style.
    pub mode: ChatMode,
    /// Prior messages of the session, oldest first.
    pub history: Vec<Message>,
    /// The new user message text.
    pub text: String,
    /// Optional inline attachment for the new message.
    pub attachment: Option<Attachment>,
    /// Remembered facts woven into the system instruction.
    pub memory: Vec<MemoryItem>,
    /// Active user identity, if one has been set up.
    pub user: Option<UserIdentity>,
}

/// One consumable unit of orchestrator output.
///
/// `text` is an incremental delta to append. `citations`, when present, is
/// the complete accumulated list so far; the latest citation-carrying
/// update always supersedes earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub text: Option<String>,
    pub citations: Option<Vec<Citation>>,
}

impl StreamUpdate {
    fn notice(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            citations: None,
        }
    }
}

/// Drives streamed turns against a [`GenerativeBackend`].
#[derive(Clone)]
pub struct ResponseOrchestrator {
    backend: Arc<dyn GenerativeBackend>,
}

impl ResponseOrchestrator {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Starts one turn and returns the update stream for it.
    ///
    /// The stream always terminates: either the backend completes, or a
    /// final notice update is emitted after the error policy runs its
    /// course. Dropping the receiver cancels the turn quietly.
    pub fn stream(&self, input: TurnInput) -> mpsc::Receiver<StreamUpdate> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            drive_turn(backend, input, tx).await;
        });
        rx
    }
}

enum AttemptOutcome {
    Completed,
    Cancelled,
    Failed(BackendError),
}

async fn drive_turn(
    backend: Arc<dyn GenerativeBackend>,
    input: TurnInput,
    tx: mpsc::Sender<StreamUpdate>,
) {
    let request = build_request(&input);
    let mut citations: Vec<Citation> = Vec::new();

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            // 2s, 4s, then 8s.
            tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
        }

        match run_attempt(backend.as_ref(), request.clone(), &tx, &mut citations).await {
            AttemptOutcome::Completed | AttemptOutcome::Cancelled => return,
            AttemptOutcome::Failed(err) if err.is_capacity() => {
                tracing::warn!(attempt, error = %err, "capacity limit hit, backing off");
            }
            AttemptOutcome::Failed(err) => {
                tracing::error!(error = %err, "turn failed");
                let _ = tx.send(StreamUpdate::notice(INTERRUPTION_NOTICE)).await;
                return;
            }
        }
    }

    tracing::error!("capacity retries exhausted");
    let _ = tx.send(StreamUpdate::notice(CAPACITY_NOTICE)).await;
}

/// Runs one backend attempt to completion, forwarding updates.
///
/// `citations` is the turn-level accumulator: like streamed text, citations
/// yielded before a mid-stream failure stand, and a retry appends to them.
async fn run_attempt(
    backend: &dyn GenerativeBackend,
    request: GenerateRequest,
    tx: &mpsc::Sender<StreamUpdate>,
    citations: &mut Vec<Citation>,
) -> AttemptOutcome {
    let mut chunks = match backend.stream_generate(request).await {
        Ok(chunks) => chunks,
        Err(err) => return AttemptOutcome::Failed(err),
    };

    while let Some(item) = chunks.recv().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => return AttemptOutcome::Failed(err),
        };

        let text = chunk
            .text
            .map(|t| sanitize::strip_forbidden(&t))
            .filter(|t| !t.is_empty());
        // Citation entries are pass-through: accumulated verbatim, no dedup.
        let citations = chunk.citations.map(|incoming| {
            citations.extend(incoming);
            citations.clone()
        });

        if text.is_none() && citations.is_none() {
            continue;
        }
        if tx.send(StreamUpdate { text, citations }).await.is_err() {
            return AttemptOutcome::Cancelled;
        }
    }

    AttemptOutcome::Completed
}

/// Maps the session history and the new message onto the wire request.
///
/// History keeps its order; each message becomes one content entry with the
/// attachment part (if any) ahead of the text part. Empty messages, such as
/// a placeholder from an interrupted turn, are skipped.
fn build_request(input: &TurnInput) -> GenerateRequest {
    let system_instruction =
        prompt::build_system_instruction(input.mode, input.user.as_ref(), &input.memory);

    let mut contents: Vec<Content> = input
        .history
        .iter()
        .filter(|msg| !msg.content.is_empty() || msg.attachment.is_some())
        .map(|msg| Content {
            role: wire_role(msg.role).to_string(),
            parts: message_parts(&msg.content, msg.attachment.as_ref()),
        })
        .collect();

    contents.push(Content {
        role: "user".to_string(),
        parts: message_parts(&input.text, input.attachment.as_ref()),
    });

    GenerateRequest::new(system_instruction, contents)
}

fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn message_parts(text: &str, attachment: Option<&Attachment>) -> Vec<Part> {
    let mut parts = Vec::new();
    if let Some(att) = attachment {
        parts.push(Part::inline_data(att.data.clone(), att.mime_type.clone()));
    }
    parts.push(Part::text(text));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChunkReceiver, StreamChunk};
    use async_trait::async_trait;
    use lumina_core::session::CitationSource;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend stub that plays back a script, one entry per call.
    struct ScriptedBackend {
        calls: Mutex<Vec<ScriptedCall>>,
        calls_made: AtomicUsize,
    }

    enum ScriptedCall {
        Reject(BackendError),
        Stream(Vec<Result<StreamChunk, BackendError>>),
    }

    impl ScriptedBackend {
        fn new(calls: Vec<ScriptedCall>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(calls),
                calls_made: AtomicUsize::new(0),
            })
        }

        fn calls_made(&self) -> usize {
            self.calls_made.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn stream_generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<ChunkReceiver, BackendError> {
            self.calls_made.fetch_add(1, Ordering::SeqCst);
            let call = {
                let mut calls = self.calls.lock().unwrap();
                assert!(!calls.is_empty(), "backend called more times than scripted");
                calls.remove(0)
            };
            match call {
                ScriptedCall::Reject(err) => Err(err),
                ScriptedCall::Stream(items) => {
                    let (tx, rx) = mpsc::channel(16);
                    tokio::spawn(async move {
                        for item in items {
                            if tx.send(item).await.is_err() {
                                return;
                            }
                        }
                    });
                    Ok(rx)
                }
            }
        }
    }

    fn text_chunk(text: &str) -> Result<StreamChunk, BackendError> {
        Ok(StreamChunk {
            text: Some(text.to_string()),
            citations: None,
        })
    }

    fn citation(uri: &str) -> Citation {
        Citation {
            web: Some(CitationSource {
                uri: Some(uri.to_string()),
                title: None,
            }),
            maps: None,
        }
    }

    fn input(text: &str) -> TurnInput {
        TurnInput {
            mode: ChatMode::Study,
            history: Vec::new(),
            text: text.to_string(),
            attachment: None,
            memory: Vec::new(),
            user: None,
        }
    }

    async fn collect(mut rx: mpsc::Receiver<StreamUpdate>) -> Vec<StreamUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        updates
    }

    #[tokio::test]
    async fn test_text_deltas_forwarded_in_order() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Stream(vec![
            text_chunk("The "),
            text_chunk("answer "),
            text_chunk("is 42."),
        ])]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let updates = collect(orchestrator.stream(input("question"))).await;

        let texts: Vec<_> = updates.iter().filter_map(|u| u.text.as_deref()).collect();
        assert_eq!(texts, vec!["The ", "answer ", "is 42."]);
        assert_eq!(backend.calls_made(), 1);
    }

    #[tokio::test]
    async fn test_deltas_sanitized_and_empty_skipped() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Stream(vec![
            text_chunk("*bold* claim"),
            text_chunk("{}"),
            Ok(StreamChunk::default()),
            text_chunk("### Done"),
        ])]);
        let orchestrator = ResponseOrchestrator::new(backend);

        let updates = collect(orchestrator.stream(input("q"))).await;

        let texts: Vec<_> = updates.iter().filter_map(|u| u.text.as_deref()).collect();
        assert_eq!(texts, vec!["bold claim", "### Done"]);
    }

    #[tokio::test]
    async fn test_citations_accumulate_across_updates() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Stream(vec![
            Ok(StreamChunk {
                text: Some("a".to_string()),
                citations: Some(vec![citation("https://one")]),
            }),
            Ok(StreamChunk {
                text: None,
                citations: Some(vec![citation("https://two")]),
            }),
        ])]);
        let orchestrator = ResponseOrchestrator::new(backend);

        let updates = collect(orchestrator.stream(input("q"))).await;

        let citation_lists: Vec<_> = updates.iter().filter_map(|u| u.citations.clone()).collect();
        assert_eq!(citation_lists.len(), 2);
        assert_eq!(citation_lists[0], vec![citation("https://one")]);
        // The last citation-carrying update holds everything seen so far.
        assert_eq!(
            citation_lists[1],
            vec![citation("https://one"), citation("https://two")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_failure_retries_with_backoff() {
        let backend = ScriptedBackend::new(vec![
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
            ScriptedCall::Stream(vec![text_chunk("recovered")]),
        ]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let started = tokio::time::Instant::now();
        let updates = collect(orchestrator.stream(input("q"))).await;

        assert_eq!(backend.calls_made(), 3);
        // Backoff slept 2s then 4s of virtual time.
        assert!(started.elapsed() >= Duration::from_secs(6));
        let texts: Vec<_> = updates.iter().filter_map(|u| u.text.as_deref()).collect();
        assert_eq!(texts, vec!["recovered"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_exhaustion_yields_notice() {
        let backend = ScriptedBackend::new(vec![
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
            ScriptedCall::Reject(BackendError::Capacity("429".to_string())),
        ]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let started = tokio::time::Instant::now();
        let updates = collect(orchestrator.stream(input("q"))).await;

        // One initial attempt plus exactly three retries, 2+4+8s of backoff.
        assert_eq!(backend.calls_made(), 4);
        assert!(started.elapsed() >= Duration::from_secs(14));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].text.as_deref(), Some(CAPACITY_NOTICE));
    }

    #[tokio::test]
    async fn test_non_capacity_error_is_not_retried() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Reject(BackendError::Request(
            "bad key".to_string(),
        ))]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let updates = collect(orchestrator.stream(input("q"))).await;

        assert_eq!(backend.calls_made(), 1);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].text.as_deref(), Some(INTERRUPTION_NOTICE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_capacity_error_retries() {
        let backend = ScriptedBackend::new(vec![
            ScriptedCall::Stream(vec![
                text_chunk("partial "),
                Err(BackendError::Capacity("quota".to_string())),
            ]),
            ScriptedCall::Stream(vec![text_chunk("whole answer")]),
        ]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let updates = collect(orchestrator.stream(input("q"))).await;

        assert_eq!(backend.calls_made(), 2);
        let texts: Vec<_> = updates.iter().filter_map(|u| u.text.as_deref()).collect();
        assert_eq!(texts, vec!["partial ", "whole answer"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_citations_survive_mid_stream_retry() {
        let backend = ScriptedBackend::new(vec![
            ScriptedCall::Stream(vec![
                Ok(StreamChunk {
                    text: Some("partial ".to_string()),
                    citations: Some(vec![citation("https://a")]),
                }),
                Err(BackendError::Capacity("quota".to_string())),
            ]),
            ScriptedCall::Stream(vec![Ok(StreamChunk {
                text: Some("rest".to_string()),
                citations: Some(vec![citation("https://b")]),
            })]),
        ]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let updates = collect(orchestrator.stream(input("q"))).await;

        assert_eq!(backend.calls_made(), 2);
        // Citations accumulate across the whole turn, like streamed text:
        // what the failed attempt yielded stands and the retry appends.
        let last = updates
            .iter()
            .filter_map(|u| u.citations.clone())
            .last()
            .unwrap();
        assert_eq!(last, vec![citation("https://a"), citation("https://b")]);
    }

    #[tokio::test]
    async fn test_identical_calls_produce_identical_sequences() {
        let script = || {
            ScriptedCall::Stream(vec![
                text_chunk("alpha "),
                Ok(StreamChunk {
                    text: Some("beta".to_string()),
                    citations: Some(vec![citation("https://src")]),
                }),
            ])
        };
        let backend = ScriptedBackend::new(vec![script(), script()]);
        let orchestrator = ResponseOrchestrator::new(backend);

        let first = collect(orchestrator.stream(input("same"))).await;
        let second = collect(orchestrator.stream(input("same"))).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_request_maps_history_onto_wire() {
        let history = vec![
            Message::user("first question", None),
            Message {
                role: MessageRole::Assistant,
                content: "first answer".to_string(),
                timestamp: 0,
                attachment: None,
                citations: None,
            },
            // Placeholder left by an interrupted turn is dropped.
            Message {
                role: MessageRole::Assistant,
                content: String::new(),
                timestamp: 0,
                attachment: None,
                citations: None,
            },
        ];
        let turn = TurnInput {
            mode: ChatMode::Expert,
            history,
            text: "follow-up".to_string(),
            attachment: Some(Attachment {
                data: "aGk=".to_string(),
                mime_type: "image/png".to_string(),
            }),
            memory: vec![MemoryItem::new("likes graphs", "preferences")],
            user: Some(UserIdentity {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }),
        };

        let request = build_request(&turn);
        let json = serde_json::to_value(&request).unwrap();

        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "first answer");

        // Current turn comes last, attachment part ahead of text.
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(contents[2]["parts"][1]["text"], "follow-up");

        let instruction = json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("Ada"));
        assert!(instruction.contains("likes graphs"));
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels_turn() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Stream(
            (0..100).map(|i| text_chunk(&format!("chunk {i}"))).collect(),
        )]);
        let orchestrator = ResponseOrchestrator::new(backend.clone());

        let mut rx = orchestrator.stream(input("q"));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.text.as_deref(), Some("chunk 0"));
        drop(rx);

        // The driver stops without retrying or panicking.
        tokio::task::yield_now().await;
        assert_eq!(backend.calls_made(), 1);
    }
}
