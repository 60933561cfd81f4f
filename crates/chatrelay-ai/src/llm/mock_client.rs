//! Deterministic mock backend for bridge and server tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_stream::stream;
use tokio::time::{Duration, sleep};

use crate::error::AiError;

use super::{ChatBackend, ChatRequest, ChunkStream, TextChunk};

/// Deterministic step for scripted mock streams.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Emit a chunk carrying text.
    Text(String),
    /// Emit a chunk without text.
    Empty,
    /// Fail the stream at this point.
    Error(String),
}

/// Scripted stream step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn empty() -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Empty,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock backend that replays the same script for every call.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    model: String,
    steps: Vec<MockStep>,
    open_error: Option<String>,
    captured_requests: Arc<Mutex<VecDeque<ChatRequest>>>,
}

impl MockBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            steps,
            ..Self::default()
        }
    }

    /// Fail before any chunk is produced, as a rejected request would.
    pub fn failing_on_open(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Requests received so far, oldest first.
    pub fn captured_requests(&self) -> Vec<ChatRequest> {
        self.captured_requests
            .lock()
            .map(|requests| requests.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn capture(&self, request: ChatRequest) {
        if let Ok(mut requests) = self.captured_requests.lock() {
            requests.push_back(request);
        }
    }
}

impl ChatBackend for MockBackend {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream_chat(&self, request: ChatRequest) -> ChunkStream {
        self.capture(request);

        let steps = self.steps.clone();
        let open_error = self.open_error.clone();

        Box::pin(stream! {
            if let Some(message) = open_error {
                yield Err(AiError::Llm(message));
                return;
            }

            for step in steps {
                if step.delay_ms > 0 {
                    sleep(Duration::from_millis(step.delay_ms)).await;
                }

                match step.kind {
                    MockStepKind::Text(text) => {
                        yield Ok(TextChunk::text(text));
                    }
                    MockStepKind::Empty => {
                        yield Ok(TextChunk::empty());
                    }
                    MockStepKind::Error(message) => {
                        yield Err(AiError::Llm(message));
                    }
                }
            }
        })
    }
}
