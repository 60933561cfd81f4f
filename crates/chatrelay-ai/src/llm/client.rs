//! Backend trait and types

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a turn as the generation backend understands it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One conversation turn in backend shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTurn {
    pub role: TurnRole,
    pub parts: Vec<String>,
}

impl BackendTurn {
    /// Create a user turn with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![text.into()],
        }
    }

    /// Create a model turn with a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![text.into()],
        }
    }
}

/// Streaming generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: Option<String>,
    pub turns: Vec<BackendTurn>,
}

impl ChatRequest {
    /// Create a new request from translated turns
    pub fn new(turns: Vec<BackendTurn>) -> Self {
        Self {
            system_instruction: None,
            turns,
        }
    }

    /// Attach an optional system instruction
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }
}

/// One chunk emitted by a streaming backend.
///
/// Backends may emit chunks without text (metadata-only or finish markers),
/// in which case `text` is `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextChunk {
    pub text: Option<String>,
}

impl TextChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }

    /// Text carried by this chunk, if any and non-empty
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

/// Stream of backend chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<TextChunk>> + Send>>;

/// Streaming generation backend
pub trait ChatBackend: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Open a streaming generation call.
    ///
    /// The request is sent when the stream is first polled; opening failures
    /// surface as the first item of the stream.
    fn stream_chat(&self, request: ChatRequest) -> ChunkStream;
}
