//! ChatRelay AI - streaming generative-language backends
//!
//! This crate provides:
//! - The `ChatBackend` capability the relay streams through
//! - A Google Gemini client speaking `streamGenerateContent` over SSE
//! - A scripted mock backend for tests

pub mod error;
mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use llm::{
    BackendFactory, BackendTurn, ChatBackend, ChatRequest, ChunkStream, GeminiBackendFactory,
    GeminiClient, MockBackend, MockStep, TextChunk, TurnRole,
};
