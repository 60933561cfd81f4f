//! LLM module - streaming backend abstraction

mod client;
mod factory;
mod gemini;
mod mock_client;

pub use client::{BackendTurn, ChatBackend, ChatRequest, ChunkStream, TextChunk, TurnRole};
pub use factory::{BackendFactory, GeminiBackendFactory};
pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiClient};
pub use mock_client::{MockBackend, MockStep, MockStepKind};
