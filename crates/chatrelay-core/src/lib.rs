//! ChatRelay Core - conversation normalization and the NDJSON streaming bridge
//!
//! Requests flow through [`normalize`] (pre-stream validation), then
//! [`bridge::stream`], which translates the conversation for the backend and
//! turns backend chunks into [`StreamFrame`]s.

pub mod bridge;
pub mod conversation;
pub mod error;
pub mod frame;
pub mod settings;

pub use bridge::{stream, translate};
pub use conversation::{Conversation, Role, Utterance, normalize};
pub use error::{RelayError, Result};
pub use frame::StreamFrame;
pub use settings::BackendSettings;
