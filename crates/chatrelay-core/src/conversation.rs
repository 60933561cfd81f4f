//! Conversation model and payload normalization

use serde::Serialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

pub const NO_VALID_MESSAGE: &str = "No valid message provided.";

/// Role of a caller-supplied utterance
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// One role-tagged piece of conversation text. Content is trimmed and never blank.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Utterance {
    role: Role,
    content: String,
}

impl Utterance {
    /// Build an utterance, trimming `content`. Returns `None` for blank text.
    pub fn new(role: Role, content: &str) -> Option<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(Self {
            role,
            content: trimmed.to_string(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    fn from_value(item: &Value) -> Option<Self> {
        let item = item.as_object()?;
        let role = item.get("role")?.as_str().and_then(Role::parse)?;
        let content = item.get("content")?.as_str()?;
        Self::new(role, content)
    }
}

/// Validated, ordered list of utterances for one request. Never empty.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Conversation(Vec<Utterance>);

impl Conversation {
    /// Wrap utterances, rejecting an empty list.
    pub fn new(utterances: Vec<Utterance>) -> Option<Self> {
        if utterances.is_empty() {
            None
        } else {
            Some(Self(utterances))
        }
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Utterance;
    type IntoIter = std::slice::Iter<'a, Utterance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Canonicalize a raw request payload into a [`Conversation`].
///
/// Well-formed entries of `messages` win; malformed entries are skipped
/// without error. When none survive, a non-blank `message` string becomes a
/// single user utterance.
pub fn normalize(payload: &Value) -> Result<Conversation> {
    if let Some(messages) = payload.get("messages").and_then(Value::as_array) {
        let cleaned: Vec<Utterance> = messages.iter().filter_map(Utterance::from_value).collect();
        if let Some(conversation) = Conversation::new(cleaned) {
            return Ok(conversation);
        }
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .and_then(|message| Utterance::new(Role::User, message))
        .and_then(|utterance| Conversation::new(vec![utterance]))
        .ok_or_else(|| RelayError::validation(NO_VALID_MESSAGE))
}
