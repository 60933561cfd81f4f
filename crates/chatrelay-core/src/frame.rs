//! NDJSON stream frames

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One line of the streamed response body.
///
/// `Done` and `Error` are terminal: a stream carries exactly one of them, last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta { text: String },
    Done { full_text: String },
    Error { message: String },
}

impl StreamFrame {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta { text: text.into() }
    }

    pub fn done(full_text: impl Into<String>) -> Self {
        Self::Done {
            full_text: full_text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }

    /// Serialize as a single newline-terminated JSON line.
    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl Serialize for StreamFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Delta { text } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("delta", text)?;
                map.end()
            }
            Self::Done { full_text } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("reply", full_text)?;
                map.serialize_entry("done", &true)?;
                map.end()
            }
            Self::Error { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", message)?;
                map.serialize_entry("done", &true)?;
                map.end()
            }
        }
    }
}
