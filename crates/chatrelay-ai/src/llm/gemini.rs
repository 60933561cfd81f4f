//! Google Gemini streaming provider

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, response_to_error};
use crate::llm::client::{
    BackendTurn, ChatBackend, ChatRequest, ChunkStream, TextChunk, TurnRole,
};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the candidate was withheld rather than completed.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "OTHER",
];

/// Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

impl GenerateContentRequest {
    fn from_request(request: ChatRequest) -> Self {
        let contents = request.turns.into_iter().map(GeminiContent::from).collect();
        let system_instruction = request.system_instruction.map(|text| GeminiSystemInstruction {
            parts: vec![GeminiPart { text }],
        });

        Self {
            contents,
            system_instruction,
        }
    }
}

impl From<BackendTurn> for GeminiContent {
    fn from(turn: BackendTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
        .to_string();

        Self {
            role,
            parts: turn
                .parts
                .into_iter()
                .map(|text| GeminiPart { text })
                .collect(),
        }
    }
}

// Streaming response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Parse one SSE `data:` payload into a chunk.
fn parse_event(data: &str) -> Result<TextChunk> {
    let event: GenerateContentResponse = serde_json::from_str(data)?;

    if let Some(error) = event.error {
        return Err(AiError::Llm(format!("Gemini stream error: {}", error.message)));
    }

    if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AiError::Blocked(format!("prompt blocked ({reason})")));
    }

    let Some(candidate) = event.candidates.into_iter().next() else {
        return Ok(TextChunk::empty());
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref()
            && BLOCKING_FINISH_REASONS.contains(&reason)
        {
            return Err(AiError::Blocked(format!(
                "candidate finished with reason {reason}"
            )));
        }
        return Ok(TextChunk::empty());
    }

    Ok(TextChunk::text(text))
}

/// Pull every complete SSE event off the front of `buffer`.
///
/// Events are decoded only once whole, so a multi-byte character split
/// across network reads is reassembled before UTF-8 validation.
fn drain_events(buffer: &mut Vec<u8>) -> Result<Vec<String>> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.windows(2).position(|window| window == b"\n\n") {
        let event: Vec<u8> = buffer.drain(..pos + 2).collect();
        let event_str = std::str::from_utf8(&event[..pos])?;
        payloads.extend(event_payload(event_str));
    }

    Ok(payloads)
}

/// Payload of a final event that was not terminated by a blank line.
fn trailing_payload(buffer: &[u8]) -> Result<Option<String>> {
    Ok(event_payload(std::str::from_utf8(buffer)?))
}

/// Join the `data:` lines of one SSE event.
fn event_payload(event_str: &str) -> Option<String> {
    let data: Vec<&str> = event_str
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();

    let joined = data.join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

impl ChatBackend for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream_chat(&self, request: ChatRequest) -> ChunkStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = self.stream_url();

        Box::pin(async_stream::stream! {
            let body = GenerateContentRequest::from_request(request);

            let response = match client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::Http(e));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(response_to_error(response, "Gemini").await);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::Http(e));
                        return;
                    }
                };

                buffer.extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

                let events = match drain_events(&mut buffer) {
                    Ok(events) => events,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                for data in events {
                    match parse_event(&data) {
                        Ok(chunk) => {
                            yield Ok(chunk);
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            // Trailing event without a terminating blank line
            let trailing = trailing_payload(&buffer)
                .and_then(|data| data.map(|data| parse_event(&data)).transpose());
            match trailing {
                Ok(Some(chunk)) => {
                    yield Ok(chunk);
                }
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            debug!("Gemini stream finished");
        })
    }
}
