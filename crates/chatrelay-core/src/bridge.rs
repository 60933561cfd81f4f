//! Streaming bridge between a conversation and a generation backend

use std::sync::Arc;

use chatrelay_ai::{BackendTurn, ChatBackend, ChatRequest, TurnRole};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::conversation::{Conversation, Role};
use crate::error::{RelayError, Result};
use crate::frame::StreamFrame;

pub const EMPTY_AFTER_FILTERING: &str = "Conversation history is empty after filtering messages.";
pub const LAST_TURN_NOT_USER: &str = "The latest message must come from the user.";

/// Project a conversation onto the backend's request shape.
///
/// The first system utterance becomes the system instruction. Later system
/// utterances are dropped. The resulting turn list must be non-empty and end
/// with a user turn.
pub fn translate(conversation: &Conversation) -> Result<ChatRequest> {
    let mut system_instruction: Option<String> = None;
    let mut turns = Vec::with_capacity(conversation.len());

    for utterance in conversation {
        match utterance.role() {
            Role::System if system_instruction.is_none() => {
                system_instruction = Some(utterance.content().to_string());
            }
            Role::System => {}
            Role::User => turns.push(BackendTurn::user(utterance.content())),
            Role::Assistant => turns.push(BackendTurn::model(utterance.content())),
        }
    }

    let Some(last) = turns.last() else {
        return Err(RelayError::validation(EMPTY_AFTER_FILTERING));
    };
    if last.role != TurnRole::User {
        return Err(RelayError::validation(LAST_TURN_NOT_USER));
    }

    Ok(ChatRequest::new(turns).with_system_instruction(system_instruction))
}

/// Stream a conversation through `backend` as protocol frames.
///
/// Emits a `Delta` per non-empty chunk and then a single `Done` carrying the
/// concatenated reply. Any failure, including translation, ends the stream
/// with a single `Error` frame instead.
pub fn stream(
    backend: Arc<dyn ChatBackend>,
    conversation: Conversation,
) -> impl Stream<Item = StreamFrame> + Send + 'static {
    async_stream::stream! {
        let request = match translate(&conversation) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Conversation rejected during translation");
                yield StreamFrame::error(e.to_string());
                return;
            }
        };

        debug!(
            provider = backend.provider(),
            model = backend.model(),
            turns = request.turns.len(),
            has_system_instruction = request.system_instruction.is_some(),
            "Opening backend stream"
        );

        let mut chunks = backend.stream_chat(request);
        let mut reply = String::new();

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    let Some(text) = chunk.non_empty_text().map(str::to_string) else {
                        continue;
                    };
                    reply.push_str(&text);
                    yield StreamFrame::delta(text);
                }
                Err(e) => {
                    let e = RelayError::from(e);
                    warn!(error = %e, "Backend stream failed");
                    yield StreamFrame::error(e.to_string());
                    return;
                }
            }
        }

        debug!(reply_len = reply.len(), "Backend stream completed");
        yield StreamFrame::done(reply);
    }
}

#[cfg(test)]
mod tests {
    use chatrelay_ai::{MockBackend, MockStep};
    use serde_json::json;

    use super::*;
    use crate::conversation::{Utterance, normalize};

    fn conversation(items: &[(Role, &str)]) -> Conversation {
        let utterances = items
            .iter()
            .map(|(role, content)| Utterance::new(*role, content).unwrap())
            .collect();
        Conversation::new(utterances).unwrap()
    }

    async fn collect(backend: MockBackend, conversation: Conversation) -> Vec<StreamFrame> {
        stream(Arc::new(backend), conversation).collect().await
    }

    #[test]
    fn translate_extracts_system_instruction() {
        let request = translate(&conversation(&[
            (Role::System, "be terse"),
            (Role::User, "hi"),
        ]))
        .unwrap();

        assert_eq!(request.system_instruction.as_deref(), Some("be terse"));
        assert_eq!(request.turns, vec![BackendTurn::user("hi")]);
    }

    #[test]
    fn translate_maps_assistant_to_model_and_drops_extra_system() {
        let request = translate(&conversation(&[
            (Role::User, "hi"),
            (Role::System, "first"),
            (Role::Assistant, "hello"),
            (Role::System, "second"),
            (Role::User, "bye"),
        ]))
        .unwrap();

        assert_eq!(request.system_instruction.as_deref(), Some("first"));
        let roles: Vec<TurnRole> = request.turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Model, TurnRole::User]);
        assert_eq!(request.turns[1].parts, vec!["hello".to_string()]);
    }

    #[test]
    fn translate_rejects_system_only_conversation() {
        let err = translate(&conversation(&[
            (Role::System, "a"),
            (Role::System, "b"),
        ]))
        .unwrap_err();

        assert_eq!(err.to_string(), EMPTY_AFTER_FILTERING);
    }

    #[test]
    fn translate_rejects_trailing_assistant() {
        let err = translate(&conversation(&[
            (Role::User, "hi"),
            (Role::Assistant, "hello"),
        ]))
        .unwrap_err();

        assert!(matches!(err, RelayError::Validation(_)));
        assert_eq!(err.to_string(), LAST_TURN_NOT_USER);
    }

    #[tokio::test]
    async fn streams_deltas_then_done() {
        let backend = MockBackend::from_steps(
            "mock-model",
            vec![MockStep::text("Hel"), MockStep::text("lo")],
        );

        let frames = collect(backend, conversation(&[(Role::User, "hi")])).await;

        assert_eq!(
            frames,
            vec![
                StreamFrame::delta("Hel"),
                StreamFrame::delta("lo"),
                StreamFrame::done("Hello"),
            ]
        );
    }

    #[tokio::test]
    async fn skips_chunks_without_text() {
        let backend = MockBackend::from_steps(
            "mock-model",
            vec![
                MockStep::empty(),
                MockStep::text(""),
                MockStep::text("ok"),
                MockStep::empty(),
            ],
        );

        let frames = collect(backend, conversation(&[(Role::User, "hi")])).await;

        assert_eq!(frames, vec![StreamFrame::delta("ok"), StreamFrame::done("ok")]);
    }

    #[tokio::test]
    async fn empty_backend_stream_still_completes() {
        let backend = MockBackend::new("mock-model");
        let frames = collect(backend, conversation(&[(Role::User, "hi")])).await;
        assert_eq!(frames, vec![StreamFrame::done("")]);
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_single_error() {
        let backend = MockBackend::from_steps(
            "mock-model",
            vec![
                MockStep::text("Hel"),
                MockStep::error("connection reset"),
                MockStep::text("lo"),
            ],
        );

        let frames = collect(backend, conversation(&[(Role::User, "hi")])).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StreamFrame::delta("Hel"));
        assert!(
            matches!(&frames[1], StreamFrame::Error { message } if message.contains("connection reset"))
        );
        assert!(
            !frames
                .iter()
                .any(|frame| matches!(frame, StreamFrame::Done { .. }))
        );
    }

    #[tokio::test]
    async fn open_failure_yields_only_error() {
        let backend = MockBackend::failing_on_open("mock-model", "API key not valid");
        let frames = collect(backend, conversation(&[(Role::User, "hi")])).await;

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_terminal());
        assert!(matches!(&frames[0], StreamFrame::Error { .. }));
    }

    #[tokio::test]
    async fn translation_failure_is_reported_in_stream_without_backend_call() {
        let backend = Arc::new(MockBackend::from_steps(
            "mock-model",
            vec![MockStep::text("never")],
        ));
        let conversation = normalize(&json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]
        }))
        .unwrap();

        let frames: Vec<StreamFrame> = stream(backend.clone(), conversation).collect().await;

        assert_eq!(frames, vec![StreamFrame::error(LAST_TURN_NOT_USER)]);
        assert!(backend.captured_requests().is_empty());
    }

    #[tokio::test]
    async fn backend_receives_translated_request() {
        let backend = Arc::new(MockBackend::from_steps("mock-model", vec![MockStep::text("x")]));
        let conversation = conversation(&[(Role::System, "be terse"), (Role::User, "hi")]);

        let _: Vec<StreamFrame> = stream(backend.clone(), conversation).collect().await;

        let captured = backend.captured_requests();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].system_instruction.as_deref(), Some("be terse"));
        assert_eq!(captured[0].turns, vec![BackendTurn::user("hi")]);
    }
}
