//! Server-Sent Events support

use crate::chat::ChatStreamEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Convert a chat event receiver into an SSE response.
///
/// Deltas carry the conversation id with every chunk; the stream always
/// ends with an explicit done marker, even after an error.
pub fn chat_sse(
    conversation_id: String,
    rx: tokio::sync::mpsc::Receiver<ChatStreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(rx)
        .map(move |event| Ok(chat_event_to_axum(&conversation_id, event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn chat_event_to_axum(conversation_id: &str, event: ChatStreamEvent) -> Event {
    let data = match event {
        ChatStreamEvent::Delta(content) => json!({
            "content": content,
            "conversation_id": conversation_id,
        }),
        ChatStreamEvent::Error(message) => json!({
            "type": "error",
            "message": message,
        }),
        ChatStreamEvent::Done => json!({
            "type": "done",
        }),
    };

    Event::default().data(data.to_string())
}
