use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{RawQuery, State};
use axum::http::header;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::models::ChatRequest;
use crate::service::chat_service::ChatService;

const FRAME_BUFFER: usize = 32;

/// Splits a raw query string on `&` and `=`. Pieces that do not contain
/// exactly one `=` are skipped; keys and values are percent-decoded
/// separately, `+` meaning space. Undecodable components become empty.
pub fn parse_params(raw_query: &str) -> HashMap<String, String> {
    raw_query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((unescape(key), unescape(value))),
                _ => None,
            }
        })
        .collect()
}

fn unescape(component: &str) -> String {
    if !well_formed_escapes(component) {
        return String::new();
    }
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced).map(|s| s.into_owned()).unwrap_or_default()
}

/// Every `%` must be followed by two hex digits.
fn well_formed_escapes(component: &str) -> bool {
    let bytes = component.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// GET `/chat?msg=..&session=..`: streams the agent's answer as SSE.
///
/// Each fragment is one `data:` frame, with newlines replaced by the
/// configured placeholder; `data: [DONE]` ends the stream.
pub async fn chat_handler(
    State(svc): State<ChatService>,
    RawQuery(query): RawQuery,
) -> Response {
    let mut params = parse_params(query.as_deref().unwrap_or_default());
    let request = ChatRequest {
        session_id: params.remove("session").unwrap_or_default(),
        message: params.remove("msg").unwrap_or_default(),
    };

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(async move {
        let summary = svc.run_turn(request, tx).await;
        debug!(end = ?summary.end, answer_len = summary.answer.len(), "chat task done");
    });

    let events = ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(frame.into_event()));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events),
    )
        .into_response()
}
