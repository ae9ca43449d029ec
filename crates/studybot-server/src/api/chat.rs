//! `POST /api/chat` - relay a conversation to the generation engine
//!
//! Only one generation may run at a time. A request that finds the slot taken
//! gets `409 {busy: true}` straight away and never reaches the engine.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use studybot_ai::{ChunkStream, Message};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use super::{error::ApiError, state::AppState};
use crate::gateway::ProcessingGuard;

const BUSY_MESSAGE: &str = "StudyBot is currently helping another user. Please wait a moment...";
/// Deltas buffered between the engine pump and a slow client
const STREAM_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

struct Busy;

impl IntoResponse for Busy {
    fn into_response(self) -> Response {
        (
            StatusCode::CONFLICT,
            Json(json!({ "busy": true, "message": BUSY_MESSAGE })),
        )
            .into_response()
    }
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Some(guard) = state.lock.try_acquire() else {
        info!("Rejecting chat request, a generation is already in flight");
        return Ok(Busy.into_response());
    };

    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejecting malformed chat request");
        ApiError::bad_request("Invalid request: messages array required")
    })?;

    info!(
        messages = request.messages.len(),
        stream = request.stream,
        "Processing chat request"
    );

    if request.stream {
        stream_chat(state, guard, request.messages).await
    } else {
        complete_chat(state, guard, request.messages).await
    }
}

async fn complete_chat(
    state: AppState,
    _guard: ProcessingGuard,
    messages: Vec<Message>,
) -> Result<Response, ApiError> {
    let completion = state.engine.chat(&messages).await?;
    info!(
        response_chars = completion.content.chars().count(),
        "Chat request done"
    );
    Ok(Json(completion).into_response())
}

async fn stream_chat(
    state: AppState,
    guard: ProcessingGuard,
    messages: Vec<Message>,
) -> Result<Response, ApiError> {
    let chunks = state.engine.chat_stream(&messages).await?;

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(pump_chunks(chunks, tx, guard));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|err| ApiError::internal(format!("Failed to build response: {}", err)))
}

/// Forward decoded deltas to the client until the engine is done.
///
/// The guard lives here, not in the handler: the slot stays taken for as long
/// as the engine is generating. A client that disconnects does not stop the
/// generation; the remaining output is drained and discarded. The guard is
/// dropped before the body is closed so the client never sees end-of-stream
/// while the slot is still held.
async fn pump_chunks(
    mut chunks: ChunkStream,
    tx: mpsc::Sender<Result<Bytes, std::io::Error>>,
    guard: ProcessingGuard,
) {
    let mut forwarded_chars = 0usize;
    let mut client_connected = true;
    let mut failure = None;

    while let Some(next) = chunks.next().await {
        match next {
            Ok(chunk) => {
                if chunk.is_final {
                    info!(
                        model = chunk.model.as_deref().unwrap_or("unknown"),
                        total_duration_ns = chunk.total_duration.unwrap_or_default(),
                        "Generation finished"
                    );
                }
                if chunk.content_delta.is_empty() || !client_connected {
                    continue;
                }

                forwarded_chars += chunk.content_delta.chars().count();
                if tx.send(Ok(Bytes::from(chunk.content_delta))).await.is_err() {
                    warn!("Client disconnected, draining generation to completion");
                    client_connected = false;
                }
            }
            Err(err) => {
                warn!(error = %err, "Engine stream failed");
                failure = Some(std::io::Error::other(err.to_string()));
                break;
            }
        }
    }

    info!(response_chars = forwarded_chars, "Chat request done");
    drop(guard);

    if let Some(err) = failure
        && client_connected
    {
        let _ = tx.send(Err(err)).await;
    }
}
