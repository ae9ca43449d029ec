use std::pin::Pin;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Serialize;
use studybot_ai::{Message, build_http_client};
use tracing::{debug, warn};

use super::error::ChatError;

/// Reply text as it arrives from the gateway
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

pub enum TransportReply {
    /// The gateway is serving someone else (409)
    Busy,
    Stream(DeltaStream),
}

impl std::fmt::Debug for TransportReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportReply::Busy => f.write_str("Busy"),
            TransportReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Delivers one chat request to the gateway.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, messages: &[Message]) -> Result<TransportReply, ChatError>;
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        // No overall timeout: a reply may stream for minutes.
        let client = build_http_client(server_url, None)?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, messages: &[Message]) -> Result<TransportReply, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatBody { messages })
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "Chat request failed");
                if err.is_connect() {
                    ChatError::EngineOffline
                } else {
                    ChatError::Stream(err.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            debug!("Gateway busy");
            return Ok(TransportReply::Busy);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Server {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        let mut bytes = response.bytes_stream();
        let deltas = try_stream! {
            let mut carry = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|err| ChatError::Stream(err.to_string()))?;
                let text = decode_utf8(&mut carry, &chunk);
                if !text.is_empty() {
                    yield text;
                }
            }
            if !carry.is_empty() {
                yield String::from_utf8_lossy(&carry).into_owned();
            }
        };

        Ok(TransportReply::Stream(Box::pin(deltas)))
    }
}

/// Prefer the gateway's `{error}` field, then the raw body, then the status.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(error) = value.get("error").and_then(|e| e.as_str())
    {
        return error.to_string();
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Server Error: {}", status.as_u16())
    } else {
        body.to_string()
    }
}

/// Decode as much of `carry + bytes` as forms complete UTF-8, keeping an
/// incomplete trailing sequence for the next chunk.
fn decode_utf8(carry: &mut Vec<u8>, bytes: &[u8]) -> String {
    carry.extend_from_slice(bytes);

    let valid = match std::str::from_utf8(carry) {
        Ok(_) => carry.len(),
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(_) => {
            let text = String::from_utf8_lossy(carry).into_owned();
            carry.clear();
            return text;
        }
    };

    let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
    carry.drain(..valid);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(reply: TransportReply) -> Result<String, ChatError> {
        let TransportReply::Stream(mut stream) = reply else {
            panic!("expected a stream");
        };
        let mut out = String::new();
        while let Some(delta) = stream.next().await {
            out.push_str(&delta?);
        }
        Ok(out)
    }

    #[test]
    fn test_decode_utf8_keeps_split_sequence() {
        let bytes = "สวัสดี".as_bytes();
        let mut carry = Vec::new();

        let first = decode_utf8(&mut carry, &bytes[..4]);
        assert_eq!(first, "ส");
        assert_eq!(carry.len(), 1);

        let rest = decode_utf8(&mut carry, &bytes[4..]);
        assert_eq!(format!("{first}{rest}"), "สวัสดี");
        assert!(carry.is_empty());
    }

    #[tokio::test]
    async fn test_streams_body_and_sends_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hi **there**"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri()).unwrap();
        let reply = transport.send(&[Message::user("hello")]).await.unwrap();
        assert_eq!(collect(reply).await.unwrap(), "Hi **there**");
    }

    #[tokio::test]
    async fn test_conflict_is_busy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "busy": true,
                "message": "busy"
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri()).unwrap();
        let reply = transport.send(&[Message::user("hello")]).await.unwrap();
        assert!(matches!(reply, TransportReply::Busy));
    }

    #[tokio::test]
    async fn test_server_error_uses_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(json!({"error": "Generation engine is not running"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&server.uri()).unwrap();
        let err = transport.send(&[Message::user("hello")]).await.unwrap_err();
        assert_eq!(
            err,
            ChatError::Server {
                status: 503,
                message: "Generation engine is not running".to_string(),
            }
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message("", StatusCode::BAD_GATEWAY),
            "Server Error: 502"
        );
        assert_eq!(
            error_message("plain failure", StatusCode::BAD_GATEWAY),
            "plain failure"
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_engine_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(&format!("http://127.0.0.1:{port}")).unwrap();
        let err = transport.send(&[Message::user("hello")]).await.unwrap_err();
        assert_eq!(err, ChatError::EngineOffline);
    }
}
