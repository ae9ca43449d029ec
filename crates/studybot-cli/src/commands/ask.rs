use anyhow::Result;
use serde::Serialize;
use studybot_ai::ConversationHistory;

use super::Session;
use crate::chat::{CaptureView, ChatController, ChatTransport, HttpTransport, TerminalView};
use crate::cli::{AskArgs, OutputFormat};
use crate::config::Settings;

#[derive(Debug, Serialize)]
struct AskOutput {
    reply: String,
    html: String,
}

pub async fn run(settings: &Settings, args: &AskArgs, format: OutputFormat) -> Result<()> {
    let session = Session::load(settings)?;
    let transport = HttpTransport::new(&settings.server_url)?;
    let history = ConversationHistory::new(session.system_prompt);

    if format.is_json() {
        let output = ask_captured(transport, history, settings, &args.text()).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let mut controller =
            ChatController::new(transport, TerminalView::one_shot(), history, settings.retry);
        controller.submit(&args.text()).await?;
    }

    Ok(())
}

async fn ask_captured<T: ChatTransport>(
    transport: T,
    history: ConversationHistory,
    settings: &Settings,
    question: &str,
) -> Result<AskOutput> {
    let mut controller =
        ChatController::new(transport, CaptureView::default(), history, settings.retry);
    let reply = controller.submit(question).await?;
    let html = controller
        .into_view()
        .final_frame
        .map(|frame| frame.html)
        .unwrap_or_default();
    Ok(AskOutput { reply, html })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server_url: String) -> Settings {
        Settings {
            server_url,
            profile: None,
            retry: RetryPolicy {
                interval: Duration::from_millis(20),
                max_attempts: 5,
            },
        }
    }

    #[tokio::test]
    async fn test_captured_reply_has_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<think>hmm</think>Finish **Essay** today."),
            )
            .mount(&server)
            .await;

        let settings = settings(server.uri());
        let transport = HttpTransport::new(&settings.server_url).unwrap();
        let output = ask_captured(
            transport,
            ConversationHistory::new("system"),
            &settings,
            "What now?",
        )
        .await
        .unwrap();

        assert_eq!(output.reply, "Finish **Essay** today.");
        assert_eq!(output.html, "<p>Finish <strong>Essay</strong> today.</p>\n");
    }

    #[tokio::test]
    async fn test_busy_gateway_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"busy": true})))
            .expect(5)
            .mount(&server)
            .await;

        let settings = settings(server.uri());
        let transport = HttpTransport::new(&settings.server_url).unwrap();
        let err = ask_captured(transport, ConversationHistory::new("system"), &settings, "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Queue timeout"));
    }
}
