use axum::{Json, extract::State};
use serde::Serialize;
use tracing::debug;

use super::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub server: &'static str,
    pub ollama: EngineStatus,
    pub models: Vec<String>,
    pub busy: bool,
}

/// Liveness plus engine reachability. Never takes the processing slot.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let (ollama, models) = match state.engine.list_models().await {
        Ok(models) => (EngineStatus::Connected, models),
        Err(err) => {
            debug!(error = %err, "Engine health probe failed");
            (EngineStatus::Disconnected, Vec::new())
        }
    };

    Json(HealthReport {
        server: "ok",
        ollama,
        models,
        busy: state.lock.is_busy(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::{body::Body, http::Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn health_request() -> Request<Body> {
        Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_connected_engine() -> anyhow::Result<()> {
        let engine = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "qwen3:8b"}, {"name": "llama3.2:3b"}]
            })))
            .mount(&engine)
            .await;
        let (app, _state) = test_app(&engine.uri());

        let response = app.oneshot(health_request()).await?;
        let body: Value = serde_json::from_str(&read_body(response).await)?;
        assert_eq!(
            body,
            json!({
                "server": "ok",
                "ollama": "connected",
                "models": ["qwen3:8b", "llama3.2:3b"],
                "busy": false,
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_health_reports_disconnected_engine() -> anyhow::Result<()> {
        let (app, _state) = test_app(&unused_engine_url());

        let response = app.oneshot(health_request()).await?;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body: Value = serde_json::from_str(&read_body(response).await)?;
        assert_eq!(body["server"], "ok");
        assert_eq!(body["ollama"], "disconnected");
        assert_eq!(body["models"], json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_health_reflects_busy_without_acquiring() -> anyhow::Result<()> {
        let (app, state) = test_app(&unused_engine_url());

        let guard = state.lock.try_acquire().unwrap();
        let response = app.clone().oneshot(health_request()).await?;
        let body: Value = serde_json::from_str(&read_body(response).await)?;
        assert_eq!(body["busy"], json!(true));
        assert!(state.lock.is_busy());

        drop(guard);
        let response = app.oneshot(health_request()).await?;
        let body: Value = serde_json::from_str(&read_body(response).await)?;
        assert_eq!(body["busy"], json!(false));
        Ok(())
    }
}
