//! HTTP facade over the weather agent.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use weather_core::{Config, WeatherAgentService};

use crate::error::ApiError;

pub const API_VERSION: &str = "1.0.0";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherAgentService>,
    pub default_user_id: String,
    pub default_session_id: String,
}

impl AppState {
    pub fn new(service: Arc<WeatherAgentService>, config: &Config) -> Self {
        Self {
            service,
            default_user_id: config.default_user_id.clone(),
            default_session_id: config.default_session_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub user_id: String,
    /// The session the query actually ran in.
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", message: "Weather Agent API is running" })
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Weather Agent API",
        "version": API_VERSION,
        "endpoints": { "health": "/health", "query": "/query" }
    }))
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    if request.query.trim().is_empty() {
        return Err(ApiError::unprocessable("query must not be empty"));
    }

    let user_id = request.user_id.unwrap_or(state.default_user_id);
    let session_id = request.session_id.unwrap_or(state.default_session_id);

    let outcome = state.service.query(&request.query, &user_id, &session_id).await?;

    Ok(Json(QueryResponse { response: outcome.response, user_id, session_id: outcome.session_id }))
}

/// Build the service, bind `bind` and serve until Ctrl-C.
pub async fn serve(config: &Config, bind: &str) -> anyhow::Result<()> {
    let service = Arc::new(
        WeatherAgentService::from_config(config).context("Failed to initialize agent")?,
    );
    info!(model = service.model(), "Weather Agent initialized successfully");

    let listener =
        TcpListener::bind(bind).await.with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(AppState::new(service.clone(), config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    service.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!(error = %err, "Unable to listen for shutdown signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use weather_core::agent::{
        AgentRunner, Content, Event, EventKind, EventStream, InMemorySessionService,
    };

    /// Answers with a fixed text, or fails when `answer` is `None`.
    struct FakeRunner {
        answer: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl AgentRunner for FakeRunner {
        fn run<'a>(&'a self, _: &'a str, _: &'a str, _: Content) -> EventStream<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let item = match self.answer {
                Some(text) => Ok(Event::new(
                    "inv",
                    "weather_agent_v1",
                    EventKind::FinalResponse(Content::model_text(text)),
                )),
                None => Err(weather_core::Error::Llm("upstream unavailable".into())),
            };
            futures::stream::iter(vec![item]).boxed()
        }
    }

    fn app(answer: Option<&'static str>) -> (Router, Arc<FakeRunner>) {
        let runner = Arc::new(FakeRunner { answer, calls: AtomicUsize::new(0) });
        let service = WeatherAgentService::from_parts(
            "weather_app",
            "test-model",
            Arc::new(InMemorySessionService::new()),
            runner.clone(),
        );
        let state = AppState::new(Arc::new(service), &Config::default());
        (router(state), runner)
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let (app, _) = app(Some("ok"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "healthy", "message": "Weather Agent API is running" })
        );
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let (app, _) = app(Some("ok"));

        let response =
            app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();

        let body = json_body(response).await;
        assert_eq!(body["version"], "1.0.0");
        assert_eq!(body["endpoints"]["query"], "/query");
    }

    #[tokio::test]
    async fn query_uses_defaults_and_returns_answer() {
        let (app, runner) = app(Some("Sunny, 21°C."));

        let response = app.oneshot(post_query(r#"{"query":"Weather in Berlin?"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: QueryResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.response, "Sunny, 21°C.");
        assert_eq!(body.user_id, "default_user");
        assert_eq!(body.session_id, "default_session");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_the_runner() {
        let (app, runner) = app(Some("ok"));

        let response = app.oneshot(post_query(r#"{"query":"   "}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["detail"].is_string());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_query_field_is_unprocessable() {
        let (app, runner) = app(Some("ok"));

        let response = app.oneshot(post_query(r#"{"user_id":"alice"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn runner_failure_is_internal_error() {
        let (app, _) = app(None);

        let response = app
            .oneshot(post_query(r#"{"query":"hi","user_id":"alice","session_id":"s1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["detail"],
            "Error processing query: LLM error: upstream unavailable"
        );
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let (app, runner) = app(Some("ok"));

        let response = app.oneshot(post_query(r#"{"query": "hi""#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["detail"].is_string());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_unprocessable() {
        let (app, runner) = app(Some("ok"));

        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .body(Body::from(r#"{"query":"hi"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["detail"].is_string());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}
