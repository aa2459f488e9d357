use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use market_call_service::client::conversations::{ConversationClient, ConversationSummary};
use market_call_service::client::voice::{CallScript, OutboundCallClient};
use market_call_service::common::dispatch::{BatchDispatcher, CallResult, CallTarget};
use market_call_service::common::recipients::{load_recipients, normalize_recipients};
use market_call_service::config::AppConfig;
use market_call_service::telemetry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Deserialize, Serialize)]
struct CallRequest {
    prompt: String,
    first_message: String,
    #[serde(default)]
    numbers: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize)]
struct CallsResponse {
    message: String,
    batch_id: Uuid,
    results: Vec<CallResult<Value>>,
}

#[derive(Deserialize, Serialize)]
struct ConvosResponse {
    result: Vec<ConversationSummary>,
    #[serde(rename = "combinedSummaries")]
    combined_summaries: Vec<String>,
}

#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    message: String,
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn handler_error(status: StatusCode, message: &str, error: impl ToString) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
            error: error.to_string(),
        }),
    )
}

#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    dispatcher: BatchDispatcher,
    caller: OutboundCallClient,
    conversations: Option<ConversationClient>,
}

impl AppState {
    fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let caller = OutboundCallClient::new(config.outbound_call_url()?);
        let conversations = config
            .conversations
            .as_ref()
            .map(|c| ConversationClient::new(&c.api_base, &c.api_key, &c.agent_id));

        Ok(Self {
            dispatcher: BatchDispatcher::new(config.call_delay),
            caller,
            conversations,
            config: Arc::new(config),
        })
    }

    fn startup_summary(&self) -> String {
        format!(
            "calls via {}, {:?} between calls",
            self.caller.endpoint(),
            self.dispatcher.delay()
        )
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Market call relay is running" }))
        .route("/api/calls", post(handle_calls))
        .route("/api/convos", get(handle_convos))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Places one call per recipient, paced, and reports every outcome.
async fn handle_calls(
    State(state): State<AppState>,
    Json(request): Json<CallRequest>,
) -> Result<Json<CallsResponse>, HandlerError> {
    let numbers = match request.numbers {
        Some(numbers) => normalize_recipients(numbers),
        None => load_recipients(&state.config.numbers_path).map_err(|e| {
            error!("Failed to load recipients: {}", e);
            handler_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", e)
        })?,
    };
    if numbers.is_empty() {
        return Err(handler_error(
            StatusCode::BAD_REQUEST,
            "No recipients",
            "recipient list is empty",
        ));
    }

    let script = CallScript::new(&request.prompt, &request.first_message);
    let targets: Vec<CallTarget<CallScript>> = numbers
        .into_iter()
        .map(|number| CallTarget::new(number, script.clone()))
        .collect();

    info!(count = targets.len(), "Starting outbound calls");
    let caller = &state.caller;
    let report = state
        .dispatcher
        .dispatch(&targets, move |target| {
            let target = target.clone();
            async move { caller.initiate(&target).await }
        })
        .await;

    Ok(Json(CallsResponse {
        message: "Calls completed".to_string(),
        batch_id: report.batch_id,
        results: report.results,
    }))
}

async fn handle_convos(
    State(state): State<AppState>,
) -> Result<Json<ConvosResponse>, HandlerError> {
    let (client, settings) = match (&state.conversations, &state.config.conversations) {
        (Some(client), Some(settings)) => (client, settings),
        _ => {
            return Err(handler_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Conversation retrieval is not configured",
                "set ELEVENLABS_API_KEY and ELEVENLABS_AGENT_ID",
            ))
        }
    };

    let result = client.recent_summaries(settings.page_size).await.map_err(|e| {
        error!("Failed to fetch conversations: {}", e);
        handler_error(StatusCode::BAD_GATEWAY, "Failed to fetch conversations", e)
    })?;
    let combined_summaries = result.iter().map(|c| c.summary.clone()).collect();

    Ok(Json(ConvosResponse {
        result,
        combined_summaries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use market_call_service::config::ConversationSettings;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(outbound_call_url: String) -> TestResult<AppConfig> {
        let mut config = AppConfig::from_lookup(|_| None)?;
        config.outbound_call_url = Some(outbound_call_url);
        config.call_delay = Duration::ZERO;
        Ok(config)
    }

    type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

    async fn post_calls(app: Router, body: Value) -> TestResult<(StatusCode, Value)> {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/calls")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .map_err(|e| format!("Failed to build request: {}", e))?,
            )
            .await
            .map_err(|e| format!("Failed to send request: {}", e))?;

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    async fn get_convos(app: Router) -> TestResult<(StatusCode, Value)> {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/convos")
                    .body(Body::empty())
                    .map_err(|e| format!("Failed to build request: {}", e))?,
            )
            .await
            .map_err(|e| format!("Failed to send request: {}", e))?;

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    #[tokio::test]
    async fn test_calls_report_partial_failure_in_order() -> TestResult {
        let voice = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/outbound-call"))
            .and(body_partial_json(json!({ "number": "+15550002" })))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid number"))
            .expect(1)
            .mount(&voice)
            .await;
        Mock::given(method("POST"))
            .and(path("/outbound-call"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(2)
            .mount(&voice)
            .await;

        let config = test_config(format!("{}/outbound-call", voice.uri()))?;
        let app = create_router(AppState::from_config(config)?);

        let (status, body) = post_calls(
            app,
            json!({
                "prompt": "Ask about the election.",
                "first_message": "Hi, do you have a minute?",
                "numbers": ["+15550001", "+15550002", "+15550003"]
            }),
        )
        .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Calls completed");
        let results = body["results"].as_array().expect("results array");
        let summary: Vec<(&str, &str)> = results
            .iter()
            .map(|r| {
                (
                    r["recipient"].as_str().unwrap_or_default(),
                    r["status"].as_str().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![("+15550001", "success"), ("+15550002", "error"), ("+15550003", "success")]
        );
        assert_eq!(results[1]["retryable"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_calls_use_recipient_file() -> TestResult {
        let voice = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/outbound-call"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(2)
            .mount(&voice)
            .await;

        let mut numbers = tempfile::NamedTempFile::new()?;
        writeln!(numbers, "+15550001\n+15550002\n")?;

        let mut config = test_config(format!("{}/outbound-call", voice.uri()))?;
        config.numbers_path = numbers.path().to_path_buf();
        let app = create_router(AppState::from_config(config)?);

        let (status, body) = post_calls(app, json!({ "prompt": "p", "first_message": "m" })).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_calls_missing_recipient_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        config.numbers_path = dir.path().join("numbers.txt");
        let app = create_router(AppState::from_config(config)?);

        let (status, body) = post_calls(app, json!({ "prompt": "p", "first_message": "m" })).await?;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        Ok(())
    }

    #[tokio::test]
    async fn test_calls_empty_recipients() -> TestResult {
        let config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        let app = create_router(AppState::from_config(config)?);

        let body = json!({ "prompt": "p", "first_message": "m", "numbers": [" ", ""] });
        let (status, _) = post_calls(app, body).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_calls_normalize_supplied_numbers() -> TestResult {
        let voice = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/outbound-call"))
            .and(body_partial_json(json!({ "number": "+15550001" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&voice)
            .await;

        let config = test_config(format!("{}/outbound-call", voice.uri()))?;
        let app = create_router(AppState::from_config(config)?);

        let body = json!({ "prompt": "p", "first_message": "m", "numbers": ["", " +15550001 "] });
        let (status, body) = post_calls(app, body).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["results"][0]["recipient"], "+15550001");
        Ok(())
    }

    #[test]
    fn test_startup_summary_names_call_endpoint_and_pacing() -> TestResult {
        let mut config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        config.call_delay = Duration::from_secs(40);
        let state = AppState::from_config(config)?;

        assert_eq!(
            state.startup_summary(),
            "calls via http://127.0.0.1:9/outbound-call, 40s between calls"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_convos_not_configured() -> TestResult {
        let config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        let app = create_router(AppState::from_config(config)?);

        let (status, _) = get_convos(app).await?;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test]
    async fn test_convos_combines_summaries() -> TestResult {
        let agent = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "conversations": [{ "conversation_id": "c1" }]
            })))
            .mount(&agent)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/conversations/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "conversation_id": "c1",
                "analysis": { "transcript_summary": "Leans yes." }
            })))
            .mount(&agent)
            .await;

        let mut config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        config.conversations = Some(ConversationSettings {
            api_base: agent.uri(),
            api_key: "xi".to_string(),
            agent_id: "agent-1".to_string(),
            page_size: 3,
        });
        let app = create_router(AppState::from_config(config)?);

        let (status, body) = get_convos(app).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"][0]["conversation_id"], "c1");
        assert_eq!(body["combinedSummaries"], json!(["Leans yes."]));
        Ok(())
    }

    #[tokio::test]
    async fn test_convos_upstream_failure() -> TestResult {
        let agent = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&agent)
            .await;

        let mut config = test_config("http://127.0.0.1:9/outbound-call".to_string())?;
        config.conversations = Some(ConversationSettings {
            api_base: agent.uri(),
            api_key: "xi".to_string(),
            agent_id: "agent-1".to_string(),
            page_size: 3,
        });
        let app = create_router(AppState::from_config(config)?);

        let (status, _) = get_convos(app).await?;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_logging();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr;
    let state = AppState::from_config(config)?;

    info!("Relay service listening on {} ({})", addr, state.startup_summary());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
