//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::ConversationId;
use market_intel::{classify, IntentResponse, SwapQuote};

use crate::state::AppState;

/// Echoes the conversation id used for a `/chat` turn
pub const CONVERSATION_HEADER: HeaderName = HeaderName::from_static("x-conversation-id");

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    #[serde(default)]
    pub token_in: Option<String>,
    #[serde(default)]
    pub token_out: Option<String>,
    #[serde(default)]
    pub amount_in: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub conversations: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

fn error_response(status: StatusCode, code: &'static str, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code,
        }),
    )
        .into_response()
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn with_conversation_id(mut response: Response, id: &ConversationId) -> Response {
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(CONVERSATION_HEADER, value);
    }
    response
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        conversations: state.store.len(),
    })
}

/// `GET /chat`
///
/// Input errors are rejected before any external call. A trading intent
/// answers without touching a model; everything else runs the pipeline and
/// always yields a 200 reply.
pub async fn chat_handler(
    State(state): State<AppState>,
    Query(params): Query<ChatParams>,
) -> Response {
    let Some(query) = present(params.query) else {
        return (StatusCode::BAD_REQUEST, "Error: Query parameter is required").into_response();
    };
    let Some(api_key) = present(params.api_key) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "MISSING_API_KEY",
            "Groq API Key is required. Please set it in the settings.",
        );
    };

    let conversation_id = ConversationId::or_generate(params.conversation_id.as_deref());

    if let Some(intent) = IntentResponse::from_intent(classify(&query)) {
        tracing::info!(conversation_id = %conversation_id, intent = intent.kind, "Intent fast path");
        return with_conversation_id(Json(intent).into_response(), &conversation_id);
    }

    let provider = match state.providers.create(&api_key) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(error = %e, "Model initialization failed");
            let response = error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_API_KEY",
                format!("Invalid API Key or LLM initialization failed: {e}"),
            );
            return with_conversation_id(response, &conversation_id);
        }
    };

    let reply = state.pipeline.reply(provider, &conversation_id, &query).await;
    with_conversation_id(Json(reply).into_response(), &conversation_id)
}

/// `GET /quote` (placeholder pricing)
pub async fn quote_handler(Query(params): Query<QuoteParams>) -> Response {
    let (Some(token_in), Some(token_out), Some(amount_in)) = (
        present(params.token_in),
        present(params.token_out),
        present(params.amount_in),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "MISSING_PARAMETER",
            "token_in, token_out and amount_in are required",
        );
    };

    match SwapQuote::estimate(&token_in, &token_out, &amount_in) {
        Ok(quote) => Json(quote).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Quote failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "QUOTE_ERROR", e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::testing::{prompt_dir, test_state, MockFactory, MockProvider};

    const GOOD_REPLY: &str = r#"{"html_response":"<div>hi</div>","messages":[{"text":"Hello!","facialExpression":"smile","animation":"Talking_1"}],"suggestions":["What is Sui?"]}"#;

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let conversation = response
            .headers()
            .get(CONVERSATION_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, conversation, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn app_with(dir: &Path, reply: &str) -> (axum::Router, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory::new(MockProvider::new("LEARN", reply)));
        let app = crate::build_router(test_state(dir, factory.clone()));
        (app, factory)
    }

    #[tokio::test]
    async fn test_missing_query_is_400_text() {
        let dir = prompt_dir();
        let (app, factory) = app_with(dir.path(), GOOD_REPLY);

        let (status, _, body) = get(app, "/chat?api_key=k").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: Query parameter is required");
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_401_json() {
        let dir = prompt_dir();
        let (app, _) = app_with(dir.path(), GOOD_REPLY);

        let (status, _, body) = get(app, "/chat?query=hello").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["code"], "MISSING_API_KEY");
    }

    #[tokio::test]
    async fn test_invalid_api_key_is_401_json() {
        let dir = prompt_dir();
        let (app, _) = app_with(dir.path(), GOOD_REPLY);

        let (status, _, body) = get(app, "/chat?query=hello&api_key=bad-key").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("Invalid API Key"));
    }

    #[tokio::test]
    async fn test_swap_intent_skips_models() {
        let dir = prompt_dir();
        let (app, factory) = app_with(dir.path(), GOOD_REPLY);

        let (status, conversation, body) =
            get(app, "/chat?query=swap%2010%20sui%20to%20usdc&api_key=k&conversation_id=c1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conversation.as_deref(), Some("c1"));

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["type"], "swap");
        assert_eq!(json["swap_data"]["amount"], "10");
        assert_eq!(json["swap_data"]["from_token"], "SUI");
        assert_eq!(json["swap_data"]["to_token"], "USDC");
        assert_eq!(json["assets"], serde_json::json!([]));

        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
        assert_eq!(factory.provider.router_calls(), 0);
        assert_eq!(factory.provider.primary_calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_reply_and_generated_id() {
        let dir = prompt_dir();
        let (app, factory) = app_with(dir.path(), GOOD_REPLY);

        let (status, conversation, body) = get(app, "/chat?query=what%20is%20move&api_key=k").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!conversation.unwrap().is_empty());

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["html_response"], "<div>hi</div>");
        assert_eq!(json["messages"][0]["text"], "Hello!");
        assert_eq!(json["messages"][0]["facialExpression"], "smile");
        assert_eq!(json["suggestions"][0], "What is Sui?");
        assert_eq!(factory.provider.primary_calls(), 1);
    }

    #[tokio::test]
    async fn test_recovered_reply_is_200() {
        let dir = prompt_dir();
        let raw = r#"Sure! {"messages":[{"text":"Hi","facialExpression":"default","animation":"Talking_0"}]} hope that helps"#;
        let (app, _) = app_with(dir.path(), raw);

        let (status, _, body) = get(app, "/chat?query=hey&api_key=k").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["messages"][0]["text"], "Hi");
        assert_eq!(json["suggestions"], serde_json::json!([]));
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_safety_payload() {
        let dir = prompt_dir();
        let (app, _) = app_with(dir.path(), "no json at all");

        let (status, _, body) = get(app, "/chat?query=hey&api_key=k").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "JSON Parse Error");
        assert_eq!(json["raw_response"], "no json at all");
        assert_eq!(json["messages"][0]["facialExpression"], "sad");
    }

    #[tokio::test]
    async fn test_health_counts_conversations() {
        let dir = prompt_dir();
        let factory = Arc::new(MockFactory::new(MockProvider::new("CHAT", GOOD_REPLY)));
        let state = test_state(dir.path(), factory);
        let app = crate::build_router(state.clone());

        get(app.clone(), "/chat?query=hi&api_key=k&conversation_id=a").await;
        get(app.clone(), "/chat?query=hi&api_key=k&conversation_id=b").await;
        get(app.clone(), "/chat?query=hi%20again&api_key=k&conversation_id=a").await;

        let (status, _, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["conversations"], 2);
        assert_eq!(state.store.len(), 2);
    }

    #[tokio::test]
    async fn test_quote() {
        let dir = prompt_dir();
        let (app, _) = app_with(dir.path(), GOOD_REPLY);

        let (status, _, body) =
            get(app.clone(), "/quote?token_in=SUI&token_out=USDC&amount_in=100").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["token_in"], "SUI");
        assert_eq!(json["estimated_out"], "95");
        assert_eq!(json["slippage"], "0.5");
        assert_eq!(json["price_impact"], "5.0");

        let (status, _, _) = get(app.clone(), "/quote?token_in=SUI&amount_in=100").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) =
            get(app, "/quote?token_in=SUI&token_out=USDC&amount_in=lots").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Invalid quote"));
    }
}
