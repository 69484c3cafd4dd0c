//! HTTP API gateway for chatforge.
//!
//! Endpoints:
//!
//! - `GET  /api/health`                      — liveness, no auth
//! - `POST /api/chat`                        — run one orchestrated turn
//! - `GET  /api/conversations/{principal}`   — recent turns, or `?q=` search
//! - `GET  /api/tools`                       — list registered tools
//!
//! All `/api` routes except health require `Authorization: Bearer <token>`.
//! Built on Axum; the authenticated principal travels as a request
//! extension from the auth middleware into every handler.

pub mod ingest;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chatforge_core::auth::Authenticator;
use chatforge_core::error::EngineError;
use chatforge_core::store::ConversationStore;
use chatforge_core::turn::{PrincipalId, Turn};
use chatforge_engine::{OrchestrationEngine, TurnRequest};
use chatforge_tools::ToolRegistry;

use crate::ingest::{AttachmentUpload, IngestError, ingest_attachments};

/// Shared application state for the gateway. Everything the handlers need
/// is injected here; the gateway owns no orchestration logic of its own.
pub struct GatewayState {
    pub engine: Arc<OrchestrationEngine>,
    pub registry: Arc<ToolRegistry>,
    pub store: Arc<dyn ConversationStore>,
    pub authenticator: Arc<dyn Authenticator>,

    /// Per-attachment size cap, in bytes.
    pub max_attachment_bytes: u64,

    /// Default result cap for `?q=` conversation search.
    pub search_limit: usize,

    /// Default window size for conversation listing.
    pub history_limit: usize,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// `body_limit_bytes` caps the whole request body; oversized individual
/// attachments inside an accepted body are rejected separately with 413.
pub fn build_router(state: SharedState, body_limit_bytes: usize) -> Router {
    let authed = Router::new()
        .route("/chat", post(chat_handler))
        .route("/conversations/{principal}", get(conversations_handler))
        .route("/tools", get(list_tools_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state.clone());

    let cors = CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    Router::new()
        .route("/api/health", get(health_handler))
        .nest("/api", authed)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn serve(
    state: SharedState,
    host: &str,
    port: u16,
    body_limit_bytes: usize,
) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let app = build_router(state, body_limit_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

// ── Errors ────────────────────────────────────────────────────────────────

/// How gateway failures surface over HTTP. One variant per status the API
/// can return; handlers never leak raw engine errors.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    PayloadTooLarge(String),
    /// The caller abandoned the request mid-turn.
    ClientClosedRequest,
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ApiError::ClientClosedRequest => (
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "client closed request".into(),
            ),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => ApiError::ClientClosedRequest,
            EngineError::ModelUnavailable(detail) => {
                ApiError::Internal(format!("model backend unavailable: {detail}"))
            }
            EngineError::Storage(detail) => ApiError::Internal(detail.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            IngestError::InvalidEncoding { .. } | IngestError::Empty { .. } => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

// ── Auth middleware ───────────────────────────────────────────────────────

/// Resolves `Authorization: Bearer <token>` to a `PrincipalId` and stores
/// it as a request extension. Requests without a valid credential never
/// reach a handler.
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: axum::extract::Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!("Request rejected: missing bearer token");
            ApiError::Unauthorized("missing bearer token".into())
        })?;

    let principal = state
        .authenticator
        .authenticate(token)
        .await
        .map_err(|err| ApiError::Unauthorized(err.to_string()))?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,

    #[serde(default)]
    attachments: Vec<AttachmentUpload>,
}

#[derive(Serialize)]
struct ChatResponse {
    content: String,
    tools_used: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,

    truncated: bool,
}

#[derive(Deserialize)]
struct ConversationsQuery {
    #[serde(default)]
    limit: Option<usize>,

    /// Substring search over stored turns. Omit for the recent window.
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
struct ConversationsResponse {
    principal: String,
    turns: Vec<TurnDto>,
    count: usize,
}

#[derive(Serialize)]
struct TurnDto {
    id: u64,
    message: String,
    reply: String,
    tool_calls: usize,
    truncated: bool,
    created_at: String,
}

impl From<&Turn> for TurnDto {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id.0,
            message: turn.input.message.clone(),
            reply: turn.output.content.clone(),
            tool_calls: turn.output.tool_invocations.len(),
            truncated: turn.output.truncated,
            created_at: turn.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDto>,
    count: usize,
}

#[derive(Serialize)]
struct ToolDto {
    server: String,
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    Extension(principal): Extension<PrincipalId>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let attachments = ingest_attachments(payload.attachments, state.max_attachment_bytes)?;

    info!(
        principal = %principal,
        attachments = attachments.len(),
        "Chat request"
    );

    // The handler future is dropped if the client disconnects, which
    // aborts the in-flight turn before anything is appended.
    let reply = state
        .engine
        .run_turn(
            TurnRequest {
                principal,
                message: payload.message,
                attachments,
            },
            CancellationToken::new(),
        )
        .await?;

    Ok(Json(ChatResponse {
        content: reply.content,
        tools_used: reply.tools_used.iter().map(|t| t.to_string()).collect(),
        reasoning: reply.reasoning,
        truncated: reply.truncated,
    }))
}

async fn conversations_handler(
    State(state): State<SharedState>,
    Extension(caller): Extension<PrincipalId>,
    Path(principal): Path<String>,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    // Conversation logs are strictly per-principal.
    if caller.as_str() != principal {
        warn!(caller = %caller, requested = %principal, "Cross-principal history access denied");
        return Err(ApiError::Forbidden(
            "conversation history belongs to another principal".into(),
        ));
    }

    let turns = match query.q.as_deref() {
        Some(needle) if !needle.is_empty() => {
            let limit = query.limit.unwrap_or(state.search_limit);
            state
                .store
                .search(&caller, needle, limit)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?
        }
        _ => {
            let limit = query.limit.unwrap_or(state.history_limit);
            state
                .store
                .recent(&caller, limit)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?
        }
    };

    let dtos: Vec<TurnDto> = turns.iter().map(TurnDto::from).collect();
    Ok(Json(ConversationsResponse {
        principal,
        count: dtos.len(),
        turns: dtos,
    }))
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let specs = state.registry.snapshot().specs();
    let tools: Vec<ToolDto> = specs
        .into_iter()
        .map(|s| ToolDto {
            server: s.server,
            name: s.name,
            description: s.description,
            input_schema: s.input_schema,
        })
        .collect();
    let count = tools.len();
    Json(ToolListResponse { tools, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use chatforge_auth::StaticTokenAuthenticator;
    use chatforge_core::event::EventBus;
    use chatforge_core::model::ModelDecision;
    use chatforge_engine::EngineConfig;
    use chatforge_memory::InMemoryConversationStore;
    use chatforge_providers::ScriptedBackend;

    fn test_router(decisions: Vec<ModelDecision>) -> Router {
        let registry = Arc::new(ToolRegistry::new());
        for provider in chatforge_tools::default_providers() {
            registry.register(provider).unwrap();
        }
        let store = Arc::new(InMemoryConversationStore::new());
        let model = Arc::new(ScriptedBackend::new(decisions).with_fallback(
            ModelDecision::Answer {
                content: "fallback answer".into(),
                reasoning: None,
            },
        ));
        let engine = Arc::new(OrchestrationEngine::new(
            model,
            registry.clone(),
            store.clone(),
            Arc::new(EventBus::default()),
            EngineConfig::default(),
        ));
        let state = Arc::new(GatewayState {
            engine,
            registry,
            store,
            authenticator: Arc::new(StaticTokenAuthenticator::new([
                ("tok-alice", "alice"),
                ("tok-bob", "bob"),
            ])),
            max_attachment_bytes: 1024,
            search_limit: 10,
            history_limit: 50,
        });
        build_router(state, 1024 * 1024)
    }

    fn chat_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_without_token_is_unauthorized() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(chat_request(None, serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_with_bad_token_is_unauthorized() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(chat_request(Some("tok-wrong"), serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_happy_path() {
        let app = test_router(vec![ModelDecision::Answer {
            content: "Hello Alice!".into(),
            reasoning: None,
        }]);
        let res = app
            .oneshot(chat_request(Some("tok-alice"), serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["content"], "Hello Alice!");
        assert!(parsed.get("reply").is_none());
        assert_eq!(parsed["truncated"], false);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(chat_request(Some("tok-alice"), serde_json::json!({"message": "  "})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_attachment_is_rejected() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(chat_request(
                Some("tok-alice"),
                serde_json::json!({
                    "message": "look at this",
                    "attachments": [{
                        "name": "big.txt",
                        "media_type": "text/plain",
                        "text": "x".repeat(4096),
                    }],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cross_principal_history_is_forbidden() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/api/conversations/alice")
                    .header("authorization", "Bearer tok-bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn own_history_lists_appended_turns() {
        let app = test_router(vec![ModelDecision::Answer {
            content: "noted".into(),
            reasoning: None,
        }]);

        let res = app
            .clone()
            .oneshot(chat_request(
                Some("tok-alice"),
                serde_json::json!({"message": "remember this"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/api/conversations/alice")
                    .header("authorization", "Bearer tok-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["turns"][0]["message"], "remember this");
        assert_eq!(parsed["turns"][0]["reply"], "noted");
    }

    #[tokio::test]
    async fn tools_endpoint_lists_builtins() {
        let app = test_router(vec![]);
        let res = app
            .oneshot(
                Request::builder()
                    .uri("/api/tools")
                    .header("authorization", "Bearer tok-alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["count"], 3);
        let names: Vec<&str> = parsed["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"search_web"));
        assert!(names.contains(&"store_memory"));
        assert!(names.contains(&"recall_memory"));
    }
}
