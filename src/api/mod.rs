//! HTTP surface: the REST memory endpoints, the conversation webhook and the
//! OpenAI-style tool server.
//!
//! - `GET  /`               service description
//! - `GET  /health`         liveness
//! - `POST /memory/add`     store a memory
//! - `POST /memory/search`  two-stage search
//! - `GET  /memory/stats`   statistics, optionally per user
//! - `GET  /memory/recent`  latest logged conversation turns
//! - `POST /webhook/log`    log a conversation turn from the chat UI
//! - `GET  /tools`          tool definitions
//! - `POST /tools/call`     execute a tool

pub mod routes;
pub mod tool_server;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::MemoryError;
use crate::memory::MemoryService;
use crate::tools::MemoryTools;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MemoryService>,
    pub tools: MemoryTools,
    pub default_user: Arc<str>,
}

impl AppState {
    pub fn new(service: Arc<MemoryService>, default_user: &str) -> Self {
        Self {
            tools: MemoryTools::new(Arc::clone(&service), default_user),
            service,
            default_user: Arc::from(default_user),
        }
    }

    /// `user_id` from a request, or the configured default when absent or blank.
    pub fn user_or_default(&self, user_id: Option<String>) -> String {
        user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.default_user.to_string())
    }
}

/// Build the router. CORS is permissive when `cors` is set, since the chat UI
/// is served from another origin.
pub fn router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/memory/add", post(routes::add_memory))
        .route("/memory/search", post(routes::search_memory))
        .route("/memory/stats", get(routes::memory_stats))
        .route("/memory/recent", get(routes::recent_conversations))
        .route("/webhook/log", post(routes::webhook_log))
        .route("/tools", get(tool_server::list_tools))
        .route("/tools/call", post(tool_server::call_tool))
        .with_state(state);

    if cors {
        router.layer(tower_http::cors::CorsLayer::permissive())
    } else {
        router
    }
}

impl IntoResponse for MemoryError {
    fn into_response(self) -> Response {
        let status = match &self {
            MemoryError::Validation(_) => StatusCode::BAD_REQUEST,
            MemoryError::NotFound(_) => StatusCode::NOT_FOUND,
            MemoryError::Storage(_) | MemoryError::Io(_) | MemoryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = serde_json::json!({ "status": "error", "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for MemoryError {
    fn from(rejection: JsonRejection) -> Self {
        MemoryError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for MemoryError {
    fn from(rejection: QueryRejection) -> Self {
        MemoryError::Validation(rejection.body_text())
    }
}
