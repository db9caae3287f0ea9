use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::error::{MemoryError, Result};
use crate::memory::stats::StatsResponse;
use crate::memory::types::{Conversation, FilterType, MemoryType, NewMemory, SourceType};
use crate::memory::SearchMatch;

/// Default number of turns returned by `/memory/recent`.
const DEFAULT_RECENT_LIMIT: usize = 10;

// ============================================================================
// Service info
// ============================================================================

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "recollect",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Persistent memory and tools for a local AI agent",
        "endpoints": {
            "GET /health": "Health check",
            "POST /memory/add": "Store a memory",
            "POST /memory/search": "Search memories (keyword, then semantic fallback)",
            "GET /memory/stats": "Memory statistics",
            "GET /memory/recent": "Recent logged conversations",
            "POST /webhook/log": "Log a conversation turn",
            "GET /tools": "List available tools (OpenAPI tool server)",
            "POST /tools/call": "Execute a tool (OpenAPI tool server)",
            "POST /mcp": "Model Context Protocol endpoint"
        }
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddMemoryRequest {
    pub content: String,
    pub memory_type: Option<String>,
    pub source_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddMemoryResponse {
    pub memory_id: i64,
    pub status: &'static str,
}

pub async fn add_memory(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddMemoryRequest>, JsonRejection>,
) -> Result<Json<AddMemoryResponse>> {
    let Json(req) = payload?;
    let user_id = state.user_or_default(req.user_id);

    let mut new = NewMemory::new(req.content, user_id);
    if let Some(t) = req.memory_type.as_deref() {
        new = new.memory_type(MemoryType::parse(t));
    }
    if let Some(s) = req.source_type.as_deref() {
        new = new.source_type(SourceType::parse(s));
    }

    let memory_id = state.service.add(new).await?;
    Ok(Json(AddMemoryResponse {
        memory_id,
        status: "success",
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub filter_type: Option<String>,
}

pub async fn search_memory(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchMatch>>> {
    let Json(req) = payload?;
    let filter = match req.filter_type.as_deref() {
        Some(s) => s.parse::<FilterType>().map_err(MemoryError::Validation)?,
        None => FilterType::default(),
    };
    let user_id = state.user_or_default(req.user_id);

    let results = state
        .service
        .search(&user_id, &req.query, filter, req.limit)
        .await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    #[serde(flatten)]
    pub stats: StatsResponse,
    pub database_size_mb: f64,
    pub timestamp: String,
}

pub async fn memory_stats(
    State(state): State<AppState>,
    query: std::result::Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsBody>> {
    let Query(q) = query?;
    let user_id = q.user_id.filter(|u| !u.is_empty());
    let stats = state.service.stats(user_id).await?;
    Ok(Json(StatsBody {
        database_size_mb: stats.database_size_mb(),
        stats,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecentBody {
    pub user_id: String,
    pub count: usize,
    pub conversations: Vec<Conversation>,
}

pub async fn recent_conversations(
    State(state): State<AppState>,
    query: std::result::Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<RecentBody>> {
    let Query(q) = query?;
    let user_id = state.user_or_default(q.user_id);
    let limit = q.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if limit == 0 {
        return Err(MemoryError::validation("limit must be positive"));
    }

    let conversations = state.service.recent(user_id.clone(), limit).await?;
    Ok(Json(RecentBody {
        user_id,
        count: conversations.len(),
        conversations,
    }))
}

// ============================================================================
// Webhook
// ============================================================================

/// First non-empty string among `keys` in a JSON object.
fn first_str(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Log a conversation turn. Different chat UI versions name the fields
/// differently, so several aliases are accepted for each.
pub async fn webhook_log(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = payload?;

    let message = first_str(&body, &["user_message", "message", "content"])
        .ok_or_else(|| MemoryError::validation("no user_message in payload"))?;
    let response = first_str(&body, &["assistant_response", "response"]);
    let user_id = state.user_or_default(first_str(&body, &["user_id", "userId"]));
    let model = first_str(&body, &["model", "modelId"]);
    let chat_id = first_str(&body, &["chat_id", "chatId"]);

    let conversation_id = state
        .service
        .log_conversation(user_id.clone(), message, response, model)
        .await?;
    tracing::info!(user_id = %user_id, conversation_id, "webhook conversation logged");

    Ok(Json(json!({
        "status": "logged",
        "conversation_id": conversation_id,
        "chat_id": chat_id,
    })))
}
