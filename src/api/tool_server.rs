//! OpenAPI-style tool server used by the chat UI.
//!
//! Tool errors are reported in the body (`{"error": ...}`) with status 200 so
//! the UI hands them to the model instead of failing the turn.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::Result;

/// Header carrying the calling user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.tools.definitions() }))
}

pub async fn call_tool(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    let user = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    tracing::info!(tool = %req.name, user_id = ?user, "tool call");

    let body = match state.tools.call(&req.name, req.arguments, user).await {
        Ok(result) => json!({ "result": result }),
        Err(error) => {
            tracing::warn!(tool = %req.name, error = %error, "tool call failed");
            json!({ "error": error })
        }
    };
    Ok(Json(body))
}
