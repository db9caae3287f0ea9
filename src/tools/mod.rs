pub mod add_memory;
pub mod memory_stats;
pub mod search_memory;

use add_memory::AddMemoryParams;
use memory_stats::MemoryStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_memory::SearchMemoryParams;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::memory::types::{FilterType, MemoryType, NewMemory, SourceType};
use crate::memory::{MemoryService, SearchMatch};

/// Content longer than this is cut in search results handed to the model.
const RESULT_PREVIEW_CHARS: usize = 150;

/// The memory tool handler. Exposes `search_memory`, `add_memory` and
/// `get_memory_stats` over MCP via the `#[tool_router]` macro; the HTTP tool
/// server dispatches to the same methods through [`MemoryTools::call`].
#[derive(Clone)]
pub struct MemoryTools {
    tool_router: ToolRouter<Self>,
    service: Arc<MemoryService>,
    default_user: String,
}

#[tool_router]
impl MemoryTools {
    pub fn new(service: Arc<MemoryService>, default_user: impl Into<String>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
            default_user: default_user.into(),
        }
    }

    /// Search the user's stored memories.
    #[tool(description = "Search the user's stored memories for relevant information. Use this to recall facts, preferences, or context the user shared earlier.")]
    async fn search_memory(
        &self,
        Parameters(params): Parameters<SearchMemoryParams>,
    ) -> Result<String, String> {
        let filter = match params.filter_type.as_deref() {
            Some(s) => s.parse::<FilterType>()?,
            None => FilterType::default(),
        };
        let user_id = self.user_or_default(params.user_id);

        tracing::info!(user_id = %user_id, filter = %filter, "search_memory called");

        let results = self
            .service
            .search(&user_id, &params.query, filter, params.limit)
            .await
            .map_err(|e| e.to_string())?;

        Ok(format_search_results(&results))
    }

    /// Store a new memory.
    #[tool(description = "Store an important fact, preference, or note about the user for future recall. Use this when the user shares something worth remembering.")]
    async fn add_memory(
        &self,
        Parameters(params): Parameters<AddMemoryParams>,
    ) -> Result<String, String> {
        let user_id = self.user_or_default(params.user_id);
        let mut new = NewMemory::new(params.content, user_id);
        if let Some(t) = params.memory_type.as_deref() {
            new = new.memory_type(MemoryType::parse(t));
        }
        if let Some(s) = params.source_type.as_deref() {
            new = new.source_type(SourceType::parse(s));
        }
        let preview = preview(&new.content, 50);

        let id = self.service.add(new).await.map_err(|e| e.to_string())?;
        Ok(format!("Memory stored (id {id}): {preview}"))
    }

    /// Summarize what is stored for the user.
    #[tool(description = "Get statistics about the user's stored memories and conversation history.")]
    async fn get_memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        let user_id = self.user_or_default(params.user_id);
        let stats = self
            .service
            .stats(Some(user_id))
            .await
            .map_err(|e| e.to_string())?;

        Ok(format!(
            "Conversations: {}, Memories: {}, Database size: {}MB",
            stats.conversations,
            stats.memories,
            stats.database_size_mb()
        ))
    }
}

impl MemoryTools {
    fn user_or_default(&self, user_id: Option<String>) -> String {
        user_id
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_user.clone())
    }

    /// Execute a tool by name with JSON arguments. A `user_override` (the
    /// `X-User-ID` header on the HTTP tool server) wins over any `user_id` argument.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        user_override: Option<String>,
    ) -> Result<String, String> {
        let mut arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        if let (Some(user), Some(obj)) = (user_override, arguments.as_object_mut()) {
            obj.insert("user_id".into(), Value::String(user));
        }

        match name {
            "search_memory" => self.search_memory(parse_args(name, arguments)?).await,
            "add_memory" => self.add_memory(parse_args(name, arguments)?).await,
            "get_memory_stats" => self.get_memory_stats(parse_args(name, arguments)?).await,
            other => Err(format!("Unknown tool: {other}")),
        }
    }

    /// OpenAI-style function definitions for every tool, sorted by name.
    pub fn definitions(&self) -> Vec<Value> {
        let mut tools = self.tool_router.list_all();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
            .into_iter()
            .map(|tool| {
                let mut parameters = Value::Object(tool.input_schema.as_ref().clone());
                if let Some(obj) = parameters.as_object_mut() {
                    obj.remove("$schema");
                    obj.remove("title");
                }
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description.unwrap_or_default(),
                        "parameters": parameters,
                    }
                })
            })
            .collect()
    }
}

fn parse_args<T: DeserializeOwned>(name: &str, arguments: Value) -> Result<Parameters<T>, String> {
    serde_json::from_value(arguments)
        .map(Parameters)
        .map_err(|e| format!("invalid arguments for {name}: {e}"))
}

/// Render search results one per line as `[date] content`, marking memories
/// that came from the assistant.
pub fn format_search_results(results: &[SearchMatch]) -> String {
    if results.is_empty() {
        return "No relevant memories found.".to_string();
    }
    results
        .iter()
        .map(|r| {
            let date: String = r.timestamp.chars().take(10).collect();
            let label = if r.source_type == SourceType::AssistantResponse {
                " [LLM]"
            } else {
                ""
            };
            format!("[{date}] {}{label}", preview(&r.content, RESULT_PREVIEW_CHARS))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[tool_handler]
impl ServerHandler for MemoryTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "recollect is a persistent memory server. Use add_memory to save facts and \
                 preferences the user shares, search_memory to recall them, and \
                 get_memory_stats for an overview."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SearchStage;

    fn result(content: &str, source: SourceType) -> SearchMatch {
        SearchMatch {
            id: 1,
            content: content.into(),
            memory_type: MemoryType::Fact,
            source_type: source,
            timestamp: "2024-03-05T10:00:00.000000Z".into(),
            score: 1.0,
            stage: SearchStage::Keyword,
        }
    }

    #[test]
    fn test_format_empty_results() {
        assert_eq!(format_search_results(&[]), "No relevant memories found.");
    }

    #[test]
    fn test_format_marks_assistant_memories() {
        let text = format_search_results(&[
            result("User likes tea", SourceType::UserStatement),
            result("Suggested green tea", SourceType::AssistantResponse),
        ]);
        assert_eq!(
            text,
            "[2024-03-05] User likes tea\n[2024-03-05] Suggested green tea [LLM]"
        );
    }

    #[test]
    fn test_preview_is_char_safe() {
        let long = "記".repeat(200);
        let p = preview(&long, RESULT_PREVIEW_CHARS);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), RESULT_PREVIEW_CHARS + 3);
    }
}
