//! `search_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search_memory` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoryParams {
    #[schemars(description = "Search query to find relevant memories")]
    pub query: String,

    #[schemars(description = "Maximum number of results (default: 5)")]
    pub limit: Option<i64>,

    /// `"user_only"`, `"assistant_only"` or `"all"`.
    #[schemars(
        description = "Which memories to consider: 'user_only' (default, things the user said), 'assistant_only', or 'all'"
    )]
    pub filter_type: Option<String>,

    #[schemars(description = "Whose memories to search. Defaults to the server's default user.")]
    pub user_id: Option<String>,
}
