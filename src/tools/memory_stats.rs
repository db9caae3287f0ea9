//! `get_memory_stats` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `get_memory_stats` tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Limit the statistics to one user.
    #[schemars(description = "Whose statistics to report. Defaults to the server's default user.")]
    pub user_id: Option<String>,
}
