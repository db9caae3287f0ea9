//! `add_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddMemoryParams {
    #[schemars(description = "The memory content to store")]
    pub content: String,

    #[schemars(
        description = "Type of memory: 'fact' (default), 'preference', 'setting', 'skill', 'reminder' or 'note'"
    )]
    pub memory_type: Option<String>,

    #[schemars(
        description = "Who said it: 'user_statement' (default) or 'assistant_response'"
    )]
    pub source_type: Option<String>,

    #[schemars(description = "Whose memory this is. Defaults to the server's default user.")]
    pub user_id: Option<String>,
}
