use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::types::{MemoryType, NewMemory, SourceType};
use recollect::memory::MemoryStore;

/// Store a memory from the terminal.
pub fn add(
    config: &RecollectConfig,
    content: &str,
    memory_type: &str,
    source_type: &str,
    user_id: Option<&str>,
) -> Result<()> {
    let store = MemoryStore::open(config.resolved_db_path())?;
    let user_id = user_id.unwrap_or(&config.storage.default_user);

    let new = NewMemory::new(content, user_id)
        .memory_type(MemoryType::parse(memory_type))
        .source_type(SourceType::parse(source_type));
    let id = store.add(&new)?;

    println!("Stored memory {id} ({memory_type}) for user '{user_id}'.");
    Ok(())
}
