use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::MemoryStore;

use super::preview;

/// Print the latest logged conversation turns, newest first.
pub fn recent(config: &RecollectConfig, user_id: Option<&str>, limit: usize) -> Result<()> {
    let store = MemoryStore::open(config.resolved_db_path())?;
    let user_id = user_id.unwrap_or(&config.storage.default_user);
    let turns = store.recent_conversations(user_id, limit)?;

    if turns.is_empty() {
        println!("No conversations logged for user '{user_id}'.");
        return Ok(());
    }

    for turn in &turns {
        let model = turn.model.as_deref().unwrap_or("-");
        println!("[{}] ({model})", turn.timestamp);
        println!("  Q: {}", preview(&turn.message, 200));
        if let Some(response) = &turn.response {
            println!("  A: {}", preview(response, 200));
        }
        println!();
    }
    Ok(())
}
