use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::MemoryStore;

/// Display memory statistics in the terminal.
pub fn stats(config: &RecollectConfig, user_id: Option<&str>) -> Result<()> {
    let store = MemoryStore::open(config.resolved_db_path())?;
    let response = store.stats(user_id)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    if let Some(user) = &response.user_id {
        println!("  User:                {user}");
    }
    println!("  Memories:            {}", response.memories);
    println!("  Conversations:       {}", response.conversations);
    println!("  Cached embeddings:   {}", response.cached_embeddings);
    println!();

    println!("By Type:");
    for (t, count) in &response.by_type {
        println!("  {:<20} {}", t, count);
    }
    println!();

    println!("By Source:");
    for (s, count) in &response.by_source {
        println!("  {:<20} {}", s, count);
    }
    println!();

    println!("Database size:         {} MB", response.database_size_mb());

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
