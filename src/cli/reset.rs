//! CLI `reset` command: delete all memories after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use recollect::config::RecollectConfig;
use recollect::memory::MemoryStore;

/// Delete all memories, cached embeddings and conversations. Asks for
/// confirmation unless `yes` is set.
pub fn reset(config: &RecollectConfig, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !yes {
        println!("WARNING: This will permanently delete ALL memories and logged conversations.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let store = MemoryStore::open(&db_path)?;
    store.reset()?;

    tracing::info!(db = %db_path.display(), "database reset");
    println!("All memories deleted. Database reset complete.");
    Ok(())
}
