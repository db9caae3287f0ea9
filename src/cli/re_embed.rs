//! CLI `re-embed` command: rebuild the embedding cache with the current model.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use recollect::config::RecollectConfig;
use recollect::embedding;
use recollect::memory::MemoryStore;

const BATCH_SIZE: usize = 32;

/// Drop every cached vector and embed all memories again.
pub async fn re_embed(config: &RecollectConfig) -> Result<()> {
    let store = MemoryStore::open(config.resolved_db_path()).context("failed to open database")?;

    let provider = embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;

    store.sync_embedding_model(provider.model_name())?;
    let dropped = store.clear_embeddings()?;
    tracing::debug!(dropped, "cleared embedding cache");

    let memories = store.list_all()?;
    let total = memories.len();
    if total == 0 {
        println!("No memories to re-embed.");
        return Ok(());
    }

    println!(
        "Re-embedding {total} memories with model '{}'...",
        provider.model_name()
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    for chunk in memories.chunks(BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(|m| m.content.clone()).collect();
        let timeout = config.embedding.timeout() * chunk.len() as u32;

        let embeddings = tokio::time::timeout(timeout, provider.embed_batch(&texts))
            .await
            .context("embedding batch timed out")?
            .context("embedding batch failed")?;

        let rows: Vec<(i64, Vec<f32>)> = chunk.iter().map(|m| m.id).zip(embeddings).collect();
        store.set_embeddings(&rows)?;

        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();

    println!(
        "Re-embedded {total} memories with model '{}'.",
        provider.model_name()
    );
    Ok(())
}
