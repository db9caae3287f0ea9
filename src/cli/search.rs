use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::types::FilterType;

use super::preview;

/// Run a search from the terminal, with the same engine the server uses.
pub async fn search(
    config: &RecollectConfig,
    query: &str,
    user_id: Option<&str>,
    limit: Option<i64>,
    filter: FilterType,
) -> Result<()> {
    let service = recollect::server::build_service(config)?;
    let user_id = user_id.unwrap_or(&config.storage.default_user);

    let results = service.search(user_id, query, filter, limit).await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        let stage = match result.stage {
            recollect::memory::SearchStage::Keyword => "keyword",
            recollect::memory::SearchStage::Semantic => "semantic",
        };
        println!(
            "  {}. [{}] #{} ({stage}, score: {:.4}) {}",
            i + 1,
            result.memory_type,
            result.id,
            result.score,
            result.timestamp,
        );
        println!("     {}", preview(&result.content, 120));
        println!();
    }

    Ok(())
}
