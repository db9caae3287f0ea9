use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub memories: u64,
    pub conversations: u64,
    pub cached_embeddings: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    pub database_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

impl StatsResponse {
    /// Size in MiB rounded to two decimals, for human-facing output.
    pub fn database_size_mb(&self) -> f64 {
        (self.database_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

/// Compute store statistics, for one user or (with `None`) the whole database.
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn memory_stats(
    conn: &Connection,
    user_id: Option<&str>,
    db_path: Option<&Path>,
) -> Result<StatsResponse> {
    let memories = count(conn, "SELECT COUNT(*) FROM memories", user_id)?;
    let conversations = count(conn, "SELECT COUNT(*) FROM conversations", user_id)?;
    let cached_embeddings = count(
        conn,
        "SELECT COUNT(*) FROM memory_embeddings e JOIN memories m ON m.id = e.memory_id",
        user_id,
    )?;
    let by_type = group_counts(conn, "COALESCE(memory_type, 'fact')", user_id)?;
    let by_source = group_counts(conn, "COALESCE(source_type, 'user_statement')", user_id)?;
    let (oldest_memory, newest_memory) = time_range(conn, user_id)?;

    let database_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        user_id: user_id.map(str::to_string),
        memories,
        conversations,
        cached_embeddings,
        by_type,
        by_source,
        database_size_bytes,
        database_path: db_path.map(|p| p.display().to_string()),
        oldest_memory,
        newest_memory,
    })
}

/// Run a `SELECT COUNT(*)` with an optional `user_id` filter appended.
fn count(conn: &Connection, base: &str, user_id: Option<&str>) -> Result<u64> {
    let n: i64 = match user_id {
        Some(u) => conn.query_row(&format!("{base} WHERE user_id = ?1"), params![u], |row| {
            row.get(0)
        })?,
        None => conn.query_row(base, [], |row| row.get(0))?,
    };
    Ok(n as u64)
}

fn group_counts(
    conn: &Connection,
    column: &str,
    user_id: Option<&str>,
) -> Result<BTreeMap<String, u64>> {
    let (where_clause, user_param) = match user_id {
        Some(u) => ("WHERE user_id = ?1", vec![u.to_string()]),
        None => ("", Vec::new()),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM memories {where_clause} GROUP BY 1"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(user_param.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|(k, v)| (k, v as u64)).collect())
}

fn time_range(conn: &Connection, user_id: Option<&str>) -> Result<(Option<String>, Option<String>)> {
    let range: (Option<String>, Option<String>) = match user_id {
        Some(u) => conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM memories WHERE user_id = ?1",
            params![u],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?,
        None => conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?,
    };
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::add_memory;
    use crate::memory::types::{MemoryType, NewMemory, SourceType};

    #[test]
    fn test_stats_empty_db() {
        let conn = crate::db::open_memory_database().unwrap();
        let stats = memory_stats(&conn, None, None).unwrap();
        assert_eq!(stats.memories, 0);
        assert_eq!(stats.conversations, 0);
        assert!(stats.by_type.is_empty());
        assert!(stats.oldest_memory.is_none());
        assert_eq!(stats.database_size_bytes, 0);
    }

    #[test]
    fn test_stats_counts_per_user() {
        let conn = crate::db::open_memory_database().unwrap();
        add_memory(
            &conn,
            &NewMemory::new("likes tea", "u1").memory_type(MemoryType::Preference),
        )
        .unwrap();
        add_memory(&conn, &NewMemory::new("lives in Oslo", "u1")).unwrap();
        add_memory(
            &conn,
            &NewMemory::new("echo", "u1").source_type(SourceType::AssistantResponse),
        )
        .unwrap();
        add_memory(&conn, &NewMemory::new("someone else", "u2")).unwrap();

        let stats = memory_stats(&conn, Some("u1"), None).unwrap();
        assert_eq!(stats.memories, 3);
        assert_eq!(stats.by_type.get("fact"), Some(&2));
        assert_eq!(stats.by_type.get("preference"), Some(&1));
        assert_eq!(stats.by_source.get("assistant_response"), Some(&1));
        assert!(stats.oldest_memory <= stats.newest_memory);

        let global = memory_stats(&conn, None, None).unwrap();
        assert_eq!(global.memories, 4);
    }

    #[test]
    fn test_size_mb_rounding() {
        let conn = crate::db::open_memory_database().unwrap();
        let mut stats = memory_stats(&conn, None, None).unwrap();
        stats.database_size_bytes = 1_572_864; // 1.5 MiB
        assert_eq!(stats.database_size_mb(), 1.5);
    }
}
