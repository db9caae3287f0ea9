//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use chrono::SecondsFormat;
use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the embedding model the cached vectors were produced with, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}

/// Migration v1 → v2: brings databases written by older releases in line with
/// the current schema.
///
/// - `source_type` is added where missing; existing rows are user statements.
/// - Tables declared without `AUTOINCREMENT` are rebuilt so ids are never reused
///   after a reset. Columns this release does not read are dropped.
/// - Timestamps are rewritten as RFC 3339 UTC, so string order is time order.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    if !has_column(conn, "memories", "source_type")? {
        conn.execute(
            "ALTER TABLE memories ADD COLUMN source_type TEXT NOT NULL DEFAULT 'user_statement'",
            [],
        )?;
        tracing::info!("added source_type column to memories");
    }

    if !uses_autoincrement(conn, "memories")? {
        conn.execute_batch(
            "CREATE TABLE memories_rebuilt (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                memory_type TEXT NOT NULL DEFAULT 'fact',
                source_type TEXT NOT NULL DEFAULT 'user_statement',
                created_at TEXT NOT NULL
            );
            INSERT INTO memories_rebuilt (id, user_id, content, memory_type, source_type, created_at)
                SELECT id, user_id, content, COALESCE(memory_type, 'fact'),
                       COALESCE(source_type, 'user_statement'), created_at
                FROM memories;
            DROP TABLE memories;
            ALTER TABLE memories_rebuilt RENAME TO memories;
            CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
            CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(memory_type);",
        )?;
        tracing::info!("rebuilt memories table with AUTOINCREMENT ids");
    }

    if !uses_autoincrement(conn, "conversations")? {
        conn.execute_batch(
            "CREATE TABLE conversations_rebuilt (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                response TEXT,
                model TEXT,
                timestamp TEXT NOT NULL
            );
            INSERT INTO conversations_rebuilt (id, user_id, message, response, model, timestamp)
                SELECT id, user_id, message, response, model, timestamp FROM conversations;
            DROP TABLE conversations;
            ALTER TABLE conversations_rebuilt RENAME TO conversations;
            CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);
            CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp DESC);",
        )?;
        tracing::info!("rebuilt conversations table with AUTOINCREMENT ids");
    }

    let rewritten = normalize_timestamps(conn, "memories", "created_at")?
        + normalize_timestamps(conn, "conversations", "timestamp")?;
    if rewritten > 0 {
        tracing::info!(rewritten, "normalized legacy timestamps to UTC");
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memories_user_source ON memories(user_id, source_type)",
        [],
    )?;
    Ok(())
}

fn uses_autoincrement(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let sql: String = conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(sql.to_ascii_uppercase().contains("AUTOINCREMENT"))
}

/// Rewrite every parseable timestamp in `table.column` that is not already in
/// canonical UTC form. Unparseable values are left alone. Returns the number
/// of rows changed.
fn normalize_timestamps(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<usize> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(&format!("SELECT id, {column} FROM {table}"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let mut update = conn.prepare(&format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2"))?;
    let mut changed = 0;
    for (id, raw) in rows {
        let Some(ts) = super::parse_timestamp(&raw) else {
            tracing::warn!(table, id, value = %raw, "leaving unparseable timestamp as is");
            continue;
        };
        let canonical = ts.to_rfc3339_opts(SecondsFormat::Micros, true);
        if canonical != raw {
            update.execute(rusqlite::params![canonical, id])?;
            changed += 1;
        }
    }
    Ok(changed)
}
