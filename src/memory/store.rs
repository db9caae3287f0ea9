//! Storage layer: the only code that touches the database file.
//!
//! The free functions operate on a borrowed [`Connection`] and hold the SQL.
//! [`MemoryStore`] owns the file: one writer connection behind a mutex, so writes
//! are serialized, and a fresh read-only connection per read, so WAL lets reads
//! overlap a write in progress. All methods block; async callers wrap them in
//! `tokio::task::spawn_blocking`.

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::db;
use crate::error::{MemoryError, Result};
use crate::memory::conversations;
use crate::memory::stats::{self, StatsResponse};
use crate::memory::types::{Conversation, FilterType, Memory, MemoryType, NewMemory, SourceType};
use crate::memory::{bytes_to_embedding, embedding_to_bytes};

/// Current time as an RFC 3339 string with microseconds.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Insert a memory and return its id.
///
/// The timestamp is bumped past the user's newest memory when the clock has not
/// advanced, so timestamps within one user are strictly increasing like ids. The
/// read and the insert share an `IMMEDIATE` transaction, so another process
/// writing the same file cannot slip a row in between.
pub fn add_memory(conn: &Connection, new: &NewMemory) -> Result<i64> {
    validate_new_memory(new)?;

    // The writer connection is never inside a transaction here
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let latest: Option<String> = tx.query_row(
        "SELECT MAX(created_at) FROM memories WHERE user_id = ?1",
        params![new.user_id],
        |row| row.get(0),
    )?;
    let created_at = next_timestamp(latest.as_deref());

    tx.execute(
        "INSERT INTO memories (user_id, content, memory_type, source_type, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.user_id,
            new.content,
            new.memory_type.as_str(),
            new.source_type.as_str(),
            created_at,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(id)
}

fn validate_new_memory(new: &NewMemory) -> Result<()> {
    if new.content.trim().is_empty() {
        return Err(MemoryError::validation("content must not be empty"));
    }
    if new.user_id.is_empty() {
        return Err(MemoryError::validation("user_id must not be empty"));
    }
    if new.memory_type.as_str().is_empty() || new.source_type.as_str().is_empty() {
        return Err(MemoryError::validation(
            "memory_type and source_type must not be empty",
        ));
    }
    Ok(())
}

fn next_timestamp(latest: Option<&str>) -> String {
    let now = Utc::now();
    let Some(prev) = latest.and_then(db::parse_timestamp) else {
        return now.to_rfc3339_opts(SecondsFormat::Micros, true);
    };
    let ts = if now > prev {
        now
    } else {
        prev + chrono::Duration::microseconds(1)
    };
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// All memories of `user_id` passing `filter`, newest first.
pub fn list_by_user(conn: &Connection, user_id: &str, filter: FilterType) -> Result<Vec<Memory>> {
    const COLUMNS: &str = "SELECT id, user_id, content, COALESCE(memory_type, 'fact'), \
                           COALESCE(source_type, 'user_statement'), created_at FROM memories";

    let rows = match filter.source() {
        Some(source) => {
            let mut stmt = conn.prepare_cached(&format!(
                "{COLUMNS} WHERE user_id = ?1 AND source_type = ?2 \
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id, source.as_str()], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare_cached(&format!(
                "{COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Every memory of every user, oldest first.
pub fn list_all(conn: &Connection) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, content, COALESCE(memory_type, 'fact'), \
         COALESCE(source_type, 'user_statement'), created_at FROM memories ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], row_to_memory)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch a single memory by id.
pub fn get_memory(conn: &Connection, id: i64) -> Result<Option<Memory>> {
    let memory = conn
        .query_row(
            "SELECT id, user_id, content, COALESCE(memory_type, 'fact'), \
             COALESCE(source_type, 'user_statement'), created_at FROM memories WHERE id = ?1",
            params![id],
            row_to_memory,
        )
        .optional()?;
    Ok(memory)
}

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let memory_type: String = row.get(3)?;
    let source_type: String = row.get(4)?;
    Ok(Memory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        memory_type: MemoryType::parse(&memory_type),
        source_type: SourceType::parse(&source_type),
        created_at: row.get(5)?,
    })
}

/// Cached embedding for a memory, if one was computed with the recorded model.
pub fn get_embedding(conn: &Connection, memory_id: i64) -> Result<Option<Vec<f32>>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT e.embedding FROM memory_embeddings e \
             WHERE e.memory_id = ?1 AND e.model = COALESCE( \
                 (SELECT value FROM schema_meta WHERE key = 'embedding_model'), '')",
            params![memory_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(blob.and_then(|b| {
        let decoded = bytes_to_embedding(&b);
        if decoded.is_none() {
            tracing::warn!(memory_id, "ignoring malformed cached embedding");
        }
        decoded
    }))
}

/// Cache an embedding for a memory. Idempotent: a second call replaces the first.
pub fn set_embedding(conn: &Connection, memory_id: i64, embedding: &[f32]) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO memory_embeddings (memory_id, model, dims, embedding, created_at) \
         VALUES (?1, COALESCE((SELECT value FROM schema_meta WHERE key = 'embedding_model'), ''), \
                 ?2, ?3, ?4)",
        params![
            memory_id,
            embedding.len() as i64,
            embedding_to_bytes(embedding),
            now_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Drop every cached embedding. Returns the number removed.
pub fn clear_embeddings(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM memory_embeddings", [])?)
}

/// Record `model` as the embedding model. When it differs from the recorded one the
/// cache is cleared, since vectors from different models are not comparable.
/// Returns `true` if the cache was invalidated.
pub fn sync_embedding_model(conn: &mut Connection, model: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    let stored = db::migrations::get_embedding_model(&tx)?;
    if stored.as_deref() == Some(model) {
        return Ok(false);
    }

    let removed = clear_embeddings(&tx)?;
    db::migrations::set_embedding_model(&tx, model)?;
    tx.commit()?;

    if let Some(previous) = stored {
        tracing::warn!(
            previous = %previous,
            current = %model,
            removed,
            "embedding model changed, cached vectors dropped"
        );
    }
    Ok(true)
}

/// Owner of the database file.
pub struct MemoryStore {
    path: PathBuf,
    writer: Mutex<Connection>,
}

impl MemoryStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = db::open_database(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| MemoryError::Internal(format!("db lock poisoned: {e}")))?;
        f(&mut conn)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = db::open_reader(&self.path)?;
        f(&conn)
    }

    /// Validate and insert a memory. Returns the new id once the write is durable.
    pub fn add(&self, new: &NewMemory) -> Result<i64> {
        self.write(|conn| add_memory(conn, new))
    }

    pub fn list_by_user(&self, user_id: &str, filter: FilterType) -> Result<Vec<Memory>> {
        self.read(|conn| list_by_user(conn, user_id, filter))
    }

    pub fn list_all(&self) -> Result<Vec<Memory>> {
        self.read(list_all)
    }

    pub fn get(&self, id: i64) -> Result<Option<Memory>> {
        self.read(|conn| get_memory(conn, id))
    }

    pub fn get_embedding(&self, memory_id: i64) -> Result<Option<Vec<f32>>> {
        self.read(|conn| get_embedding(conn, memory_id))
    }

    /// Cached embeddings for `ids`, read over one connection. Ids without a
    /// usable vector are absent from the map.
    pub fn cached_embeddings(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<f32>>> {
        self.read(|conn| {
            let mut found = HashMap::with_capacity(ids.len());
            for &id in ids {
                if let Some(v) = get_embedding(conn, id)? {
                    found.insert(id, v);
                }
            }
            Ok(found)
        })
    }

    pub fn set_embedding(&self, memory_id: i64, embedding: &[f32]) -> Result<()> {
        self.write(|conn| set_embedding(conn, memory_id, embedding))
    }

    /// Cache several embeddings in one transaction.
    pub fn set_embeddings(&self, embeddings: &[(i64, Vec<f32>)]) -> Result<()> {
        if embeddings.is_empty() {
            return Ok(());
        }
        self.write(|conn| {
            let tx = conn.transaction()?;
            for (id, embedding) in embeddings {
                set_embedding(&tx, *id, embedding)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn clear_embeddings(&self) -> Result<usize> {
        self.write(|conn| clear_embeddings(conn))
    }

    pub fn sync_embedding_model(&self, model: &str) -> Result<bool> {
        self.write(|conn| sync_embedding_model(conn, model))
    }

    pub fn log_conversation(
        &self,
        user_id: &str,
        message: &str,
        response: Option<&str>,
        model: Option<&str>,
    ) -> Result<i64> {
        self.write(|conn| conversations::log_conversation(conn, user_id, message, response, model))
    }

    pub fn recent_conversations(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        self.read(|conn| conversations::recent_conversations(conn, user_id, limit))
    }

    pub fn stats(&self, user_id: Option<&str>) -> Result<StatsResponse> {
        self.read(|conn| stats::memory_stats(conn, user_id, Some(&self.path)))
    }

    /// Delete every memory, cached embedding and conversation. Ids keep counting
    /// up afterwards; they are never reused (legacy tables are rebuilt with
    /// `AUTOINCREMENT` during migration).
    pub fn reset(&self) -> Result<()> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DELETE FROM memory_embeddings;
                 DELETE FROM memories;
                 DELETE FROM conversations;",
            )?;
            tx.commit()?;
            Ok(())
        })
    }
}
