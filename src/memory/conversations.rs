//! Optional transcript log of raw chat exchanges.
//!
//! Turns are written by the chat front end's webhook and read back for
//! short-term context. They are not part of the search candidate pool.

use rusqlite::{params, Connection};

use crate::error::{MemoryError, Result};
use crate::memory::store::now_rfc3339;
use crate::memory::types::Conversation;

/// Append a conversation turn. Returns its id.
pub fn log_conversation(
    conn: &Connection,
    user_id: &str,
    message: &str,
    response: Option<&str>,
    model: Option<&str>,
) -> Result<i64> {
    if message.trim().is_empty() {
        return Err(MemoryError::validation("message must not be empty"));
    }
    conn.execute(
        "INSERT INTO conversations (user_id, message, response, model, timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, message, response, model, now_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent turns for a user, newest first.
pub fn recent_conversations(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, message, response, model, timestamp FROM conversations \
         WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![user_id, limit as i64], |row| {
            Ok(Conversation {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message: row.get(2)?,
                response: row.get(3)?,
                model: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
