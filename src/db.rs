use crate::error::{GradebookError, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    // Mirrors browser local storage: string keys, JSON text values.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn kv_get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| GradebookError::Corrupt {
            key: key.to_string(),
            source,
        })
}

pub fn kv_set_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|source| GradebookError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    conn.execute(
        "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, &text, chrono::Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn kv_exists(conn: &Connection, key: &str) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row("SELECT 1 FROM kv_store WHERE key = ?", [key], |r| r.get(0))
        .optional()?;
    Ok(hit.is_some())
}

pub fn kv_remove(conn: &Connection, key: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
    Ok(n > 0)
}

/// Keys starting with `prefix`, sorted.
pub fn kv_keys_with_prefix(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    // Filter in Rust: LIKE would treat `_` in keys as a wildcard.
    Ok(keys.into_iter().filter(|k| k.starts_with(prefix)).collect())
}

#[cfg(test)]
pub fn open_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}
