use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Longest key accepted by the settings table.
const MAX_KEY_LEN: usize = 64;

fn validate_key(key: &str) -> Result<(), DatabaseError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidKey(key.to_string()))
    }
}

/// Get a setting by key. Returns None if not set.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    validate_key(key)?;
    let mut stmt = conn.prepare("SELECT value FROM app_settings WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Set a setting (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    validate_key(key)?;
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Delete a setting. Deleting a missing key is not an error.
pub fn delete_setting(conn: &Connection, key: &str) -> Result<(), DatabaseError> {
    validate_key(key)?;
    conn.execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
    Ok(())
}
