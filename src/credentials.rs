//! Access-token custody for the remote object store.
//!
//! The token lives in the local settings database under a fixed key and is
//! handed only to the store client. It is never logged.

use std::path::{Path, PathBuf};

use crate::config::TOKEN_SETTING_KEY;
use crate::db::{self, DatabaseError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Settings database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token must not be empty")]
    EmptyToken,
}

/// Anything that can hand out the current access token.
pub trait TokenSource: Send + Sync {
    /// `Ok(None)` when no token has been stored.
    fn token(&self) -> Result<Option<String>, CredentialError>;
}

/// Token persisted in the SQLite settings database.
///
/// Opens a short-lived connection per call so the store can be shared
/// across tasks without holding a `Connection` (which is not `Sync`).
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    db_path: PathBuf,
}

impl SqliteTokenStore {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    /// Store at the default location under the app data directory.
    pub fn default_location() -> Result<Self, CredentialError> {
        let path = crate::config::settings_db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(&path))
    }

    pub fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        let conn = db::open_database(&self.db_path)?;
        db::set_setting(&conn, TOKEN_SETTING_KEY, token)?;
        tracing::info!("Access token stored");
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), CredentialError> {
        let conn = db::open_database(&self.db_path)?;
        db::delete_setting(&conn, TOKEN_SETTING_KEY)?;
        tracing::info!("Access token cleared");
        Ok(())
    }

    pub fn has_token(&self) -> Result<bool, CredentialError> {
        Ok(self.token()?.is_some())
    }
}

impl TokenSource for SqliteTokenStore {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        let conn = db::open_database(&self.db_path)?;
        Ok(db::get_setting(&conn, TOKEN_SETTING_KEY)?.filter(|t| !t.is_empty()))
    }
}

/// Fixed token, for callers that manage the secret themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self(Some(token.to_string()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SqliteTokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTokenStore::new(&dir.path().join("settings.db"));
        (dir, store)
    }

    #[test]
    fn fresh_store_has_no_token() {
        let (_dir, store) = store();
        assert!(!store.has_token().unwrap());
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn token_survives_reopen() {
        let (dir, store) = store();
        store.set_token("  ghp_secret  ").unwrap();

        let reopened = SqliteTokenStore::new(&dir.path().join("settings.db"));
        assert_eq!(reopened.token().unwrap().as_deref(), Some("ghp_secret"));
    }

    #[test]
    fn clear_removes_token() {
        let (_dir, store) = store();
        store.set_token("ghp_secret").unwrap();
        store.clear_token().unwrap();
        assert!(!store.has_token().unwrap());
    }

    #[test]
    fn empty_token_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.set_token("   "),
            Err(CredentialError::EmptyToken)
        ));
    }

    #[test]
    fn static_token_sources() {
        assert_eq!(StaticToken::new("t").token().unwrap().as_deref(), Some("t"));
        assert_eq!(StaticToken::missing().token().unwrap(), None);
    }
}
