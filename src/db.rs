use crate::credentials::DocumentStore;
use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, Identity};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Local SQLite database backing offline mode
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| AppError::persistence(format!("Failed to create data dir: {}", e)))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            "
            -- Path-addressed JSON documents (credential secrets)
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Anonymous local identity, at most one row
            CREATE TABLE IF NOT EXISTS local_identity (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                uid TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_connection<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::persistence("Database lock poisoned"))?;
        f(&*conn).map_err(AppError::from)
    }

    // ============ Documents ============

    pub fn get_document(&self, path: &str) -> AppResult<Option<Value>> {
        let body: Option<String> = self.with_connection(|conn| {
            conn.query_row(
                "SELECT body FROM documents WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()
        })?;

        body.map(|b| serde_json::from_str(&b).map_err(|e| AppError::persistence(e.to_string())))
            .transpose()
    }

    pub fn put_document(&self, path: &str, document: &Value) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let body = document.to_string();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO documents (path, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(path) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![path, body, now],
            )?;
            Ok(())
        })
    }

    // ============ Local Identity ============

    pub fn get_local_uid(&self) -> AppResult<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row("SELECT uid FROM local_identity WHERE id = 1", [], |row| row.get(0))
                .optional()
        })
    }

    /// Returns the stored uid, creating one on first call
    pub fn get_or_create_local_uid(&self) -> AppResult<String> {
        let now = Utc::now().to_rfc3339();
        let candidate = Uuid::new_v4().to_string();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO local_identity (id, uid, created_at) VALUES (1, ?1, ?2)",
                params![candidate, now],
            )?;
            conn.query_row("SELECT uid FROM local_identity WHERE id = 1", [], |row| row.get(0))
        })
    }
}

pub struct SqliteDocumentStore {
    db: Arc<Database>,
}

impl SqliteDocumentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn load(&self, path: &str) -> AppResult<Option<Value>> {
        self.db.get_document(path)
    }

    async fn save(&self, path: &str, document: &Value) -> AppResult<()> {
        self.db.put_document(path, document)
    }
}

/// Anonymous identity persisted in the local database
pub struct LocalAuth {
    db: Arc<Database>,
}

impl LocalAuth {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn current_identity(&self) -> AppResult<Option<Identity>> {
        Ok(self.db.get_local_uid()?.map(Identity::new))
    }

    async fn sign_in_anonymously(&self) -> AppResult<Identity> {
        self.db
            .get_or_create_local_uid()
            .map(Identity::new)
            .map_err(|e| AppError::persistence(format!("Local sign-in failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_upsert() {
        let db = Database::open_in_memory().unwrap();
        db.put_document("artifacts/a/users/u/secrets/api", &json!({ "key": "one" })).unwrap();
        db.put_document("artifacts/a/users/u/secrets/api", &json!({ "key": "two" })).unwrap();

        assert_eq!(
            db.get_document("artifacts/a/users/u/secrets/api").unwrap(),
            Some(json!({ "key": "two" }))
        );
        assert!(db.get_document("missing").unwrap().is_none());
    }

    #[test]
    fn test_local_uid_is_stable() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_local_uid().unwrap().is_none());

        let first = db.get_or_create_local_uid().unwrap();
        let second = db.get_or_create_local_uid().unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_local_uid().unwrap(), Some(first));
    }

    #[test]
    fn test_identity_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("brandscope.db");

        let uid = Database::open(&path).unwrap().get_or_create_local_uid().unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get_local_uid().unwrap(), Some(uid));
    }

    #[tokio::test]
    async fn test_local_auth_flow() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let auth = LocalAuth::new(db.clone());

        assert!(auth.current_identity().await.unwrap().is_none());
        let identity = auth.sign_in_anonymously().await.unwrap();
        assert_eq!(auth.current_identity().await.unwrap(), Some(identity.clone()));
        assert!(Uuid::parse_str(&identity.id).is_ok());
    }

    #[tokio::test]
    async fn test_sqlite_store_through_credentials() {
        use crate::credentials::CredentialStore;

        let db = Arc::new(Database::open_in_memory().unwrap());
        let creds = CredentialStore::new(Arc::new(SqliteDocumentStore::new(db)), "default-app-id");

        assert!(creds.load("uid-9").await.is_none());
        creds.save("uid-9", "AIza-local").await.unwrap();
        assert_eq!(creds.load("uid-9").await.as_deref(), Some("AIza-local"));
    }
}
