use crate::error::{AppError, AppResult};
use crate::logging;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Path-addressed JSON document backend (Firestore or local SQLite)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self, path: &str) -> AppResult<Option<Value>>;

    /// Overwrites any existing document at `path`
    async fn save(&self, path: &str, document: &Value) -> AppResult<()>;
}

/// Persists the Gemini API key, one document per identity
pub struct CredentialStore {
    store: Arc<dyn DocumentStore>,
    app_id: String,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn DocumentStore>, app_id: &str) -> Self {
        Self { store, app_id: app_id.to_string() }
    }

    pub fn document_path(&self, owner_id: &str) -> String {
        format!("artifacts/{}/users/{}/secrets/api", self.app_id, owner_id)
    }

    /// Backend failures are logged and read as "no key"
    pub async fn load(&self, owner_id: &str) -> Option<String> {
        match self.store.load(&self.document_path(owner_id)).await {
            Ok(Some(doc)) => {
                let key = doc
                    .get("key")
                    .and_then(Value::as_str)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string);
                if key.is_some() {
                    logging::log_credential(Some(owner_id), "Loaded stored API key");
                }
                key
            }
            Ok(None) => None,
            Err(e) => {
                logging::log_error(Some(owner_id), &format!("Error fetching API key: {:?}", e));
                None
            }
        }
    }

    pub async fn save(&self, owner_id: &str, secret: &str) -> AppResult<()> {
        if secret.trim().is_empty() {
            return Err(AppError::MissingApiKey);
        }
        if owner_id.is_empty() {
            return Err(AppError::IdentityUnavailable);
        }

        self.store
            .save(&self.document_path(owner_id), &json!({ "key": secret }))
            .await
            .map_err(|e| {
                logging::log_error(Some(owner_id), &format!("Failed to save API key: {:?}", e));
                match e {
                    AppError::PersistenceFailed(detail) => AppError::PersistenceFailed(detail),
                    other => AppError::persistence(other.to_string()),
                }
            })?;

        logging::log_credential(Some(owner_id), "Saved API key");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryDocumentStore {
        pub docs: Mutex<HashMap<String, Value>>,
        pub fail: bool,
    }

    impl MemoryDocumentStore {
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryDocumentStore {
        async fn load(&self, path: &str) -> AppResult<Option<Value>> {
            if self.fail {
                return Err(AppError::network("permission-denied"));
            }
            Ok(self.docs.lock().unwrap().get(path).cloned())
        }

        async fn save(&self, path: &str, document: &Value) -> AppResult<()> {
            if self.fail {
                return Err(AppError::persistence("permission-denied"));
            }
            self.docs.lock().unwrap().insert(path.to_string(), document.clone());
            Ok(())
        }
    }
}
