//! Firebase backend: anonymous auth (Identity Toolkit) and Firestore documents
//!
//! Used when FIREBASE_CONFIG is present. The refresh token is kept in the
//! local database so the anonymous identity survives restarts, the same way
//! the web SDK keeps it in browser storage.

use crate::config::FirebaseConfig;
use crate::credentials::DocumentStore;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, Identity};
use crate::logging;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const SESSION_DOC_PATH: &str = "local/firebase_session";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetails {
    message: String,
}

#[derive(Debug, Clone)]
struct AuthSession {
    uid: String,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl AuthSession {
    fn from_parts(uid: String, id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let secs = expires_in.parse::<i64>().unwrap_or(3600);
        Self {
            uid,
            id_token,
            refresh_token,
            // Refresh a minute early
            expires_at: Utc::now() + ChronoDuration::seconds((secs - 60).max(0)),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

fn http_client() -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::config(format!("Failed to build HTTP client: {}", e)))
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<FirebaseErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()))
}

pub struct FirebaseAuth {
    client: Client,
    config: FirebaseConfig,
    db: Arc<Database>,
    session: Mutex<Option<AuthSession>>,
}

impl FirebaseAuth {
    pub fn new(config: FirebaseConfig, db: Arc<Database>) -> AppResult<Self> {
        Ok(Self {
            client: http_client()?,
            config,
            db,
            session: Mutex::new(None),
        })
    }

    fn cached_session(&self) -> Option<AuthSession> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    fn store_session(&self, session: AuthSession) -> AppResult<()> {
        self.db.put_document(
            SESSION_DOC_PATH,
            &json!({ "uid": session.uid, "refresh_token": session.refresh_token }),
        )?;
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session);
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<AuthSession> {
        let response = self.client
            .post(SECURE_TOKEN_URL)
            .query(&[("key", self.config.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::network(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::Http { status: status.as_u16(), message: error_message(status, &body) });
        }

        let parsed: RefreshResponse = serde_json::from_str(&body).map_err(|_| AppError::MalformedResponse)?;
        let session = AuthSession::from_parts(parsed.user_id, parsed.id_token, parsed.refresh_token, &parsed.expires_in);
        self.store_session(session.clone())?;
        Ok(session)
    }

    /// Bearer token for Firestore, refreshed when stale
    pub async fn id_token(&self) -> AppResult<String> {
        let session = self.cached_session().ok_or(AppError::IdentityUnavailable)?;
        if !session.is_expired() {
            return Ok(session.id_token);
        }
        logging::log_auth(Some(&session.uid), "Refreshing expired id token");
        Ok(self.refresh(&session.refresh_token).await?.id_token)
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    async fn current_identity(&self) -> AppResult<Option<Identity>> {
        if let Some(session) = self.cached_session() {
            return Ok(Some(Identity::new(session.uid)));
        }

        let stored = self.db.get_document(SESSION_DOC_PATH)?;
        let Some(refresh_token) = stored
            .as_ref()
            .and_then(|doc| doc.get("refresh_token"))
            .and_then(Value::as_str)
        else {
            return Ok(None);
        };

        let session = self.refresh(refresh_token).await?;
        Ok(Some(Identity::new(session.uid)))
    }

    async fn sign_in_anonymously(&self) -> AppResult<Identity> {
        let response = self.client
            .post(format!("{}/accounts:signUp", IDENTITY_TOOLKIT_URL))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({ "returnSecureToken": true }))
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::network(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::Http { status: status.as_u16(), message: error_message(status, &body) });
        }

        let parsed: SignUpResponse = serde_json::from_str(&body).map_err(|_| AppError::MalformedResponse)?;
        let session = AuthSession::from_parts(parsed.local_id, parsed.id_token, parsed.refresh_token, &parsed.expires_in);
        let identity = Identity::new(session.uid.clone());
        self.store_session(session)?;
        Ok(identity)
    }
}

// ============ Firestore ============

/// Encode plain JSON as Firestore typed values
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n.as_f64() }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

pub fn to_firestore_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), to_firestore_value(v))).collect()
}

/// Decode a Firestore typed value back into plain JSON
pub fn from_firestore_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(from_firestore_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

pub fn from_firestore_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter().map(|(k, v)| (k.clone(), from_firestore_value(v))).collect()
}

pub struct FirestoreStore {
    client: Client,
    project_id: String,
    auth: Arc<FirebaseAuth>,
}

impl FirestoreStore {
    pub fn new(project_id: &str, auth: Arc<FirebaseAuth>) -> AppResult<Self> {
        Ok(Self {
            client: http_client()?,
            project_id: project_id.to_string(),
            auth,
        })
    }

    pub fn document_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_URL,
            self.project_id,
            path.trim_matches('/')
        )
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn load(&self, path: &str) -> AppResult<Option<Value>> {
        let token = self.auth.id_token().await?;
        let response = self.client
            .get(self.document_url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await.map_err(|e| AppError::network(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::Http { status: status.as_u16(), message: error_message(status, &body) });
        }

        let doc: Value = serde_json::from_str(&body).map_err(|_| AppError::MalformedResponse)?;
        let fields = doc.get("fields").and_then(Value::as_object).cloned().unwrap_or_default();
        Ok(Some(Value::Object(from_firestore_fields(&fields))))
    }

    async fn save(&self, path: &str, document: &Value) -> AppResult<()> {
        let map = document
            .as_object()
            .ok_or_else(|| AppError::persistence("Firestore documents must be JSON objects"))?;
        let token = self.auth.id_token().await.map_err(|e| AppError::persistence(e.to_string()))?;

        let response = self.client
            .patch(self.document_url(path))
            .bearer_auth(token)
            .json(&json!({ "fields": to_firestore_fields(map) }))
            .send()
            .await
            .map_err(|e| AppError::persistence(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::persistence(error_message(status, &body)));
        }
        Ok(())
    }
}
