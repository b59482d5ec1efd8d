//! Environment-level configuration
//!
//! Everything is read once at startup. Only presence is checked; a malformed
//! optional value is logged and falls back to its default.

use crate::logging;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

/// Firebase web config, as exported from the Firebase console
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    #[serde(default)]
    pub auth_domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_id: String,
    /// Deployment-wide key; bypasses the stored credential when set
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub request_timeout: Duration,
    /// None means offline mode: local SQLite backend
    pub firebase: Option<FirebaseConfig>,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from any variable lookup (process env in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = match non_empty("BRANDSCOPE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    logging::log_error(None, &format!("Ignoring invalid BRANDSCOPE_REQUEST_TIMEOUT_SECS: {}", raw));
                    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let firebase = non_empty("FIREBASE_CONFIG").and_then(|raw| parse_firebase_config(&raw));
        if firebase.is_none() {
            logging::log_auth(None, "Firebase config is missing. Running in offline mode.");
        }

        let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());

        Self {
            app_id: non_empty("BRANDSCOPE_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: non_empty("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            request_timeout,
            firebase,
            data_dir: non_empty("BRANDSCOPE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&home).join("Library/Application Support/Brandscope")),
            log_dir: non_empty("BRANDSCOPE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&home).join("Library/Logs/Brandscope")),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("brandscope.db")
    }
}

fn parse_firebase_config(raw: &str) -> Option<FirebaseConfig> {
    match serde_json::from_str::<FirebaseConfig>(raw) {
        Ok(cfg) if !cfg.api_key.is_empty() && !cfg.project_id.is_empty() => Some(cfg),
        Ok(_) => {
            logging::log_error(None, "FIREBASE_CONFIG is missing apiKey or projectId");
            None
        }
        Err(e) => {
            logging::log_error(None, &format!("Firebase initialization error: {}", e));
            None
        }
    }
}
