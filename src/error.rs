//! Error taxonomy shared by every component.
//!
//! Display strings are what the dashboard shows, so keep them short and
//! user-facing. Detail for logs lives in the variant payloads.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Please provide an API key.")]
    MissingApiKey,

    #[error("Please enter a brand name.")]
    MissingBrand,

    #[error("Please enter a topic to refine the report.")]
    MissingRefinement,

    /// Non-success HTTP status from the gateway
    #[error("API Error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Response blocked for safety reasons.")]
    SafetyBlocked,

    #[error("Invalid response structure from Gemini.")]
    MalformedResponse,

    /// Extraction output that is not valid report JSON
    #[error("Could not parse the analysis: {0}")]
    JsonParse(String),

    #[error("Failed to save API key.")]
    PersistenceFailed(String),

    #[error("Identity unavailable; stored credentials are disabled.")]
    IdentityUnavailable,

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A report is already being generated.")]
    RequestInFlight,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn persistence(detail: impl Into<String>) -> Self {
        Self::PersistenceFailed(detail.into())
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network(detail.into())
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    /// Validation errors are caught before any network call and go back to
    /// the caller rather than into the dashboard.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingApiKey
                | AppError::MissingBrand
                | AppError::MissingRefinement
                | AppError::RequestInFlight
        )
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::PersistenceFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonParse(err.to_string())
    }
}
