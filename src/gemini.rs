use crate::error::{AppError, AppResult};
use crate::logging;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SAFETY_FINISH_REASON: &str = "SAFETY";
const CONNECT_TIMEOUT_SECS: u64 = 10;

// ============ Request Payload ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Grounding tool that lets the model run web searches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    pub google_search: serde_json::Map<String, serde_json::Value>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self { google_search: serde_json::Map::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single-turn prompt with no tools or output constraints
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content { parts: vec![Part { text: text.into() }] }],
            tools: None,
            generation_config: None,
        }
    }

    pub fn with_search(mut self) -> Self {
        self.tools = Some(vec![Tool::google_search()]);
        self
    }

    /// Constrain output to JSON matching `schema`
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        self
    }

    pub fn prompt_text(&self) -> Option<&str> {
        self.contents.first()?.parts.first().map(|p| p.text.as_str())
    }
}

// ============ Response Payload ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Map a raw gateway response to extracted text or a failure signal
pub fn interpret_response(status: StatusCode, body: &str) -> AppResult<String> {
    if !status.is_success() {
        let message = match serde_json::from_str::<GeminiError>(body) {
            Ok(parsed) => parsed.error.message,
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        };
        return Err(AppError::Http { status: status.as_u16(), message });
    }

    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|_| AppError::MalformedResponse)?;

    let candidate = response.candidates.first();
    if candidate.and_then(|c| c.finish_reason.as_deref()) == Some(SAFETY_FINISH_REASON) {
        return Err(AppError::SafetyBlocked);
    }

    candidate
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.clone())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MalformedResponse)
}

// ============ Gateway ============

/// Sends one generateContent payload and returns the first candidate's text
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn send(&self, api_key: &str, request: &GenerateContentRequest) -> AppResult<String>;
}

pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn post_once(&self, api_key: &str, request: &GenerateContentRequest) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self.client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Connect failures and timeouts get exactly one more attempt
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

#[async_trait]
impl AiGateway for GeminiClient {
    async fn send(&self, api_key: &str, request: &GenerateContentRequest) -> AppResult<String> {
        let started = std::time::Instant::now();

        let (status, body) = match self.post_once(api_key, request).await {
            Ok(ok) => ok,
            Err(e) if is_transient(&e) => {
                logging::log_gateway(&format!("Transient failure, retrying once: {}", e));
                self.post_once(api_key, request)
                    .await
                    .map_err(|e| AppError::network(e.to_string()))?
            }
            Err(e) => return Err(AppError::network(e.to_string())),
        };

        logging::log_gateway(&format!(
            "{} responded {} in {}ms ({} bytes)",
            self.model,
            status.as_u16(),
            started.elapsed().as_millis(),
            body.len()
        ));

        interpret_response(status, &body).inspect_err(|e| {
            logging::log_error(None, &format!("Gemini API call failed: {}", e));
        })
    }
}
