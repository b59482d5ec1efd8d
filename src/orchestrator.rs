use crate::error::{AppError, AppResult};
use crate::gemini::{AiGateway, GenerateContentRequest};
use crate::logging;
use crate::prompts::{extraction_prompt, extraction_schema, research_prompt};
use crate::report::Report;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Items shown per list before "Load More", and the increment per click
pub const PAGE_SIZE: usize = 7;

const FAILURE_PREFIX: &str = "Analysis failed. Please try again. Error: ";

// ============ State ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Researching, // call #1 in flight
    Extracting,  // call #2 in flight
    Ready,
    Failed,
}

impl Phase {
    pub fn is_loading(&self) -> bool {
        matches!(self, Phase::Researching | Phase::Extracting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub visible_articles: usize,
    pub visible_social: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { visible_articles: PAGE_SIZE, visible_social: PAGE_SIZE }
    }
}

/// Counters only grow, and only while the list has hidden items
fn grow(counter: usize, total: usize) -> usize {
    if counter < total {
        counter + PAGE_SIZE
    } else {
        counter
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportState {
    pub phase: Phase,
    /// Brand of the current (or last) cycle
    pub brand: String,
    pub refinement: Option<String>,
    pub report: Option<Report>,
    pub error: Option<String>,
    pub pagination: Pagination,
}

impl Default for ReportState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            brand: String::new(),
            refinement: None,
            report: None,
            error: None,
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started { brand: String, refinement: Option<String> },
    ResearchCompleted,
    Completed(Report),
    Failed(String),
    /// Validation error caught before any network call
    Rejected(String),
    LoadMoreArticles,
    LoadMoreSocial,
}

/// The single state-transition function. Events that do not apply to the
/// current phase leave the state unchanged.
pub fn reduce(state: ReportState, event: Event) -> ReportState {
    match event {
        Event::Started { brand, refinement } if !state.phase.is_loading() => ReportState {
            phase: Phase::Researching,
            brand,
            refinement,
            report: None,
            error: None,
            pagination: Pagination::default(),
        },
        Event::ResearchCompleted if state.phase == Phase::Researching => ReportState {
            phase: Phase::Extracting,
            ..state
        },
        Event::Completed(report) if state.phase == Phase::Extracting => ReportState {
            phase: Phase::Ready,
            report: Some(report),
            error: None,
            ..state
        },
        Event::Failed(message) if state.phase.is_loading() => ReportState {
            phase: Phase::Failed,
            report: None,
            error: Some(message),
            ..state
        },
        // A running cycle owns the error slot until it finishes
        Event::Rejected(message) if !state.phase.is_loading() => ReportState { error: Some(message), ..state },
        Event::LoadMoreArticles => {
            let total = state.report.as_ref().map_or(0, |r| r.articles.len());
            let mut pagination = state.pagination;
            pagination.visible_articles = grow(pagination.visible_articles, total);
            ReportState { pagination, ..state }
        }
        Event::LoadMoreSocial => {
            let total = state.report.as_ref().map_or(0, |r| r.social_discussions.len());
            let mut pagination = state.pagination;
            pagination.visible_social = grow(pagination.visible_social, total);
            ReportState { pagination, ..state }
        }
        _ => state,
    }
}

// ============ Orchestrator ============

/// Runs the research → extraction sequence and owns the report state
pub struct ReportOrchestrator {
    gateway: Arc<dyn AiGateway>,
    state: Mutex<ReportState>,
    listener: Option<mpsc::UnboundedSender<ReportState>>,
}

impl ReportOrchestrator {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway, state: Mutex::new(ReportState::default()), listener: None }
    }

    /// Every state produced by `reduce` is also sent to `listener`
    pub fn with_listener(mut self, listener: mpsc::UnboundedSender<ReportState>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn state(&self) -> ReportState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn publish(&self, state: &ReportState) {
        if let Some(listener) = &self.listener {
            let _ = listener.send(state.clone());
        }
    }

    pub fn dispatch(&self, event: Event) -> ReportState {
        let next = {
            let mut guard = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let next = reduce(std::mem::take(&mut *guard), event);
            *guard = next.clone();
            next
        };
        self.publish(&next);
        next
    }

    /// Check-and-start under one lock so overlapping cycles cannot both begin
    fn begin(&self, brand: &str, refinement: Option<String>) -> AppResult<()> {
        let next = {
            let mut guard = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if guard.phase.is_loading() {
                return Err(AppError::RequestInFlight);
            }
            let next = reduce(
                std::mem::take(&mut *guard),
                Event::Started { brand: brand.to_string(), refinement },
            );
            *guard = next.clone();
            next
        };
        self.publish(&next);
        Ok(())
    }

    fn reject(&self, err: AppError) -> AppError {
        self.dispatch(Event::Rejected(err.to_string()));
        err
    }

    fn fail(&self, err: AppError) -> AppError {
        logging::log_error(None, &format!("Report cycle failed: {}", err));
        self.dispatch(Event::Failed(format!("{}{}", FAILURE_PREFIX, err)));
        err
    }

    pub async fn generate(&self, api_key: &str, brand: &str, refinement: Option<&str>) -> AppResult<Report> {
        self.generate_on(api_key, brand, refinement, Local::now().date_naive()).await
    }

    /// `generate` with an explicit "today" for the lookback bound
    pub async fn generate_on(
        &self,
        api_key: &str,
        brand: &str,
        refinement: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<Report> {
        let brand = brand.trim();
        if api_key.trim().is_empty() {
            return Err(self.reject(AppError::MissingApiKey));
        }
        if brand.is_empty() {
            return Err(self.reject(AppError::MissingBrand));
        }
        let refinement = refinement.map(str::trim).filter(|r| !r.is_empty());

        self.begin(brand, refinement.map(str::to_string))?;
        logging::log_report(&format!(
            "Researching \"{}\"{}",
            brand,
            refinement.map(|r| format!(" (refined: {})", r)).unwrap_or_default()
        ));

        let research_request = GenerateContentRequest::prompt(research_prompt(brand, refinement, today)).with_search();
        let research = match self.gateway.send(api_key, &research_request).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(e)),
        };

        self.dispatch(Event::ResearchCompleted);
        logging::log_report(&format!("Extracting report for \"{}\" from {} chars of research", brand, research.len()));

        let extraction_request =
            GenerateContentRequest::prompt(extraction_prompt(brand, &research)).with_json_schema(extraction_schema());
        let raw = match self.gateway.send(api_key, &extraction_request).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(e)),
        };

        let report = match Report::parse(&raw) {
            Ok(report) => report,
            Err(e) => return Err(self.fail(e)),
        };

        if !report.sentiment.is_balanced() {
            logging::log_report(&format!("Sentiment values sum to {}, not 100", report.sentiment.total()));
        }

        self.dispatch(Event::Completed(report.clone()));
        logging::log_report(&format!(
            "Report ready for \"{}\": {} articles, {} social posts, {} competitors",
            brand,
            report.articles.len(),
            report.social_discussions.len(),
            report.competitors.len()
        ));
        Ok(report)
    }

    pub fn load_more_articles(&self) -> ReportState {
        self.dispatch(Event::LoadMoreArticles)
    }

    pub fn load_more_social(&self) -> ReportState {
        self.dispatch(Event::LoadMoreSocial)
    }
}
