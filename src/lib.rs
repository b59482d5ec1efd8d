//! Brandscope: AI brand-intelligence reports
//!
//! A report cycle makes two Gemini calls, a web-search-backed research pass
//! and a schema-constrained extraction pass, and renders the result as a
//! dashboard. The user's Gemini key is stored per anonymous identity.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod firebase;
pub mod gemini;
pub mod identity;
pub mod logging;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod session;
pub mod view;

#[cfg(feature = "desktop")]
mod desktop;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use orchestrator::{Phase, ReportOrchestrator, ReportState};
pub use report::Report;
pub use session::Session;
pub use view::{render, DashboardView};

#[cfg(feature = "desktop")]
pub use desktop::run;
