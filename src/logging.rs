//! Structured logging module for Brandscope
//!
//! Writes daily log files (default ~/Library/Logs/Brandscope/) with categories:
//! - AUTH: Anonymous identity bootstrap
//! - CREDENTIAL: API key load/save
//! - GATEWAY: Gemini requests and failures
//! - REPORT: Report cycle transitions
//! - ERROR: Errors

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub enum LogCategory {
    Auth,
    Credential,
    Gateway,
    Report,
    Error,
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Auth => "AUTH",
            LogCategory::Credential => "CREDENTIAL",
            LogCategory::Gateway => "GATEWAY",
            LogCategory::Report => "REPORT",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Active log directory; None until `init_logging` runs
static LOG_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("brandscope-{}.log", today))
}

/// Initialize the logging system - creates log directory if needed
pub fn init_logging(log_dir: &Path) -> std::io::Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    if let Ok(mut dir) = LOG_DIR.lock() {
        *dir = Some(log_dir.to_path_buf());
    }

    log(LogCategory::Report, None, "Brandscope logging initialized");
    Ok(())
}

pub(crate) fn format_line(category: LogCategory, owner_id: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let owner_context = owner_id
        .map(|id| {
            let short: String = id.chars().take(8).collect();
            format!("owner={} | ", short)
        })
        .unwrap_or_default();

    format!("[{}] [{}] {}{}\n", timestamp, category.as_str(), owner_context, message)
}

/// Log a message with category and optional identity context
pub fn log(category: LogCategory, owner_id: Option<&str>, message: &str) {
    let line = format_line(category, owner_id, message);

    print!("{}", line);

    let dir = LOG_DIR.lock().ok().and_then(|d| d.clone());
    if let Some(dir) = dir {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path(&dir))
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

pub fn log_auth(owner_id: Option<&str>, message: &str) {
    log(LogCategory::Auth, owner_id, message);
}

pub fn log_credential(owner_id: Option<&str>, message: &str) {
    log(LogCategory::Credential, owner_id, message);
}

pub fn log_gateway(message: &str) {
    log(LogCategory::Gateway, None, message);
}

pub fn log_report(message: &str) {
    log(LogCategory::Report, None, message);
}

pub fn log_error(owner_id: Option<&str>, message: &str) {
    log(LogCategory::Error, owner_id, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs(log_dir: &Path) -> std::io::Result<usize> {
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(7);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            let modified_time: chrono::DateTime<Utc> = modified.into();
            if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}
