use crate::config::AppConfig;
use crate::logging;
use crate::session::{ActionResult, KeyStatus, Session};
use crate::view::DashboardView;
use std::sync::Arc;
use tauri::{Emitter, Manager, State};
use tauri_plugin_opener::OpenerExt;
use tokio::sync::mpsc;

/// Every report-state transition is pushed to the webview under this event
pub const REPORT_STATE_EVENT: &str = "report-state";
pub const IDENTITY_EVENT: &str = "identity-changed";

type SessionState<'a> = State<'a, Arc<Session>>;

// ============ App Initialization ============

#[tauri::command]
async fn init_app(session: SessionState<'_>) -> Result<KeyStatus, String> {
    Ok(session.start().await)
}

#[tauri::command]
fn get_dashboard(session: SessionState<'_>) -> DashboardView {
    session.view()
}

// ============ API Key ============

#[tauri::command]
fn set_api_key(session: SessionState<'_>, api_key: String) -> KeyStatus {
    session.set_api_key(&api_key)
}

#[tauri::command]
async fn save_api_key(session: SessionState<'_>) -> Result<KeyStatus, String> {
    session.save_api_key().await.map_err(|e| e.to_string())
}

// ============ Reports ============

#[tauri::command]
async fn generate_report(session: SessionState<'_>, brand: String) -> Result<ActionResult, String> {
    session.set_brand(&brand);
    let result = session.generate().await;
    session.finish(result, false).map_err(String::from)
}

#[tauri::command]
async fn refine_report(session: SessionState<'_>, refinement: String) -> Result<ActionResult, String> {
    let result = session.refine(&refinement).await;
    session.finish(result, false).map_err(String::from)
}

#[tauri::command]
async fn analyze_competitor(session: SessionState<'_>, name: String) -> Result<ActionResult, String> {
    let result = session.select_competitor(&name).await;
    session.finish(result, true).map_err(String::from)
}

#[tauri::command]
fn load_more_articles(session: SessionState<'_>) -> DashboardView {
    session.load_more_articles()
}

#[tauri::command]
fn load_more_social(session: SessionState<'_>) -> DashboardView {
    session.load_more_social()
}

// ============ Links ============

#[tauri::command]
fn open_link(app_handle: tauri::AppHandle, url: String) -> Result<(), String> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(format!("Refusing to open non-web link: {}", url));
    }
    app_handle.opener().open_url(url, None::<&str>).map_err(|e| e.to_string())
}

// ============ Run ============

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let config = AppConfig::from_env();
            if let Err(e) = logging::init_logging(&config.log_dir) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            if let Ok(removed) = logging::cleanup_old_logs(&config.log_dir) {
                if removed > 0 {
                    logging::log_report(&format!("Removed {} old log files", removed));
                }
            }

            let (tx, mut rx) = mpsc::unbounded_channel();
            let session = Session::from_config(config, Some(tx))?;
            let mut identities = session.identity_changes();
            app.manage(Arc::new(session));

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while identities.changed().await.is_ok() {
                    let identity = identities.borrow_and_update().clone();
                    if let Err(e) = handle.emit(IDENTITY_EVENT, &identity) {
                        logging::log_error(None, &format!("Failed to emit identity change: {}", e));
                    }
                }
            });

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while let Some(state) = rx.recv().await {
                    if let Err(e) = handle.emit(REPORT_STATE_EVENT, &state) {
                        logging::log_error(None, &format!("Failed to emit report state: {}", e));
                    }
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            init_app,
            get_dashboard,
            set_api_key,
            save_api_key,
            generate_report,
            refine_report,
            analyze_competitor,
            load_more_articles,
            load_more_social,
            open_link,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
