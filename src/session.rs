use crate::config::AppConfig;
use crate::credentials::{CredentialStore, DocumentStore};
use crate::db::{Database, LocalAuth, SqliteDocumentStore};
use crate::error::{AppError, AppResult};
use crate::firebase::{FirebaseAuth, FirestoreStore};
use crate::gemini::{AiGateway, GeminiClient};
use crate::identity::{AuthProvider, Identity, IdentityBootstrap};
use crate::logging;
use crate::orchestrator::{ReportOrchestrator, ReportState};
use crate::report::Report;
use crate::view::{render, DashboardView};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// API key input state as the settings bar shows it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyStatus {
    pub has_key: bool,
    pub saved: bool,
    pub loading: bool,
    pub identity_available: bool,
    pub message: Option<String>,
}

#[derive(Debug, Default)]
struct Inputs {
    api_key: String,
    key_saved: bool,
    key_loading: bool,
    key_message: Option<String>,
    brand: String,
    refinement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub dashboard: DashboardView,
    pub key: KeyStatus,
    /// Input boxes as the session sees them; competitor clicks rewrite both
    pub brand: String,
    pub refinement: String,
    /// Competitor navigation asks the shell to scroll back to the top
    pub scroll_to_top: bool,
}

/// Application object: identity, credential, inputs, and the report cycle
pub struct Session {
    config: AppConfig,
    identity: IdentityBootstrap,
    credentials: CredentialStore,
    orchestrator: ReportOrchestrator,
    inputs: Mutex<Inputs>,
}

impl Session {
    pub fn new(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn AiGateway>,
    ) -> Self {
        Self::with_orchestrator(config, auth, store, ReportOrchestrator::new(gateway))
    }

    pub fn with_orchestrator(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        orchestrator: ReportOrchestrator,
    ) -> Self {
        let inputs = Inputs {
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            key_saved: config.gemini_api_key.is_some(),
            key_loading: true,
            ..Inputs::default()
        };
        Self {
            credentials: CredentialStore::new(store, &config.app_id),
            identity: IdentityBootstrap::new(auth),
            orchestrator,
            inputs: Mutex::new(inputs),
            config,
        }
    }

    /// Wire up production collaborators from config: Firebase when
    /// configured, otherwise the local SQLite backend.
    pub fn from_config(config: AppConfig, listener: Option<mpsc::UnboundedSender<ReportState>>) -> AppResult<Self> {
        let db = Arc::new(Database::open(&config.database_path())?);

        let (auth, store): (Arc<dyn AuthProvider>, Arc<dyn DocumentStore>) = match &config.firebase {
            Some(fb) => {
                let auth = Arc::new(FirebaseAuth::new(fb.clone(), db.clone())?);
                let store = Arc::new(FirestoreStore::new(&fb.project_id, auth.clone())?);
                (auth, store)
            }
            None => (
                Arc::new(LocalAuth::new(db.clone())),
                Arc::new(SqliteDocumentStore::new(db.clone())),
            ),
        };

        let gateway = Arc::new(GeminiClient::new(
            &config.gemini_api_base,
            &config.gemini_model,
            config.request_timeout,
        )?);
        let mut orchestrator = ReportOrchestrator::new(gateway);
        if let Some(tx) = listener {
            orchestrator = orchestrator.with_listener(tx);
        }

        Ok(Self::with_orchestrator(config, auth, store, orchestrator))
    }

    fn with_inputs<T>(&self, f: impl FnOnce(&mut Inputs) -> T) -> T {
        let mut guard = match self.inputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    /// Notified whenever the bootstrap publishes an identity
    pub fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Startup: bootstrap identity and load the stored key. A deployment key
    /// from the environment skips the stored credential entirely.
    pub async fn start(&self) -> KeyStatus {
        let identity = match self.identity.start().await {
            Ok(identity) => Some(identity),
            Err(_) => {
                logging::log_auth(None, "Running without identity; stored credentials disabled");
                None
            }
        };

        if self.config.gemini_api_key.is_none() {
            if let Some(identity) = &identity {
                if let Some(key) = self.credentials.load(&identity.id).await {
                    self.with_inputs(|i| {
                        i.api_key = key;
                        i.key_saved = true;
                    });
                }
            }
        }

        self.with_inputs(|i| i.key_loading = false);
        self.key_status()
    }

    pub fn key_status(&self) -> KeyStatus {
        let identity_available = self.identity.current().is_some();
        self.with_inputs(|i| KeyStatus {
            has_key: !i.api_key.trim().is_empty(),
            saved: i.key_saved,
            loading: i.key_loading,
            identity_available,
            message: i.key_message.clone(),
        })
    }

    /// Editing the key marks it unsaved
    pub fn set_api_key(&self, input: &str) -> KeyStatus {
        self.with_inputs(|i| {
            i.api_key = input.to_string();
            i.key_saved = false;
            i.key_message = None;
        });
        self.key_status()
    }

    pub async fn save_api_key(&self) -> AppResult<KeyStatus> {
        let key = self.with_inputs(|i| i.api_key.clone());
        if key.trim().is_empty() {
            return Err(AppError::MissingApiKey);
        }
        let identity = self.identity.current().ok_or(AppError::IdentityUnavailable)?;

        match self.credentials.save(&identity.id, key.trim()).await {
            Ok(()) => {
                self.with_inputs(|i| {
                    i.key_saved = true;
                    i.key_message = None;
                });
                Ok(self.key_status())
            }
            Err(e) => {
                self.with_inputs(|i| {
                    i.key_saved = false;
                    i.key_message = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    pub fn set_brand(&self, brand: &str) {
        self.with_inputs(|i| i.brand = brand.to_string());
    }

    pub fn set_refinement(&self, refinement: &str) {
        self.with_inputs(|i| i.refinement = refinement.to_string());
    }

    fn api_key(&self) -> String {
        self.with_inputs(|i| i.api_key.trim().to_string())
    }

    /// Run a fresh report for the brand input, without refinement
    pub async fn generate(&self) -> AppResult<Report> {
        let brand = self.with_inputs(|i| i.brand.clone());
        self.orchestrator.generate(&self.api_key(), &brand, None).await
    }

    /// Re-run both calls for the brand last analyzed with a refinement topic
    pub async fn refine(&self, refinement: &str) -> AppResult<Report> {
        if refinement.trim().is_empty() {
            return Err(AppError::MissingRefinement);
        }
        self.set_refinement(refinement);
        let brand = self.orchestrator.state().brand;
        self.orchestrator.generate(&self.api_key(), &brand, Some(refinement)).await
    }

    /// Switch to a listed competitor: brand input follows, refinement clears
    pub async fn select_competitor(&self, name: &str) -> AppResult<Report> {
        self.with_inputs(|i| {
            i.brand = name.to_string();
            i.refinement.clear();
        });
        self.orchestrator.generate(&self.api_key(), name, None).await
    }

    pub fn load_more_articles(&self) -> DashboardView {
        self.orchestrator.load_more_articles();
        self.view()
    }

    pub fn load_more_social(&self) -> DashboardView {
        self.orchestrator.load_more_social();
        self.view()
    }

    pub fn view(&self) -> DashboardView {
        let saved = self.with_inputs(|i| i.key_saved);
        render(&self.orchestrator.state(), saved)
    }

    pub fn action_result(&self, scroll_to_top: bool) -> ActionResult {
        let (brand, refinement) = self.with_inputs(|i| (i.brand.clone(), i.refinement.clone()));
        ActionResult { dashboard: self.view(), key: self.key_status(), brand, refinement, scroll_to_top }
    }

    /// Map a cycle outcome for the shell. Validation errors go back to the
    /// caller; cycle failures are already on the dashboard.
    pub fn finish(&self, result: AppResult<Report>, scroll_to_top: bool) -> AppResult<ActionResult> {
        match result {
            Err(e) if e.is_validation() => Err(e),
            _ => Ok(self.action_result(scroll_to_top)),
        }
    }
}
