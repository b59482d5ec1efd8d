//! Anonymous identity bootstrap
//!
//! On startup the app needs a stable, opaque id to namespace stored
//! credentials. If the auth backend has none, one anonymous sign-in is
//! attempted. Failure is not fatal: dependents run with no identity and the
//! credential store reports itself unavailable.

use crate::error::{AppError, AppResult};
use crate::logging;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// External auth collaborator
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Identity restored from a previous session, if any
    async fn current_identity(&self) -> AppResult<Option<Identity>>;

    async fn sign_in_anonymously(&self) -> AppResult<Identity>;
}

pub struct IdentityBootstrap {
    auth: Arc<dyn AuthProvider>,
    tx: watch::Sender<Option<Identity>>,
}

impl IdentityBootstrap {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { auth, tx }
    }

    /// Identity-change notifications for dependents
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Single attempt per app load; no retry
    pub async fn start(&self) -> AppResult<Identity> {
        match self.auth.current_identity().await {
            Ok(Some(identity)) => {
                logging::log_auth(Some(&identity.id), "Restored existing identity");
                self.publish(identity.clone());
                return Ok(identity);
            }
            Ok(None) => {}
            Err(e) => {
                logging::log_error(None, &format!("Identity lookup failed: {}", e));
            }
        }

        match self.auth.sign_in_anonymously().await {
            Ok(identity) => {
                logging::log_auth(Some(&identity.id), "Anonymous sign-in succeeded");
                self.publish(identity.clone());
                Ok(identity)
            }
            Err(e) => {
                logging::log_error(None, &format!("Anonymous sign-in error: {}", e));
                Err(AppError::IdentityUnavailable)
            }
        }
    }

    fn publish(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted auth backend for tests
    pub struct ScriptedAuth {
        pub existing: Mutex<Option<Identity>>,
        pub fail_sign_in: bool,
        pub sign_ins: AtomicUsize,
    }

    impl ScriptedAuth {
        pub fn empty() -> Self {
            Self { existing: Mutex::new(None), fail_sign_in: false, sign_ins: AtomicUsize::new(0) }
        }

        pub fn failing() -> Self {
            Self { fail_sign_in: true, ..Self::empty() }
        }

        pub fn with_existing(id: &str) -> Self {
            Self { existing: Mutex::new(Some(Identity::new(id))), ..Self::empty() }
        }
    }

    #[async_trait]
    impl AuthProvider for ScriptedAuth {
        async fn current_identity(&self) -> AppResult<Option<Identity>> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn sign_in_anonymously(&self) -> AppResult<Identity> {
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_in {
                return Err(AppError::network("admin-restricted-operation"));
            }
            let identity = Identity::new("anon-1234567890");
            *self.existing.lock().unwrap() = Some(identity.clone());
            Ok(identity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedAuth;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_signs_in_when_absent() {
        let auth = Arc::new(ScriptedAuth::empty());
        let bootstrap = IdentityBootstrap::new(auth.clone());
        let mut rx = bootstrap.subscribe();

        let identity = bootstrap.start().await.unwrap();
        assert_eq!(identity.id, "anon-1234567890");
        assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), Some(identity));
    }

    #[tokio::test]
    async fn test_restores_existing_without_sign_in() {
        let auth = Arc::new(ScriptedAuth::with_existing("returning-user"));
        let bootstrap = IdentityBootstrap::new(auth.clone());

        let identity = bootstrap.start().await.unwrap();
        assert_eq!(identity.id, "returning-user");
        assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 0);
        assert_eq!(bootstrap.current(), Some(identity));
    }

    #[tokio::test]
    async fn test_failure_is_single_attempt_and_non_fatal() {
        let auth = Arc::new(ScriptedAuth::failing());
        let bootstrap = IdentityBootstrap::new(auth.clone());

        let err = bootstrap.start().await.unwrap_err();
        assert_eq!(err, AppError::IdentityUnavailable);
        assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);
        assert!(bootstrap.current().is_none());
    }
}
