//! Shared application state: installable storage/bank handles and the
//! session lifecycle machine.

/// Session lifecycle statuses and transition rules.
pub mod session_machine;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::config::AppConfig;
use crate::dao::bank::QuestionBank;
use crate::dao::store::GameStore;
use crate::error::ServiceError;

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the storage and question bank handles.
///
/// Both handles are installable after startup; until both are present the
/// application reports degraded mode and the engines refuse to operate.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn GameStore>>>,
    bank: RwLock<Option<Arc<dyn QuestionBank>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts degraded until a store and a bank are
    /// installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            bank: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Engine tuning configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Install the persistence backend.
    pub async fn install_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.refresh_degraded().await;
    }

    /// Install the question bank.
    pub async fn install_bank(&self, bank: Arc<dyn QuestionBank>) {
        {
            let mut guard = self.bank.write().await;
            *guard = Some(bank);
        }
        self.refresh_degraded().await;
    }

    /// Obtain the persistence backend, or a degraded-mode error.
    pub async fn require_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        let guard = self.store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Obtain the question bank, or a degraded-mode error.
    pub async fn require_bank(&self) -> Result<Arc<dyn QuestionBank>, ServiceError> {
        let guard = self.bank.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Whether either collaborator is still missing.
    pub async fn is_degraded(&self) -> bool {
        let store = self.store.read().await;
        let bank = self.bank.read().await;
        store.is_none() || bank.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Recompute and broadcast the degraded flag.
    async fn refresh_degraded(&self) {
        let value = self.is_degraded().await;
        let _ = self.degraded.send(value);
    }
}
