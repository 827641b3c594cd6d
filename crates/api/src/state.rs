//! Shared application state for the Axum server.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use merger_common::config::AppConfig;
use merger_common::error::AppError;
use merger_engine::allocation::AllocationConfig;
use merger_engine::view::{AllocationView, RawViewInputs, Side, ViewInputs};
use merger_loader::DataLoader;

/// Input change forwarded to a mounted live view.
#[derive(Debug, Clone)]
pub enum ViewCommand {
    SetAmount { side: Side, text: String },
}

/// Command senders for every live view currently mounted, keyed by view id.
#[derive(Default)]
pub struct LiveViews {
    views: Mutex<HashMap<Uuid, mpsc::Sender<ViewCommand>>>,
}

impl LiveViews {
    pub async fn register(&self, view_id: Uuid, commands: mpsc::Sender<ViewCommand>) {
        self.views.lock().await.insert(view_id, commands);
    }

    pub async fn remove(&self, view_id: &Uuid) {
        self.views.lock().await.remove(view_id);
    }

    /// Forward a command to a mounted view.
    pub async fn send(&self, view_id: &Uuid, command: ViewCommand) -> Result<(), AppError> {
        let sender = self
            .views
            .lock()
            .await
            .get(view_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Live view {} not found", view_id)))?;

        sender
            .send(command)
            .await
            .map_err(|_| AppError::NotFound(format!("Live view {} has been torn down", view_id)))
    }

    /// Number of live views currently mounted.
    pub async fn count(&self) -> usize {
        self.views.lock().await.len()
    }
}

/// Application state shared across all route handlers via Axum `State`.
///
/// Every view builds its own state on mount; live views also register a
/// command channel so input changes reach the running view.
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<DataLoader>,
    pub allocation: AllocationConfig,
    pub config: AppConfig,
    pub live_views: Arc<LiveViews>,
}

impl AppState {
    pub fn new(loader: DataLoader, allocation: AllocationConfig, config: AppConfig) -> Self {
        Self {
            loader: Arc::new(loader),
            allocation,
            config,
            live_views: Arc::new(LiveViews::default()),
        }
    }

    /// Validate the configured allocation and wire up the loader.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let allocation = AllocationConfig::new(
            config.total_new_tokens,
            config.token_a.allocation_fraction,
            config.token_b.allocation_fraction,
        )?;
        let loader = DataLoader::from_config(&config)?;
        Ok(Self::new(loader, allocation, config))
    }

    /// Run the Data Loader once and build a fresh view from the user's inputs.
    pub async fn mount_view(&self, raw: &RawViewInputs) -> Result<AllocationView, AppError> {
        let inputs = ViewInputs::resolve(
            raw,
            self.config.default_amount,
            self.allocation.total_new_tokens(),
        );
        let snapshot = self.loader.load().await;

        AllocationView::new(
            &snapshot,
            self.loader.token_a(),
            self.loader.token_b(),
            self.allocation,
            &inputs,
        )
    }
}
