use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::modules::errors::{StoreError, UpdateError};
use crate::modules::graph::Mutation;
use crate::modules::serialize::{load_state, save_state};
use crate::modules::types::{ConfigState, Robot, Settings};

pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// The single authoritative copy of the configuration.
///
/// Readers get the last committed snapshot and never wait on a writer.
/// Writers are serialized: a mutation is validated against a private copy,
/// persisted, and only then published.
pub struct ConfigStore {
    path: PathBuf,
    persist_timeout: Duration,
    created: bool,
    committed: RwLock<Arc<ConfigState>>,
    writer: Mutex<()>,
}

impl ConfigStore {
    /// Loads `path`, or writes the defaults there if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, DEFAULT_PERSIST_TIMEOUT).await
    }

    pub async fn open_with_timeout(
        path: impl Into<PathBuf>,
        persist_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let loaded = load_state(&path).await?;
        let created = loaded.is_none();
        let state = match loaded {
            Some(state) => {
                state
                    .check_invariants()
                    .map_err(|reason| StoreError::Invalid {
                        path: path.clone(),
                        reason,
                    })?;
                info!(
                    "Loaded configuration from {} ({} robots)",
                    path.display(),
                    state.robots.len()
                );
                state
            }
            None => {
                let state = ConfigState::default();
                save_state(&path, &state, persist_timeout).await?;
                info!("Created default configuration at {}", path.display());
                state
            }
        };

        Ok(Self {
            path,
            persist_timeout,
            created,
            committed: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `open` found no file and wrote the defaults.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn snapshot(&self) -> Arc<ConfigState> {
        let guard = self
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn get_settings(&self) -> Settings {
        self.snapshot().settings.clone()
    }

    pub fn get_robots(&self) -> Vec<Robot> {
        self.snapshot().robots.clone()
    }

    /// Applies one mutation all-or-nothing and returns the state it produced.
    ///
    /// The new state is on disk before it becomes visible to readers. If the
    /// mutation is rejected or the write fails, the committed state is untouched.
    pub async fn apply(&self, mutation: Mutation) -> Result<Arc<ConfigState>, UpdateError> {
        let _writer = self.writer.lock().await;

        let mut next = ConfigState::clone(&self.snapshot());
        if let Err(err) = next.apply(&mutation) {
            warn!("Rejected {mutation}: {err}");
            return Err(err);
        }

        if let Err(err) = save_state(&self.path, &next, self.persist_timeout).await {
            error!("Failed to persist {mutation}: {err}");
            return Err(err.into());
        }

        let next = Arc::new(next);
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        info!("Committed {mutation}");
        Ok(next)
    }
}
