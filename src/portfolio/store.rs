//! Portfolio snapshot persistence
//!
//! The snapshot is a single JSON document holding capital and the open
//! positions. Writes go to a sibling temporary file that is renamed over
//! the snapshot, so a crash never leaves a half-written file behind.

use chrono::Utc;
use rust_decimal::Decimal;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use super::PortfolioState;

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot decode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Durable home of the portfolio state
pub trait PositionStore: Send + Sync {
    /// Load the persisted state, falling back to a fresh one
    ///
    /// Never fails: missing or malformed data yields the default state.
    fn load(&self) -> PortfolioState;

    /// Persist the full state
    fn save(&self, state: &PortfolioState) -> Result<(), StoreError>;
}

/// JSON file store with atomic replace
pub struct JsonFileStore {
    path: PathBuf,
    default_capital: Decimal,
}

impl JsonFileStore {
    /// Create a store for `path`, using `default_capital` on cold start
    pub fn new(path: impl Into<PathBuf>, default_capital: Decimal) -> Self {
        Self {
            path: path.into(),
            default_capital,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the snapshot
    ///
    /// `Ok(None)` means there is no snapshot yet.
    pub fn read_snapshot(&self) -> Result<Option<PortfolioState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: PortfolioState = serde_json::from_str(&content)?;
        state.check_invariants().map_err(StoreError::Invalid)?;
        Ok(Some(state))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Move an unreadable snapshot aside so the next save does not erase it
    fn quarantine(&self) {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d_%H%M%S")));
        let target = PathBuf::from(name);
        match fs::rename(&self.path, &target) {
            Ok(()) => tracing::warn!(path = ?target, "Moved unreadable snapshot aside"),
            Err(e) => tracing::warn!(error = %e, "Could not move unreadable snapshot aside"),
        }
    }
}

impl PositionStore for JsonFileStore {
    fn load(&self) -> PortfolioState {
        match self.read_snapshot() {
            Ok(Some(state)) => {
                tracing::info!(
                    path = ?self.path,
                    capital = %state.capital,
                    open_positions = state.open_count(),
                    "Loaded portfolio snapshot"
                );
                state
            }
            Ok(None) => {
                tracing::info!(path = ?self.path, "No portfolio snapshot, starting fresh");
                PortfolioState::fresh(self.default_capital)
            }
            Err(e) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %e,
                    "Portfolio snapshot unusable, starting fresh"
                );
                if !matches!(e, StoreError::Io(_)) {
                    self.quarantine();
                }
                PortfolioState::fresh(self.default_capital)
            }
        }
    }

    fn save(&self, state: &PortfolioState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec_pretty(state)?;
        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        sync_parent(&self.path)?;

        tracing::debug!(path = ?self.path, open_positions = state.open_count(), "Saved snapshot");
        Ok(())
    }
}

/// Flush the directory entry so the rename itself is durable
#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-memory store, used for dry runs and tests
pub struct MemoryStore {
    default_capital: Decimal,
    saved: Mutex<Option<PortfolioState>>,
}

impl MemoryStore {
    pub fn new(default_capital: Decimal) -> Self {
        Self {
            default_capital,
            saved: Mutex::new(None),
        }
    }

    /// Start from an existing state
    pub fn with_state(state: PortfolioState) -> Self {
        Self {
            default_capital: state.capital,
            saved: Mutex::new(Some(state)),
        }
    }

    /// Last saved state, if any
    pub fn snapshot(&self) -> Option<PortfolioState> {
        self.saved.lock().ok().and_then(|s| s.clone())
    }
}

impl PositionStore for MemoryStore {
    fn load(&self) -> PortfolioState {
        self.snapshot()
            .unwrap_or_else(|| PortfolioState::fresh(self.default_capital))
    }

    fn save(&self, state: &PortfolioState) -> Result<(), StoreError> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| StoreError::Invalid("memory store poisoned".to_string()))?;
        *saved = Some(state.clone());
        Ok(())
    }
}
