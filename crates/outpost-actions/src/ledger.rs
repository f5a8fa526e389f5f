//! Persistent task ledger.
//!
//! Tasks of persistent actions are written to `<state dir>/tasks.json` while
//! they run and removed when they finish. Entries still present at startup
//! belong to tasks the previous agent process never finished; the dispatcher
//! resumes them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const LEDGER_FILE: &str = "tasks.json";

/// One unfinished persistent task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub method: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, serde_json::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(serde_json::Error),
}

/// Cloning is cheap and shares the same entries.
///
/// Updates hold the lock until the file is written, so writes land on disk
/// in the order the updates were made.
#[derive(Clone, Default)]
pub struct TaskLedger {
    /// None keeps the ledger in memory only.
    path: Option<PathBuf>,
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl TaskLedger {
    /// Ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or start) the ledger in `state_dir`.
    pub async fn open(state_dir: &Path) -> Result<Self, LedgerError> {
        let path = state_dir.join(LEDGER_FILE);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| LedgerError::ParseFailed(path.clone(), e))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(LedgerError::ReadFailed(path, e)),
        };
        Ok(Self {
            path: Some(path),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().await.clone()
    }

    /// Add an entry. Re-recording an id already present is a no-op.
    pub async fn record(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Ok(());
        }
        entries.push(entry);
        self.persist(&entries).await
    }

    /// Drop the entry for `id`, if any.
    pub async fn remove(&self, id: &str) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(());
        }
        self.persist(&entries).await
    }

    /// Write through a temp file so a crash never leaves a torn ledger.
    async fn persist(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::WriteFailed(path.clone(), e))?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(LedgerError::SerializeFailed)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| LedgerError::WriteFailed(tmp.clone(), e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| LedgerError::WriteFailed(path.clone(), e))
    }
}
