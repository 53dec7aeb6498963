//! File-backed crash-counter store for headless runs.

use std::fs;
use std::path::PathBuf;

use rackdown_game::CounterStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by [`FileCounter`].
#[derive(Debug, Error)]
pub enum CounterFileError {
    #[error("counter file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("counter file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterSlot {
    crashes: u64,
}

/// Persists the lifetime crash counter as a small JSON file, the
/// filesystem stand-in for the browser's local-storage slot.
#[derive(Debug, Clone)]
pub struct FileCounter {
    path: PathBuf,
}

impl FileCounter {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CounterStore for FileCounter {
    type Error = CounterFileError;

    fn load(&self) -> Result<u64, Self::Error> {
        if !self.path.exists() {
            return Ok(0);
        }
        let raw = fs::read_to_string(&self.path)?;
        let slot: CounterSlot = serde_json::from_str(&raw)?;
        Ok(slot.crashes)
    }

    fn save(&self, count: u64) -> Result<(), Self::Error> {
        let slot = CounterSlot { crashes: count };
        fs::write(&self.path, serde_json::to_string(&slot)?)?;
        Ok(())
    }
}
