use std::{fs, path::Path};

use log::debug;
use neural_net::training::EpochStats;
use serde::{Deserialize, Serialize};

use crate::Result;

/// The file the training history is flushed to inside a run folder.
pub const HISTORY_FILE: &str = "history.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
}

/// Keeps the per-epoch losses of a training run in memory until a run folder exists to write
/// them to.
#[derive(Debug, Clone, Default)]
pub struct HistoryLogger {
    records: Vec<EpochRecord>,
}

impl HistoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: &EpochStats) {
        self.records.push(EpochRecord {
            epoch: stats.epoch,
            loss: stats.loss,
            val_loss: stats.val_loss,
        });
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Writes every record so far to `folder/history.json`.
    pub fn save_file(&self, folder: &Path) -> Result<()> {
        let path = folder.join(HISTORY_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&self.records)?)?;
        debug!("flushed {} epoch records to {}", self.records.len(), path.display());
        Ok(())
    }
}
