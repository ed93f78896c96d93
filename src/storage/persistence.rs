//! World state persistence layer
//!
//! Provides save/load functionality for every ledger's committed state.

use crate::host::WorldState;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            state_file: "world_state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// World state storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        if config.backup_enabled && config.max_backups == 0 {
            return Err(StorageError::InvalidData(
                "max_backups must be at least 1 when backups are enabled".to_string(),
            ));
        }
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// Save the world state, keeping the previous file as backup 0
    pub fn save(&self, world: &WorldState) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && path.exists() {
            self.shift_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Readers only ever see a complete file
        let staging = path.with_extension("tmp");
        save_to_file(world, &staging)?;
        fs::rename(&staging, &path)?;

        log::debug!(
            "Saved {} ledgers (nonce {}) to {:?}",
            world.ledgers.len(),
            world.nonce,
            path
        );
        Ok(())
    }

    /// Load the world state from disk
    pub fn load(&self) -> Result<WorldState, StorageError> {
        let path = self.state_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(format!(
                "no world state at {}",
                path.display()
            )));
        }

        load_from_file(&path)
    }

    /// Check if a saved world state exists
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Move backup `i` to `i + 1`; the last one falls off
    fn shift_backups(&self) -> Result<(), StorageError> {
        let last = self.config.max_backups - 1;
        for index in (0..=last).rev() {
            let from = self.backup_path(index);
            if !from.exists() {
                continue;
            }
            if index == last {
                fs::remove_file(&from)?;
            } else {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        Ok(())
    }

    /// Read backup `index` (0 is the most recent)
    pub fn restore_backup(&self, index: usize) -> Result<WorldState, StorageError> {
        let path = self.backup_path(index);
        if !path.exists() {
            return Err(StorageError::InvalidData(format!("no backup #{}", index)));
        }
        load_from_file(&path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|&i| self.backup_path(i).exists())
            .collect()
    }
}

/// Save world state to a specific file path
pub fn save_to_file(world: &WorldState, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, world)?;
    Ok(())
}

/// Load world state from a specific file path
pub fn load_from_file(path: &Path) -> Result<WorldState, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
