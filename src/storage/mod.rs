//! Durable storage: dump files, response metadata, checkpoints, resumption
//!
//! Layout under the configured user folder:
//!
//! ```text
//! data/<stage>_fetch_controller.json     finished-domains checkpoint
//! data/<stage>_conn_meta_<worker>.json   ndjson response metadata
//! dumps/<domain_key>/dump_<seq>.bin      rotated raw bodies
//! sources/exclude_domains.csv            exclusion list
//! ```

mod checkpoint;
mod dump;
mod resume;

pub use checkpoint::{load_checkpoint, run_checkpoint_writer, save_checkpoint};
pub use dump::{DumpStore, MetaRecord};
pub use resume::{reconcile, ResumeOutcome};

use crate::crawler::Stage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt checkpoint {path}: {message}")]
    CorruptCheckpoint { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Resolved on-disk layout for one stage
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    stage: Stage,
}

impl StorageLayout {
    pub fn new(user_folder: impl AsRef<Path>, stage: Stage) -> Self {
        Self {
            root: user_folder.as_ref().to_path_buf(),
            stage,
        }
    }

    /// Creates the data/dumps/sources directories if absent
    pub fn ensure(&self) -> StorageResult<()> {
        std::fs::create_dir_all(self.data_dir())?;
        std::fs::create_dir_all(self.dumps_dir())?;
        std::fs::create_dir_all(self.sources_dir())?;
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn dumps_dir(&self) -> PathBuf {
        self.root.join("dumps")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn exclusion_file(&self) -> PathBuf {
        self.sources_dir().join("exclude_domains.csv")
    }

    pub fn checkpoint_file(&self) -> PathBuf {
        self.data_dir()
            .join(format!("{}_fetch_controller.json", self.stage.as_str()))
    }

    pub fn checkpoint_tmp(&self) -> PathBuf {
        self.data_dir()
            .join(format!("{}_fetch_controller.json.tmp", self.stage.as_str()))
    }

    /// Filename prefix shared by this stage's metadata files
    pub fn meta_prefix(&self) -> String {
        format!("{}_conn_meta_", self.stage.as_str())
    }

    pub fn meta_file(&self, worker_id: usize) -> PathBuf {
        self.data_dir()
            .join(format!("{}{}.json", self.meta_prefix(), worker_id))
    }

    pub fn domain_dump_dir(&self, dom_tld: &str) -> PathBuf {
        self.dumps_dir().join(dom_tld)
    }

    /// Removes this stage's checkpoint and metadata files (fresh start).
    /// Dump directories are left alone; the metadata files are the index,
    /// and other stages may still reference the same domains.
    pub fn clear_stage(&self) -> StorageResult<()> {
        let _ = std::fs::remove_file(self.checkpoint_file());
        let _ = std::fs::remove_file(self.checkpoint_tmp());

        let data_dir = self.data_dir();
        if data_dir.is_dir() {
            let prefix = self.meta_prefix();
            for entry in std::fs::read_dir(&data_dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(&prefix) && name.ends_with(".json") {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        Ok(())
    }
}
