//! Persistence layer for the alert configuration.
//!
//! This module provides the [`ConfigStore`] seam and its file-backed
//! implementation [`FileConfigStore`]. The store holds exactly one record,
//! the current [`AlertConfiguration`]; a missing record means no configuration
//! was ever saved.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use mockall::automock;
use tempfile::Builder;
use thiserror::Error;
use tokio::{fs, task};

use crate::alerts::alert::AlertConfiguration;

/// Well-known key under which the configuration record is stored.
pub const CONFIG_KEY: &str = "config";

/// Errors raised when the persistence layer cannot be used.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record could not be read or written.
    #[error("storage unavailable: {0}")]
    Io(#[from] io::Error),
    /// The record could not be encoded or decoded.
    #[error("storage unavailable, unreadable record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Asynchronous storage for the single configuration record.
///
/// Callers go through the [`ConfigGate`](crate::alerts::ConfigGate) so that a
/// `load` never overlaps a `save` within one process.
#[automock]
pub trait ConfigStore {
    /// Loads the stored configuration, `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<AlertConfiguration>, StoreError>;
    /// Replaces the stored configuration.
    async fn save(&self, config: &AlertConfiguration) -> Result<(), StoreError>;
}

/// Stores the configuration record as a JSON file inside a data directory.
///
/// Each write goes to its own temporary sibling file which is synced and then
/// renamed over the record, so readers and writers in this or another process
/// only ever see whole records.
///
/// # Examples
///
/// ```no_run
/// use ridealert::alerts::{ConfigStore, FileConfigStore};
///
/// # async fn example() {
/// let store = FileConfigStore::new("./ridealert-data");
/// let config = store.load().await.unwrap_or(None);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FileConfigStore {
    /// Path of the record file.
    path: PathBuf,
}

impl FileConfigStore {
    /// Creates a store keeping its record in `data_dir`.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Directory holding the persisted state. Created on first save.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        FileConfigStore {
            path: data_dir.as_ref().join(CONFIG_KEY),
        }
    }

    /// Returns the path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    /// Reads and deserializes the record.
    ///
    /// A missing file is the unset state and yields `Ok(None)`. Any other read
    /// failure, or a record that does not parse, is a [`StoreError`].
    async fn load(&self) -> Result<Option<AlertConfiguration>, StoreError> {
        let serialized_config = match fs::read_to_string(&self.path).await {
            Ok(serialized) => serialized,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no persisted configuration at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let config: AlertConfiguration = serde_json::from_str(&serialized_config)?;
        debug!("loaded persisted configuration {}", config);

        Ok(Some(config))
    }

    /// Serializes and durably writes the record.
    ///
    /// The call only returns once the record has been synced and renamed into
    /// place.
    async fn save(&self, config: &AlertConfiguration) -> Result<(), StoreError> {
        let serialized_config = serde_json::to_vec(config)?;
        let path = self.path.clone();

        task::spawn_blocking(move || write_atomically(&path, &serialized_config))
            .await
            .map_err(io::Error::other)??;

        info!(
            "persisted configuration for park {}",
            config.park_identifier
        );

        Ok(())
    }
}

/// Replaces the file at `path` with `contents` in a single rename.
///
/// The temporary file name is unique to this write, so concurrent writers never
/// share a partially written file.
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = Builder::new()
        .prefix(CONFIG_KEY)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path)?;

    Ok(())
}
