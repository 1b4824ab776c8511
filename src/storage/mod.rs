//! Persistent storage
//!
//! Data directory resolution and model file downloads.

pub mod download;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Could not determine a data directory for this platform")]
    NoDataDir,
    #[error("Invalid model URL: {0}")]
    InvalidUrl(String),
    #[error("Download failed: {0}")]
    DownloadFailed(String),
}

/// Platform data directory of the service
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    ProjectDirs::from("com", "tinyllama", "tinyllama-api")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}

/// Default directory downloaded models are stored in
pub fn default_models_dir() -> PathBuf {
    get_data_dir()
        .map(|dir| dir.join("models"))
        .unwrap_or_else(|_| PathBuf::from("./models"))
}
