// src/utils/error.rs
#![allow(dead_code)]
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Browser failed to launch: {0}")]
    Launch(String),

    #[error("Browser protocol command failed: {0}")]
    Protocol(String),

    #[error("Element '{selector}' not interactable within {waited_secs}s")]
    ElementTimeout { selector: String, waited_secs: u64 },

    #[error("Expected archive not found at {0}")]
    ArchiveMissing(PathBuf),

    #[error("All {0} download attempts failed")]
    AttemptsExhausted(u32),
}

impl PortalError {
    /// Whether this failure is expected to clear on a fresh attempt.
    /// `AttemptsExhausted` is the only terminal variant; everything else
    /// is consumed by the retry loop.
    pub fn is_transient(&self) -> bool {
        !matches!(self, PortalError::AttemptsExhausted(_))
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No archive present at {0}")]
    MissingArchive(PathBuf),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Report retrieval failed: {0}")]
    Portal(#[from] PortalError),

    #[error("Ingest failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
