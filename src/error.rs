//! Error types for Pagemark
//!
//! This module defines the error types used throughout the crate.
//! Error types are organized by category so callers can match on the concern
//! that failed and show a user-friendly message.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export errors (HTML or PDF)
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Text enhancement errors
    #[error(transparent)]
    Enhance(#[from] EnhanceError),

    /// File watcher errors
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// File is too large to open
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing file
    #[error("Could not save file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory operation error
    #[error("Directory error: {path}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error saving configuration
    #[error("Could not save configuration: {0}")]
    SaveError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// Errors raised while exporting a paginated document
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("Export format not supported: {0}")]
    UnsupportedFormat(String),

    /// No Chrome/Chromium binary could be located
    #[error("Unable to locate a Chrome/Chromium binary. Set PAGEMARK_CHROME_BIN to override the detection.")]
    BrowserNotFound,

    /// The browser process could not be started
    #[error("Failed to launch {binary}: {source}")]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser exited unsuccessfully
    #[error("PDF renderer exited with status {0}")]
    RendererFailed(String),

    #[error("Failed to construct file:// URL for {0}")]
    InvalidUrl(PathBuf),

    /// Another export is already running
    #[error("An export is already in progress")]
    AlreadyRunning,

    /// The export task panicked or was cancelled
    #[error("Export task aborted: {0}")]
    Aborted(String),
}

/// Errors from the external text enhancement collaborator
#[derive(Error, Debug)]
pub enum EnhanceError {
    /// No enhancement command configured
    #[error("No text enhancement command is configured")]
    NotConfigured,

    #[error("Failed to run enhancement command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Enhancement command exited with status {0}")]
    CommandFailed(String),

    #[error("Enhancement command returned invalid UTF-8")]
    InvalidOutput,

    #[error("Enhancement command returned an empty document")]
    EmptyOutput,
}

/// File watcher errors
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Could not initialize file watcher
    #[error("Could not start file watcher: {0}")]
    InitError(#[source] notify::Error),

    /// Could not watch path
    #[error("Could not watch path: {path}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

impl AppError {
    /// Message suitable for display to the user
    pub fn user_message(&self) -> String {
        match self {
            AppError::FileIO(e) => e.user_message(),
            AppError::Export(e) => e.user_message(),
            AppError::Enhance(e) => e.user_message(),
            AppError::Config(e) => e.to_string(),
            AppError::Watcher(e) => e.to_string(),
        }
    }
}

impl FileError {
    /// Create a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound(_) => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::FileTooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            FileError::WriteError { .. } => {
                "Could not save the file. Check disk space and permissions.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl ExportError {
    /// Message shown when an export attempt fails
    pub fn user_message(&self) -> String {
        match self {
            ExportError::BrowserNotFound => {
                "PDF export needs Chrome or Chromium. Install one or set PAGEMARK_CHROME_BIN."
                    .to_string()
            }
            ExportError::AlreadyRunning => "An export is already running.".to_string(),
            _ => format!("Export failed: {}", self),
        }
    }
}

impl EnhanceError {
    /// Enhancement failures are surfaced as a generic notice.
    pub fn user_message(&self) -> String {
        match self {
            EnhanceError::NotConfigured => {
                "Text enhancement is not configured.".to_string()
            }
            _ => "Text enhancement failed. Your document was not changed.".to_string(),
        }
    }
}
