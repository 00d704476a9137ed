use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Text recognition failed: {0}")]
    Engine(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("No design number found in image")]
    NoDesignNumber,
    #[error("Text recognition timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Admin access required")]
    AccessDenied,
    #[error("Storage: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unsupported catalog version {0}")]
    UnsupportedCatalogVersion(u64),
    #[error("{0} lock poisoned")]
    Lock(&'static str),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
