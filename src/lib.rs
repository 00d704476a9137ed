//! Design catalog and billing desk for a tailoring workshop.
//!
//! The library holds everything that does not need a window: the record
//! store, the catalog, the billing engine, design-number recognition and PDF
//! export. The `desktop` feature adds the Tauri command layer.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult, ExportError, RecognitionError};
