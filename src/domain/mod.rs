//! Domain layer - core types for the conversion batch.
//!
//! This layer contains the models, configuration and error types
//! without any IO of its own.

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, ConversionConfig};
pub use error::{AppError, ConversionError, Result};
pub use models::{BatchReport, FileFailure, FileMoveRecord, Grid};
