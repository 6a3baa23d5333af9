//! Shared types for the MQM logistics hub
//!
//! Domain models, the status vocabulary, identifier formats and the unified
//! error system used by `hub-server` and its clients.

pub mod error;
pub mod models;
pub mod status;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use status::{Status, progress};
