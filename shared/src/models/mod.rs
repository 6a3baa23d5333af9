//! Data models
//!
//! Shared between hub-server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps Unix millis.

pub mod notification;
pub mod order;
pub mod procurement;
pub mod shipment;
pub mod timeline;
pub mod user;

// Re-exports
pub use notification::*;
pub use order::*;
pub use procurement::*;
pub use shipment::*;
pub use timeline::*;
pub use user::*;
