//! Repository Module
//!
//! Free async functions over `&mut SqliteConnection`, one module per table.

pub mod notification;
pub mod order;
pub mod procurement;
pub mod shipment;
pub mod user;
