//! Database module - MySQL implementations using SQLx
//!
//! This module provides the document database backend:
//! - Connection pool management
//! - The `documents` table holding every collection
//! - Version-checked batch commits inside SQL transactions

pub mod connection;
pub mod mysql;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::MySqlDocumentStore;
