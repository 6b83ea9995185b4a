/*!
 * Database module for persistent storage of files, units and jobs.
 *
 * This module provides SQLite-based persistence for:
 * - Files and their translation units
 * - Batch job records, polled by runners and stop requests
 * - Glossary terms and user notifications
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::Repository;
