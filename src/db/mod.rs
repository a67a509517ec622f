//! Database module
//!
//! Handles SQLite connection and migrations for saved formulations.

pub mod connection;
pub mod migrations;

use std::path::PathBuf;

pub use connection::{Database, DbError, DbResult};

/// Environment variable overriding the database location
pub const DATABASE_PATH_ENV: &str = "AKLLA_DATABASE_PATH";

/// Get the database path from environment or use default
///
/// The default is `data/aklla.db` under the project root, found by stepping
/// out of `target/release` or `target/debug` from the executable.
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
                    path = grandparent.to_path_buf();
                }
            }

            path.push("data");
            path.push("aklla.db");
            path
        })
}
