//! Aklla Tools module
//!
//! MCP tool implementations for the Aklla soap formulator.

pub mod catalog;
pub mod formulation;
pub mod saved;
pub mod status;

use thiserror::Error;

use crate::db::DbError;

/// Tool failure, split by whose fault it is
#[derive(Debug, Error)]
pub enum ToolError {
    /// The caller sent something unusable
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        source: DbError,
    },
}

impl ToolError {
    pub fn storage(context: &'static str) -> impl FnOnce(DbError) -> ToolError {
        move |source| ToolError::Storage { context, source }
    }

    /// Whether the caller can fix this by changing the request
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, ToolError::Storage { .. })
    }
}
