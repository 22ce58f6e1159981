//! Relational persistence
//!
//! Users, Facebook ad accounts and their assignments, the insights cache,
//! conversation turns, prompt versions, model pricing, analysis results and
//! campaign performance snapshots all live in one SQLite database managed by
//! [`Store`].

mod accounts;
mod analysis;
mod api_cache;
mod campaigns;
mod conversation;
pub mod migrations;
pub mod password;
mod pricing;
mod prompts;
pub mod rows;
mod store;
mod users;

pub use rows::*;
pub use store::{Store, StoreResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite store '{operation}' failed: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict in '{operation}': {message}")]
    Conflict {
        operation: &'static str,
        message: String,
    },
    #[error("password hashing failed: {0}")]
    Password(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn sqlite(operation: &'static str, source: rusqlite::Error) -> Self {
        if store::is_constraint_violation(&source) {
            return Self::Conflict {
                operation,
                message: source.to_string(),
            };
        }
        Self::Sqlite { operation, source }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
