//! Database Collaborator
//!
//! The gateway never talks to a driver directly. It asks a [`Database`] for a
//! [`Session`], runs one or more statements on it, and drops it.
//!
//! # Scoped Acquisition
//! A session is owned by exactly one request. Dropping it releases the
//! underlying connection, so every exit path (success, validation failure
//! after acquisition, driver error, panic unwinding) gives the connection back.
//! Sessions are never shared between requests; pooling is an implementation
//! detail of a particular `Database`.

use serde_json::{Map, Value};
use std::future::Future;
use tracing::debug;

use crate::error::Result;
use crate::query::Statement;

#[cfg(feature = "mysql")]
pub mod mysql;

/// One result row: column name to JSON value, in column order
pub type Row = Map<String, Value>;

/// Source of per-request sessions
pub trait Database: Send + Sync {
    /// Session type handed to a single request
    type Session: Session;

    /// Acquire a dedicated session for one request
    fn acquire(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A connection scoped to one request
pub trait Session: Send {
    /// Execute one statement and return its rows.
    ///
    /// Statements without parameters must be single statements; the
    /// implementation refuses multi-statement text.
    fn fetch(&mut self, statement: &Statement) -> impl Future<Output = Result<Vec<Row>>> + Send;
}

/// Acquire a session, run one statement, release the session.
pub async fn fetch_scoped<D: Database>(db: &D, statement: &Statement) -> Result<Vec<Row>> {
    let mut session = db.acquire().await?;
    debug!(sql = statement.sql(), params = statement.params().len(), "executing statement");
    session.fetch(statement).await
}
