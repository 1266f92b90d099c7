//! Sakila MCP - read-only gateway to the Sakila rental database
//!
//! Exposes the Sakila MySQL sample database to MCP clients in one of two modes:
//! - **raw**: caller-written SQL, admitted only by a leading-command allow-list
//!   and a dangerous-keyword scan
//! - **intent**: eighteen named business operations that build parameterized
//!   SQL from validated arguments
//!
//! # Core Principles
//! - Read-only: no write, DDL or transaction statements ever reach the server
//! - Caller values are bound, never spliced into SQL text
//! - Validation errors teach; unexpected failures stay generic
//! - Every list has an enforced row bound
//!
//! # Module Organization
//! - [`error`] - Error taxonomy
//! - [`output`] - Tool response content blocks
//! - [`logging`] - tracing setup (stderr only)
//! - [`config`] - Connection settings from the environment
//! - [`engine`] - Database collaborator traits and the MySQL implementation
//! - [`allowlist`] - Immutable closed domains
//! - [`validate`] - Argument validators
//! - [`gatekeeper`] - Raw SQL classifier
//! - [`query`] - Parameterized statements and the builder
//! - [`normalize`] - Result shaping and derived fields
//! - [`raw`] - Raw-query catalog
//! - [`intent`] - Intent catalog
//! - [`dispatch`] - Name lookup and error exposure policy
//! - [`mcp`] - JSON-RPC 2.0 stdio server

pub mod allowlist;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gatekeeper;
pub mod intent;
pub mod logging;
pub mod mcp;
pub mod normalize;
pub mod output;
pub mod query;
pub mod raw;
pub mod validate;

// Re-export commonly used types for convenience
pub use config::DatabaseSettings;
pub use dispatch::{catalog, Dispatcher, Mode, ToolDescriptor};
pub use engine::{Database, Row, Session};
pub use error::{GateError, Result};
pub use output::{Outcome, TextContent, ToolResponse};
pub use query::{Param, QueryBuilder, Statement};

#[cfg(feature = "mysql")]
pub use engine::mysql::MySqlDatabase;
