//! Operation Dispatcher
//!
//! Routes `(operation_name, arguments)` to a handler and always answers with a
//! [`ToolResponse`]. No error escapes to the transport.
//!
//! # Request Lifecycle
//! `Received -> NameLookup -> ArgumentValidation -> Execution -> ResultShaping -> Responded`
//!
//! # Error Exposure
//! | Failure | Raw mode | Intent mode |
//! |---|---|---|
//! | unknown name | `Unknown operation: ...` | same |
//! | validation / gatekeeper | `Input error: <reason>` | same |
//! | fuzzy lookup found nothing | `No matching data: ...` | same |
//! | server rejected the SQL | `Error: <server message>` | generic failure |
//! | connection / internal | generic failure | generic failure |
//!
//! Raw mode shows server SQL errors because the caller wrote the SQL. Every
//! generic failure is logged at `error` with full detail first.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::engine::Database;
use crate::error::{GateError, Result};
use crate::intent::IntentOperation;
use crate::output::{Outcome, ToolResponse};
use crate::raw::RawOperation;

/// Which catalog the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Caller-written SQL behind the gatekeeper
    Raw,
    /// Fixed business operations
    Intent,
}

/// One catalog entry as served by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// JSON Schema for an argument struct, without the meta-schema header
pub(crate) fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| Value::Object(Map::new()));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.entry("type").or_insert_with(|| Value::from("object"));
    }
    schema
}

/// Every operation of `mode`, in catalog order
#[must_use]
pub fn catalog(mode: Mode) -> Vec<ToolDescriptor> {
    match mode {
        Mode::Raw => RawOperation::ALL.into_iter().map(RawOperation::descriptor).collect(),
        Mode::Intent => IntentOperation::ALL.iter().map(|op| op.descriptor()).collect(),
    }
}

/// Routes calls to handlers over one shared database collaborator
#[derive(Debug)]
pub struct Dispatcher<D> {
    db: D,
    mode: Mode,
}

impl<D: Database> Dispatcher<D> {
    /// Create a dispatcher for `mode`
    pub fn new(db: D, mode: Mode) -> Self {
        Self { db, mode }
    }

    /// Served mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Catalog for the served mode
    #[must_use]
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        catalog(self.mode)
    }

    /// Run one operation and package the result
    pub async fn call(&self, name: &str, arguments: &Map<String, Value>) -> ToolResponse {
        debug!(operation = name, mode = ?self.mode, "tool call");

        let result = match self.mode {
            Mode::Raw => match RawOperation::from_name(name) {
                Some(op) => op.run(&self.db, arguments).await,
                None => return unknown(name),
            },
            Mode::Intent => match IntentOperation::from_name(name) {
                Some(op) => op.run(&self.db, arguments).await,
                None => return unknown(name),
            },
        };

        self.package(name, result)
    }

    fn package(&self, name: &str, result: Result<Outcome>) -> ToolResponse {
        match result {
            Ok(outcome) => ToolResponse::from_outcome(outcome),
            Err(GateError::NotFound(message)) => ToolResponse::no_data(message),
            Err(err) if err.is_caller_visible() => {
                debug!(operation = name, code = err.error_code(), error = %err, "request rejected");
                ToolResponse::input_error(err.message())
            }
            Err(err @ GateError::QueryFailed(_)) if self.mode == Mode::Raw => {
                warn!(operation = name, error = %err, "raw statement failed");
                ToolResponse::error(err.message())
            }
            Err(err) => {
                error!(operation = name, code = err.error_code(), error = %err, "operation failed");
                ToolResponse::failure()
            }
        }
    }
}

fn unknown(name: &str) -> ToolResponse {
    warn!(operation = name, "unknown operation");
    ToolResponse::unknown_operation(name)
}
