//! Scripted database shared by the integration tests
//!
//! Responses are served in push order, one per executed statement. Once the
//! script runs out every statement returns no rows.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use sakila_mcp::{Database, Dispatcher, GateError, Mode, Result, Row, Session, Statement};

#[derive(Default)]
struct Script {
    responses: Mutex<VecDeque<Result<Vec<Row>>>>,
    executed: Mutex<Vec<Statement>>,
    acquisitions: AtomicUsize,
    refuse_connections: bool,
}

/// In-memory [`Database`] that records every statement it is asked to run
#[derive(Clone, Default)]
pub struct MockDatabase {
    script: Arc<Script>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `acquire` fails as if the server were down
    pub fn unreachable() -> Self {
        Self { script: Arc::new(Script { refuse_connections: true, ..Script::default() }) }
    }

    /// Queue the rows for the next statement. Each value must be a JSON object.
    pub fn push_rows(&self, rows: Vec<Value>) -> &Self {
        let rows = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("mock rows must be objects, got {other}"),
            })
            .collect();
        self.script.responses.lock().unwrap().push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next statement
    pub fn push_error(&self, error: GateError) -> &Self {
        self.script.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Statements executed so far, in order
    pub fn statements(&self) -> Vec<Statement> {
        self.script.executed.lock().unwrap().clone()
    }

    /// Number of sessions handed out
    pub fn acquisitions(&self) -> usize {
        self.script.acquisitions.load(Ordering::SeqCst)
    }
}

pub struct MockSession {
    script: Arc<Script>,
}

impl Database for MockDatabase {
    type Session = MockSession;

    async fn acquire(&self) -> Result<MockSession> {
        if self.script.refuse_connections {
            return Err(GateError::connection_failed("Can't connect to MySQL server on 'localhost' (111)"));
        }
        self.script.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession { script: Arc::clone(&self.script) })
    }
}

impl Session for MockSession {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        self.script.executed.lock().unwrap().push(statement.clone());
        self.script.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Dispatcher over a fresh mock, plus a handle to inspect it afterwards
pub fn dispatcher(mode: Mode) -> (Dispatcher<MockDatabase>, MockDatabase) {
    let db = MockDatabase::new();
    (Dispatcher::new(db.clone(), mode), db)
}

/// Borrow a `json!` object literal as an argument map
pub fn args(value: &Value) -> &Map<String, Value> {
    value.as_object().expect("arguments must be a JSON object")
}
