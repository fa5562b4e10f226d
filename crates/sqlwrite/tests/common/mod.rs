//! A connection that records what the pipeline sends and replays canned
//! result sets.

#![allow(dead_code, clippy::manual_async_fn)]

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use asupersync::types::CancelKind;
use sqlwrite::prelude::*;
use sqlwrite::{DataReader, IsolationLevel, ResultSet};

/// Something the pipeline asked the connection to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin(Option<IsolationLevel>),
    Execute { sql: String, params: Vec<Value> },
    Savepoint(String),
    RollbackTo(String),
    Release(String),
    Commit,
    Rollback,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<DataReader, String>>,
    events: Vec<Event>,
    /// Cancelled once the next batch has been sent.
    cancel_on_execute: Option<Cx>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("replies", &self.replies.len())
            .field("events", &self.events)
            .field("cancel_on_execute", &self.cancel_on_execute.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedConnection {
    dialect: Dialect,
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Queue the reader returned by the next batch.
    pub fn reply(&self, result_sets: Vec<ResultSet>) -> &Self {
        self.lock().replies.push_back(Ok(DataReader::new(result_sets, 0)));
        self
    }

    /// Make the next batch fail on the server.
    pub fn fail_next(&self, message: &str) -> &Self {
        self.lock().replies.push_back(Err(message.to_string()));
        self
    }

    /// Cancel `cx` as soon as the next batch reaches the connection.
    pub fn cancel_on_execute(&self, cx: &Cx) -> &Self {
        self.lock().cancel_on_execute = Some(cx.clone());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// SQL text of every executed batch.
    pub fn executed(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute { sql, .. } => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Events other than batch executions.
    pub fn transaction_events(&self) -> Vec<Event> {
        self.lock()
            .events
            .iter()
            .filter(|e| !matches!(e, Event::Execute { .. }))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }

    fn next_reply(&self, sql: &str, params: &[Value]) -> Outcome<DataReader, Error> {
        let mut script = self.lock();
        script.events.push(Event::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        if let Some(cx) = script.cancel_on_execute.take() {
            cancel(&cx);
        }
        match script.replies.pop_front() {
            Some(Ok(reader)) => Outcome::Ok(reader),
            Some(Err(message)) => Outcome::Err(Error::Custom(message)),
            None => Outcome::Ok(DataReader::empty(0)),
        }
    }
}

impl SqlExecutor for ScriptedConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        self.record(Event::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        async { Outcome::Ok(0) }
    }

    fn execute_reader(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<DataReader, Error>> + Send {
        let reply = self.next_reply(sql, params);
        async move { reply }
    }
}

impl Connection for ScriptedConnection {
    type Tx<'conn>
        = ScriptedTx<'conn>
    where
        Self: 'conn;

    fn begin(&self, _cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        self.record(Event::Begin(None));
        async move { Outcome::Ok(ScriptedTx { conn: self }) }
    }

    fn begin_with(
        &self,
        _cx: &Cx,
        isolation: IsolationLevel,
    ) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        self.record(Event::Begin(Some(isolation)));
        async move { Outcome::Ok(ScriptedTx { conn: self }) }
    }
}

pub struct ScriptedTx<'conn> {
    conn: &'conn ScriptedConnection,
}

impl SqlExecutor for ScriptedTx<'_> {
    fn dialect(&self) -> Dialect {
        self.conn.dialect
    }

    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        self.conn.execute(cx, sql, params)
    }

    fn execute_reader(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<DataReader, Error>> + Send {
        self.conn.execute_reader(cx, sql, params)
    }
}

impl TransactionOps for ScriptedTx<'_> {
    fn savepoint(&self, _cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.conn.record(Event::Savepoint(name.to_string()));
        async { Outcome::Ok(()) }
    }

    fn rollback_to(&self, _cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.conn.record(Event::RollbackTo(name.to_string()));
        async { Outcome::Ok(()) }
    }

    fn release(&self, _cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.conn.record(Event::Release(name.to_string()));
        async { Outcome::Ok(()) }
    }

    fn commit(self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.conn.record(Event::Commit);
        async { Outcome::Ok(()) }
    }

    fn rollback(self, _cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        self.conn.record(Event::Rollback);
        async { Outcome::Ok(()) }
    }
}

/// Request cancellation the way a caller dropping the save would.
pub fn cancel(cx: &Cx) {
    cx.cancel_with(CancelKind::User, Some("caller went away"));
}

/// A result set with named columns.
pub fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
    ResultSet::from_values(columns.iter().map(|c| (*c).to_string()).collect(), rows)
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected an error, got {other:?}"),
    }
}

pub fn run<F: Future>(test: impl FnOnce(Cx) -> F) -> F::Output {
    let rt = asupersync::runtime::RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    rt.block_on(test(cx))
}

/// `users(id identity key, name text)`.
pub fn users_table() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new("users")
            .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
            .column(ColumnDef::new("name", SqlType::Text)),
    )
}

/// `accounts(id key, owner text, balance bigint, version row version)`.
pub fn accounts_table() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new("accounts")
            .column(ColumnDef::new("id", SqlType::BigInt).primary_key())
            .column(ColumnDef::new("owner", SqlType::Text))
            .column(ColumnDef::new("balance", SqlType::BigInt))
            .column(ColumnDef::new("version", SqlType::BigInt).row_version()),
    )
}

pub fn new_user(name: &str) -> TrackedEntry {
    let mut entry = TrackedEntry::added(users_table());
    entry.set("name", Value::from(name));
    entry
}

pub fn loaded_account(id: i64, balance: i64, version: i64) -> TrackedEntry {
    TrackedEntry::existing(
        accounts_table(),
        [
            ("id", Value::BigInt(id)),
            ("owner", Value::from("ops")),
            ("balance", Value::BigInt(balance)),
            ("version", Value::BigInt(version)),
        ],
    )
}
