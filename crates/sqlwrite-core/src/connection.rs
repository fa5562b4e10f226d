//! Connection and transaction contracts.
//!
//! The update pipeline never opens connections itself. Drivers implement
//! [`Connection`] (and its [`TransactionOps`] type); the pipeline borrows one
//! for the duration of a save and talks to it only through [`SqlExecutor`].

use std::future::Future;

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::Error;
use crate::reader::DataReader;
use crate::value::Value;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL keyword form, as used in `SET TRANSACTION ISOLATION LEVEL ...`.
    pub const fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Something that can run SQL: a connection or an open transaction.
pub trait SqlExecutor: Send + Sync {
    /// Dialect spoken by the server behind this executor.
    fn dialect(&self) -> Dialect;

    /// Execute a statement, returning rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Execute a (possibly multi-statement) command text and return a reader
    /// over every result set it produced.
    fn execute_reader(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<DataReader, Error>> + Send;
}

/// Operations available inside a transaction.
pub trait TransactionOps: SqlExecutor {
    /// Create a savepoint.
    fn savepoint(&self, cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Roll back to a savepoint.
    fn rollback_to(&self, cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Release a savepoint.
    fn release(&self, cx: &Cx, name: &str) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Commit the transaction.
    fn commit(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Roll back the transaction.
    fn rollback(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}

/// A database connection able to start transactions.
pub trait Connection: SqlExecutor {
    /// Transaction type borrowed from this connection.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Begin a transaction with the default isolation level.
    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;

    /// Begin a transaction with an explicit isolation level.
    fn begin_with(
        &self,
        cx: &Cx,
        isolation: IsolationLevel,
    ) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;
}
