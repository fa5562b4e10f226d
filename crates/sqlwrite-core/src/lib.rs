//! Core types and traits for sqlwrite.
//!
//! `sqlwrite-core` is the **foundation layer** of the workspace. It defines the
//! data types and contracts the update pipeline and the provider crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Connection`, `TransactionOps` and `SqlExecutor` are
//!   implemented by database drivers; the pipeline only borrows them.
//! - **Data model**: `Value`, `Row`, `DataReader` and `ResultSet` carry parameters
//!   in and result sets out.
//! - **Change input**: `TableSchema`, `TrackedEntry` and `ColumnSet` describe the
//!   rows a change tracker hands to the pipeline.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so
//!   every database round-trip is cancel-correct.
//!
//! Most applications should use the `sqlwrite` facade.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod column_set;
pub mod connection;
pub mod dialect;
pub mod entry;
pub mod error;
pub mod identifiers;
pub mod reader;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

pub use column_set::ColumnSet;
pub use connection::{Connection, IsolationLevel, SqlExecutor, TransactionOps};
pub use dialect::Dialect;
pub use entry::{EntityState, TrackedEntry};
pub use error::{
    ConcurrencyError, ConcurrencyFailure, ConnectionError, ConnectionErrorKind, Error, QueryError,
    QueryErrorKind, Result, UpdateError, UpdateErrorKind,
};
pub use identifiers::{quote_ident, quote_ident_mysql, sanitize_identifier, validate_plain_identifier};
pub use reader::{DataReader, ResultSet};
pub use row::{FromValue, Row};
pub use schema::{ColumnDef, TableSchema, ValueGenerated};
pub use types::SqlType;
pub use value::Value;
