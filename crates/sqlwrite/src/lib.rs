//! sqlwrite: batched, provider-aware relational writes.
//!
//! `sqlwrite` is the **primary user-facing crate**. It re-exports the core
//! types, the update pipeline and the provider generators, and adds two
//! one-call entry points:
//!
//! - [`save_changes`] turns tracked entries into commands, batches them for
//!   the connection's dialect, executes them and writes generated values back.
//! - [`save_commands`] does the same for commands built by hand.
//!
//! # Example
//!
//! ```ignore
//! use sqlwrite::prelude::*;
//!
//! let users = Arc::new(
//!     TableSchema::new("users")
//!         .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
//!         .column(ColumnDef::new("name", SqlType::Text)),
//! );
//! let mut entry = TrackedEntry::added(Arc::clone(&users));
//! entry.set("name", "Ada".into());
//!
//! let mut entries = [entry];
//! let summary = save_changes(&cx, &conn, &mut entries, UpdateConfig::default()).await;
//! ```
//!
//! Provider crates can be switched off with the `postgres`, `mysql` and
//! `sqlite` features.

#![allow(clippy::manual_async_fn)]

pub mod provider;

pub use sqlwrite_core::{
    ColumnDef, ColumnSet, ConcurrencyError, ConcurrencyFailure, Connection, DataReader, Dialect,
    EntityState, Error, IsolationLevel, Result, ResultSet, Row, SqlExecutor, SqlType,
    TableSchema, TrackedEntry, TransactionOps, UpdateErrorKind, Value, ValueGenerated,
};
pub use asupersync::{Cx, Outcome};
pub use sqlwrite_update::{
    AppendResult, AutoTransactions, BatchExecutor, BulkAppendResult, ColumnModification,
    CommandBatchPreparer, CommandState, ModificationCommand, ModificationCommandBatch,
    ParameterDirection, ProcedureParameter, ResultSetMapping, SaveResult, SaveSummary, SqlBuilder,
    StoredProcedureMapping, TableDependencies, UpdateConfig, UpdatePipeline, UpdateSqlGenerator,
    commands_from_entries,
};

pub use provider::{PipelineSettings, Provider};

pub use sqlwrite_core as core_types;
pub use sqlwrite_update as update;

#[cfg(feature = "postgres")]
pub mod postgres {
    pub use sqlwrite_postgres::*;
}

#[cfg(feature = "mysql")]
pub mod mysql {
    pub use sqlwrite_mysql::*;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use sqlwrite_sqlite::*;
}

/// Everything needed to save changes.
pub mod prelude {
    pub use std::sync::Arc;

    pub use sqlwrite_core::{Cx, Outcome};

    pub use crate::provider::{PipelineSettings, Provider};
    pub use crate::{save_changes, save_commands};
    pub use sqlwrite_core::{
        ColumnDef, Connection, Dialect, EntityState, Error, Row, SqlExecutor, SqlType,
        TableSchema, TrackedEntry, TransactionOps, Value,
    };
    pub use sqlwrite_update::{
        ColumnModification, ModificationCommand, SaveResult, SaveSummary, TableDependencies,
        UpdateConfig, UpdatePipeline,
    };
}

/// Save tracked entries on `conn` with the provider matching its dialect.
///
/// Generated and computed values are written back into the entries, and every
/// saved entry that was not deleted accepts its changes.
pub async fn save_changes<C: Connection>(
    cx: &Cx,
    conn: &C,
    entries: &mut [TrackedEntry],
    config: UpdateConfig,
) -> Outcome<SaveSummary, Error> {
    let pipeline = match pipeline_for(conn.dialect(), config) {
        Ok(pipeline) => pipeline,
        Err(e) => return Outcome::Err(e),
    };
    pipeline.save_entries(cx, conn, entries).await
}

/// Save hand-built commands on `conn` with the provider matching its dialect.
pub async fn save_commands<C: Connection>(
    cx: &Cx,
    conn: &C,
    commands: Vec<ModificationCommand>,
    config: UpdateConfig,
) -> Outcome<SaveResult, Error> {
    let pipeline = match pipeline_for(conn.dialect(), config) {
        Ok(pipeline) => pipeline,
        Err(e) => return Outcome::Err(e),
    };
    pipeline.save(cx, conn, commands).await
}

#[allow(clippy::result_large_err)]
fn pipeline_for(dialect: Dialect, config: UpdateConfig) -> Result<UpdatePipeline> {
    let provider = Provider::for_dialect(dialect)?;
    tracing::debug!(dialect = dialect.name(), "Selected update provider");
    provider.pipeline(config)
}
