//! The update pipeline: modification commands, batching, SQL generation and
//! result propagation.
//!
//! `sqlwrite-update` sits between a change tracker and a database driver:
//!
//! 1. Tracked entries become [`ModificationCommand`]s.
//! 2. [`CommandBatchPreparer`] packs commands into [`ModificationCommandBatch`]es,
//!    asking the provider's [`UpdateSqlGenerator`] to render each one.
//! 3. [`BatchExecutor`] runs the batches inside a transaction, walking every
//!    result set with the batch's [`ResultSetMapping`]s to detect concurrency
//!    conflicts and write generated values back into the commands.
//!
//! [`UpdatePipeline`] wires the three together.

#![allow(clippy::manual_async_fn)]

/// Unwrap an `Outcome`, returning early on anything but `Ok`.
macro_rules! try_outcome {
    ($e:expr) => {
        match $e {
            ::asupersync::Outcome::Ok(v) => v,
            ::asupersync::Outcome::Err(e) => return ::asupersync::Outcome::Err(e),
            ::asupersync::Outcome::Cancelled(r) => return ::asupersync::Outcome::Cancelled(r),
            ::asupersync::Outcome::Panicked(p) => return ::asupersync::Outcome::Panicked(p),
        }
    };
}

/// Unwrap a `Result` inside a function returning `Outcome`.
macro_rules! try_result {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return ::asupersync::Outcome::Err(e),
        }
    };
}

pub mod batch;
pub mod command;
pub mod config;
pub mod executor;
pub mod generator;
pub mod mapping;
pub mod pipeline;
pub mod preparer;
pub mod procedure;
pub mod sql_builder;

pub use batch::{BatchState, ModificationCommandBatch, RejectReason, Rejected};
pub use command::{ColumnModification, CommandState, ModificationCommand, ParameterNameGenerator};
pub use config::{AutoTransactions, UpdateConfig};
pub use executor::{BatchExecutor, SaveSummary};
pub use generator::{AppendResult, BulkAppendResult, UpdateSqlGenerator, bulk_compatible};
pub use mapping::ResultSetMapping;
pub use pipeline::{SaveResult, UpdatePipeline, commands_from_entries};
pub use preparer::{CommandBatchPreparer, TableDependencies};
pub use procedure::{
    ParameterDirection, ProcedureParameter, ResultColumn, RowsAffectedSource,
    StoredProcedureMapping,
};
pub use sql_builder::{Checkpoint, Parameter, SqlBuilder};
