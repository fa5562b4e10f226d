//! SQLite provider for sqlwrite.
//!
//! Uses `RETURNING` on SQLite 3.35+ and `changes()`/`last_insert_rowid()`
//! follow-up queries on older libraries. Independent inserts are folded into
//! multi-row `VALUES` lists.

pub mod generator;
pub mod options;

use std::sync::Arc;

use sqlwrite_core::Result;
use sqlwrite_update::{UpdateConfig, UpdatePipeline};

pub use generator::SqliteUpdateSqlGenerator;
pub use options::SqliteOptions;

/// An update pipeline rendering SQLite.
#[allow(clippy::result_large_err)]
pub fn pipeline(options: SqliteOptions, config: UpdateConfig) -> Result<UpdatePipeline> {
    UpdatePipeline::new(Arc::new(SqliteUpdateSqlGenerator::new(options)), config)
}
