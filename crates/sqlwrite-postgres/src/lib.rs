//! PostgreSQL provider for sqlwrite.
//!
//! Renders modification commands the PostgreSQL way:
//!
//! - `RETURNING` for generated values, `RETURNING 1` for affected-row checks
//! - Multi-row `INSERT ... VALUES` for inserts without generated values
//! - Positional `MERGE ... RETURNING` bulk inserts on PostgreSQL 17+
//! - `CALL` with OUT/INOUT parameters returned as a row

pub mod generator;
pub mod options;

use std::sync::Arc;

use sqlwrite_core::Result;
use sqlwrite_update::{UpdateConfig, UpdatePipeline};

pub use generator::{POSITION_COLUMN, PostgresUpdateSqlGenerator};
pub use options::{MERGE_RETURNING_VERSION, PostgresOptions};

/// An update pipeline rendering PostgreSQL.
#[allow(clippy::result_large_err)]
pub fn pipeline(options: PostgresOptions, config: UpdateConfig) -> Result<UpdatePipeline> {
    UpdatePipeline::new(Arc::new(PostgresUpdateSqlGenerator::new(options)), config)
}
