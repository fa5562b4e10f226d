//! MySQL provider for sqlwrite.
//!
//! MySQL cannot return values from a write, so generated values, affected-row
//! counts and procedure output parameters are read back with follow-up
//! `SELECT` statements in the same batch. See [`generator`] for the shapes.

pub mod generator;
pub mod options;

use std::sync::Arc;

use sqlwrite_core::Result;
use sqlwrite_update::{UpdateConfig, UpdatePipeline};

pub use generator::MySqlUpdateSqlGenerator;
pub use options::MySqlOptions;

/// An update pipeline rendering MySQL.
#[allow(clippy::result_large_err)]
pub fn pipeline(options: MySqlOptions, config: UpdateConfig) -> Result<UpdatePipeline> {
    UpdatePipeline::new(Arc::new(MySqlUpdateSqlGenerator::new(options)), config)
}
