//! Choosing an update SQL generator at runtime.
//!
//! A [`Provider`] names a database family plus its options. It can be built
//! in code, picked from a connection's [`Dialect`], or loaded from JSON next
//! to the pipeline's [`UpdateConfig`]:
//!
//! ```json
//! {
//!   "provider": { "postgres": { "server_version": 17 } },
//!   "update": { "max_batch_size": 200, "auto_transactions": "always" }
//! }
//! ```

#![allow(clippy::result_large_err)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlwrite_core::{Dialect, Error, Result};
use sqlwrite_update::{UpdateConfig, UpdatePipeline, UpdateSqlGenerator};

/// A database family and the options its generator runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[cfg(feature = "postgres")]
    Postgres(sqlwrite_postgres::PostgresOptions),
    #[cfg(feature = "mysql")]
    #[serde(rename = "mysql")]
    MySql(sqlwrite_mysql::MySqlOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlwrite_sqlite::SqliteOptions),
}

impl Provider {
    /// The provider for `dialect` with default options.
    ///
    /// Fails when the matching provider feature is disabled.
    pub fn for_dialect(dialect: Dialect) -> Result<Self> {
        match dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => Ok(Provider::Postgres(Default::default())),
            #[cfg(feature = "mysql")]
            Dialect::MySql => Ok(Provider::MySql(Default::default())),
            #[cfg(feature = "sqlite")]
            Dialect::Sqlite => Ok(Provider::Sqlite(Default::default())),
            #[allow(unreachable_patterns)]
            other => Err(Error::config(format!(
                "no update provider compiled in for {}",
                other.name()
            ))),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match *self {
            #[cfg(feature = "postgres")]
            Provider::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "mysql")]
            Provider::MySql(_) => Dialect::MySql,
            #[cfg(feature = "sqlite")]
            Provider::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// The generator rendering this provider's SQL.
    pub fn generator(&self) -> Arc<dyn UpdateSqlGenerator> {
        match *self {
            #[cfg(feature = "postgres")]
            Provider::Postgres(options) => {
                Arc::new(sqlwrite_postgres::PostgresUpdateSqlGenerator::new(options))
            }
            #[cfg(feature = "mysql")]
            Provider::MySql(options) => Arc::new(sqlwrite_mysql::MySqlUpdateSqlGenerator::new(options)),
            #[cfg(feature = "sqlite")]
            Provider::Sqlite(options) => {
                Arc::new(sqlwrite_sqlite::SqliteUpdateSqlGenerator::new(options))
            }
        }
    }

    /// An update pipeline for this provider.
    pub fn pipeline(&self, config: UpdateConfig) -> Result<UpdatePipeline> {
        UpdatePipeline::new(self.generator(), config)
    }
}

/// Provider and pipeline settings as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub provider: Provider,
    #[serde(default)]
    pub update: UpdateConfig,
}

impl PipelineSettings {
    pub fn new(provider: Provider, update: UpdateConfig) -> Self {
        Self { provider, update }
    }

    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("invalid pipeline settings: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("cannot serialize pipeline settings: {e}")))
    }

    /// Validate the update config and build the pipeline.
    pub fn pipeline(&self) -> Result<UpdatePipeline> {
        self.provider.pipeline(self.update.clone())
    }
}
