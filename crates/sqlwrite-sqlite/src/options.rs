//! SQLite generator options.

use serde::{Deserialize, Serialize};

/// SQLite capabilities the generator adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// Use `RETURNING` (SQLite 3.35+). When off, generated values are read
    /// back with `last_insert_rowid()` and row counts with `changes()`.
    pub use_returning: bool,
    /// Commands per batch when the caller does not configure a limit.
    pub max_batch_size: usize,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            use_returning: true,
            max_batch_size: 1000,
        }
    }
}

impl SqliteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_returning(mut self, enabled: bool) -> Self {
        self.use_returning = enabled;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Options matching a library version such as `"3.31.1"`.
    pub fn for_version(version: &str) -> Self {
        let mut parts = version.trim().split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let use_returning = (major, minor) >= (3, 35);
        tracing::debug!(version, use_returning, "SQLite generator options");
        Self::default().use_returning(use_returning)
    }
}
