//! PostgreSQL generator options.

use serde::{Deserialize, Serialize};

/// First major version whose `MERGE` supports `RETURNING`.
pub const MERGE_RETURNING_VERSION: u32 = 17;

/// Server capabilities the generator adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresOptions {
    /// Major server version (e.g. `16`).
    pub server_version: u32,
    /// Commands per batch when the caller does not configure a limit.
    pub max_batch_size: usize,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            server_version: 16,
            max_batch_size: 1000,
        }
    }
}

impl PostgresOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_version(mut self, major: u32) -> Self {
        self.server_version = major;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Inserts that read generated values can share one `MERGE` statement.
    pub fn supports_merge_returning(&self) -> bool {
        self.server_version >= MERGE_RETURNING_VERSION
    }

    /// Parse the major version out of a `server_version` string such as
    /// `"17.2 (Debian 17.2-1)"` or `"9.6.24"`.
    pub fn with_server_version_string(mut self, version: &str) -> Self {
        if let Some(major) = version
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
            .and_then(|part| part.parse().ok())
        {
            self.server_version = major;
        } else {
            tracing::warn!(
                version,
                assumed = self.server_version,
                "Unrecognized PostgreSQL server version"
            );
        }
        self
    }
}
