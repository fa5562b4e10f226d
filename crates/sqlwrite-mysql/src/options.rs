//! MySQL generator options.

use serde::{Deserialize, Serialize};

/// Limits the generator adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlOptions {
    /// Placeholders per command text. The protocol allows 65535; servers with
    /// a small `max_allowed_packet` may need less.
    pub max_parameters: usize,
    /// Commands per batch when the caller does not configure a limit.
    pub max_batch_size: usize,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self {
            max_parameters: 65_535,
            max_batch_size: 1000,
        }
    }
}

impl MySqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_parameters(mut self, max: usize) -> Self {
        self.max_parameters = max;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }
}
