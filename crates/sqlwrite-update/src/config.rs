//! Update pipeline configuration.
//!
//! Controls batch sizing and the transaction policy of a save.

#![allow(clippy::result_large_err)]

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlwrite_core::{Error, IsolationLevel, Result};

/// When a save opens its own transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoTransactions {
    /// Only when more than one batch runs or a batch needs one.
    #[default]
    WhenNeeded,
    /// Always.
    Always,
    /// Never; the caller is responsible for atomicity.
    Never,
}

impl FromStr for AutoTransactions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "when_needed" | "auto" => Ok(AutoTransactions::WhenNeeded),
            "always" | "true" | "on" => Ok(AutoTransactions::Always),
            "never" | "false" | "off" => Ok(AutoTransactions::Never),
            other => Err(Error::config(format!(
                "unknown auto-transaction policy '{other}' (expected when_needed, always or never)"
            ))),
        }
    }
}

/// Configuration for saving changes.
///
/// ```
/// use sqlwrite_update::{AutoTransactions, UpdateConfig};
///
/// let config = UpdateConfig::new()
///     .max_batch_size(200)
///     .min_batch_size(4)
///     .auto_transactions(AutoTransactions::Always);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Commands per batch; the provider default when unset.
    pub max_batch_size: Option<usize>,
    /// Batches smaller than this are split into single-command batches.
    pub min_batch_size: usize,
    pub auto_transactions: AutoTransactions,
    /// Wrap the save in a savepoint when running inside a caller's transaction.
    pub use_savepoints: bool,
    pub savepoint_name: String,
    /// Isolation level of transactions the pipeline opens itself.
    pub isolation_level: Option<IsolationLevel>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            min_batch_size: 1,
            auto_transactions: AutoTransactions::WhenNeeded,
            use_savepoints: true,
            savepoint_name: "sqlwrite_savepoint".to_string(),
            isolation_level: None,
        }
    }
}

impl UpdateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SQLWRITE_MAX_BATCH_SIZE`,
    /// `SQLWRITE_MIN_BATCH_SIZE` and `SQLWRITE_AUTO_TRANSACTIONS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`UpdateConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("SQLWRITE_MAX_BATCH_SIZE") {
            config.max_batch_size = Some(parse_count("SQLWRITE_MAX_BATCH_SIZE", &raw)?);
        }
        if let Some(raw) = lookup("SQLWRITE_MIN_BATCH_SIZE") {
            config.min_batch_size = parse_count("SQLWRITE_MIN_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("SQLWRITE_AUTO_TRANSACTIONS") {
            config.auto_transactions = raw.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    pub fn min_batch_size(mut self, size: usize) -> Self {
        self.min_batch_size = size;
        self
    }

    pub fn auto_transactions(mut self, policy: AutoTransactions) -> Self {
        self.auto_transactions = policy;
        self
    }

    pub fn use_savepoints(mut self, enabled: bool) -> Self {
        self.use_savepoints = enabled;
        self
    }

    pub fn savepoint_name(mut self, name: impl Into<String>) -> Self {
        self.savepoint_name = name.into();
        self
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    /// Reject sizes of zero, a minimum above the maximum, and savepoint
    /// names that are not plain identifiers.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == Some(0) {
            return Err(Error::config("max_batch_size must be at least 1"));
        }
        if self.min_batch_size == 0 {
            return Err(Error::config("min_batch_size must be at least 1"));
        }
        if let Some(max) = self.max_batch_size {
            if self.min_batch_size > max {
                return Err(Error::config(format!(
                    "min_batch_size ({}) exceeds max_batch_size ({max})",
                    self.min_batch_size
                )));
            }
        }
        sqlwrite_core::validate_plain_identifier(&self.savepoint_name)
            .map_err(|e| Error::config(format!("invalid savepoint name: {e}")))?;
        Ok(())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| Error::config(format!("{key}='{raw}' is not a count: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = UpdateConfig::default();
        assert_eq!(config.max_batch_size, None);
        assert_eq!(config.min_batch_size, 1);
        assert_eq!(config.auto_transactions, AutoTransactions::WhenNeeded);
        assert!(config.use_savepoints);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = UpdateConfig::from_lookup(lookup(&[
            ("SQLWRITE_MAX_BATCH_SIZE", "50"),
            ("SQLWRITE_MIN_BATCH_SIZE", " 3 "),
            ("SQLWRITE_AUTO_TRANSACTIONS", "Never"),
        ]))
        .unwrap();
        assert_eq!(config.max_batch_size, Some(50));
        assert_eq!(config.min_batch_size, 3);
        assert_eq!(config.auto_transactions, AutoTransactions::Never);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = UpdateConfig::from_lookup(lookup(&[("SQLWRITE_MAX_BATCH_SIZE", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("SQLWRITE_MAX_BATCH_SIZE"));

        assert!(
            UpdateConfig::from_lookup(lookup(&[("SQLWRITE_AUTO_TRANSACTIONS", "sometimes")]))
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = UpdateConfig::new().max_batch_size(2).min_batch_size(5);
        assert!(config.validate().is_err());
        assert!(UpdateConfig::new().savepoint_name("bad name;").validate().is_err());
    }

    #[test]
    fn test_serde_uses_defaults_for_missing_fields() {
        let config: UpdateConfig =
            serde_json::from_str(r#"{"auto_transactions":"always","max_batch_size":10}"#).unwrap();
        assert_eq!(config.auto_transactions, AutoTransactions::Always);
        assert_eq!(config.max_batch_size, Some(10));
        assert_eq!(config.savepoint_name, "sqlwrite_savepoint");
    }
}
