//! Error types for the sqlwrite pipeline.
//!
//! The error type is intentionally large to carry full context: concurrency
//! failures list every command that did not affect the expected rows.

use std::fmt;

/// The main error type.
#[derive(Debug)]
pub enum Error {
    /// Connection-level failure reported by the underlying driver.
    Connection(ConnectionError),
    /// A statement failed on the server.
    Query(QueryError),
    /// The driver returned data the pipeline could not interpret.
    Protocol(ProtocolError),
    /// The update pipeline could not build or consume a batch.
    Update(UpdateError),
    /// One or more commands affected an unexpected number of rows.
    Concurrency(ConcurrencyError),
    /// Invalid configuration.
    Config(ConfigError),
    /// Value conversion failure.
    Type(TypeError),
    /// Free-form error.
    Custom(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Could not talk to the server.
    Connect,
    /// The connection was closed while a batch was in flight.
    Closed,
    /// A transaction operation failed.
    Transaction,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Syntax,
    Constraint,
    Deadlock,
    Serialization,
    Timeout,
    Cancelled,
    Database,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// SQLSTATE code, when the server supplied one.
    pub sqlstate: Option<String>,
    /// The SQL text that failed.
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
}

/// What went wrong while building or consuming a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    /// The reader ran out of result sets before every mapping was consumed.
    MissingResultSet,
    /// A result row lacked a column that had to be propagated.
    MissingColumn,
    /// A positional result row referenced a command outside the result set.
    InvalidPosition,
    /// The operation is not supported by the provider.
    Unsupported,
    /// A batch was used in the wrong state (e.g. adding after completion).
    InvalidState,
    /// A command could not be rendered (e.g. no key for an UPDATE).
    InvalidCommand,
}

#[derive(Debug)]
pub struct UpdateError {
    pub kind: UpdateErrorKind,
    pub message: String,
}

/// One command that failed its affected-rows check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyFailure {
    /// Index of the command within its batch.
    pub command_index: usize,
    /// Human-readable identity of the row, e.g. `orders(id=7)`.
    pub entry: String,
    pub expected_rows: u64,
    pub actual_rows: u64,
}

/// Aggregate of every concurrency failure observed in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyError {
    pub failures: Vec<ConcurrencyFailure>,
}

impl ConcurrencyError {
    /// Entries of the failed commands, in batch order.
    pub fn entries(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.entry.as_str()).collect()
    }
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Shorthand for an `Error::Update`.
    pub fn update(kind: UpdateErrorKind, message: impl Into<String>) -> Self {
        Error::Update(UpdateError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for an `Error::Config`.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
        })
    }

    /// Shorthand for an `Error::Protocol`.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(ProtocolError {
            message: message.into(),
        })
    }

    /// True if this is an optimistic concurrency failure.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Error::Concurrency(_))
    }

    /// True for errors where retrying the whole save may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(q) => matches!(
                q.kind,
                QueryErrorKind::Deadlock | QueryErrorKind::Serialization | QueryErrorKind::Timeout
            ),
            Error::Connection(c) => c.kind == ConnectionErrorKind::Connect,
            _ => false,
        }
    }

    /// SQLSTATE of a server error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                write!(f, "Query error: {}", e.message)?;
                if let Some(state) = &e.sqlstate {
                    write!(f, " (SQLSTATE {state})")?;
                }
                Ok(())
            }
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Update(e) => write!(f, "Update error ({:?}): {}", e.kind, e.message),
            Error::Concurrency(e) => write!(f, "{e}"),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Type(e) => {
                write!(f, "Type error: expected {}, found {}", e.expected, e.actual)?;
                if let Some(col) = &e.column {
                    write!(f, " in column '{col}'")?;
                }
                Ok(())
            }
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl fmt::Display for ConcurrencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The database operation was expected to affect rows for {} command(s) but did not: ",
            self.failures.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "#{} {} expected {} row(s), actual {}",
                failure.command_index, failure.entry, failure.expected_rows, failure.actual_rows
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<ConcurrencyError> for Error {
    fn from(e: ConcurrencyError) -> Self {
        Error::Concurrency(e)
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Error::Update(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_display_lists_every_failure() {
        let err = Error::Concurrency(ConcurrencyError {
            failures: vec![
                ConcurrencyFailure {
                    command_index: 0,
                    entry: "orders(id=1)".into(),
                    expected_rows: 1,
                    actual_rows: 0,
                },
                ConcurrencyFailure {
                    command_index: 3,
                    entry: "orders(id=9)".into(),
                    expected_rows: 1,
                    actual_rows: 0,
                },
            ],
        });
        let text = err.to_string();
        assert!(text.contains("2 command(s)"));
        assert!(text.contains("#0 orders(id=1)"));
        assert!(text.contains("#3 orders(id=9)"));
        assert!(err.is_concurrency_conflict());
    }

    #[test]
    fn test_retryable_kinds() {
        let deadlock = Error::Query(QueryError {
            kind: QueryErrorKind::Deadlock,
            message: "deadlock detected".into(),
            sqlstate: Some("40P01".into()),
            sql: None,
            source: None,
        });
        assert!(deadlock.is_retryable());
        assert_eq!(deadlock.sqlstate(), Some("40P01"));
        assert!(!Error::config("bad").is_retryable());
    }
}
