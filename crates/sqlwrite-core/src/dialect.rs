//! SQL dialects understood by the pipeline.

use serde::{Deserialize, Serialize};

use crate::identifiers::{quote_ident, quote_ident_mysql};

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: `$1` placeholders, double-quoted identifiers.
    #[default]
    Postgres,
    /// MySQL / MariaDB: `?` placeholders, backtick identifiers.
    MySql,
    /// SQLite: `?1` placeholders, double-quoted identifiers.
    Sqlite,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql => "?".to_string(),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Quote an identifier for this dialect.
    pub fn quote_ident(self, name: &str) -> String {
        match self {
            Dialect::MySql => quote_ident_mysql(name),
            Dialect::Postgres | Dialect::Sqlite => quote_ident(name),
        }
    }

    /// Quote a possibly schema-qualified table name.
    pub fn quote_table(self, table: &str, schema: Option<&str>) -> String {
        match schema {
            Some(schema) if !schema.is_empty() => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
            }
            _ => self.quote_ident(table),
        }
    }

    /// Hard limit on bound parameters per command text.
    pub const fn max_parameters(self) -> usize {
        match self {
            Dialect::Postgres | Dialect::MySql => 65_535,
            Dialect::Sqlite => 32_766,
        }
    }

    /// Statement terminator between commands of one batch.
    pub const fn statement_terminator(self) -> &'static str {
        ";"
    }

    pub const fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}
