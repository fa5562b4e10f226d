//! Logical SQL column types.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Column type as declared in a table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Text,
    Blob,
    Json,
    Timestamp,
    Uuid,
}

impl SqlType {
    /// Type name used when a dialect needs an explicit cast or variable type.
    pub const fn sql_name(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (SqlType::Boolean, Dialect::MySql) => "TINYINT(1)",
            (SqlType::Boolean, _) => "BOOLEAN",
            (SqlType::SmallInt, _) => "SMALLINT",
            (SqlType::Integer, Dialect::Sqlite) => "INTEGER",
            (SqlType::Integer, _) => "INT",
            (SqlType::BigInt, Dialect::Sqlite) => "INTEGER",
            (SqlType::BigInt, _) => "BIGINT",
            (SqlType::Real, Dialect::Postgres) => "REAL",
            (SqlType::Real, Dialect::MySql) => "FLOAT",
            (SqlType::Real | SqlType::Double, Dialect::Sqlite) => "REAL",
            (SqlType::Double, Dialect::Postgres) => "DOUBLE PRECISION",
            (SqlType::Double, Dialect::MySql) => "DOUBLE",
            (SqlType::Decimal, Dialect::Sqlite) => "NUMERIC",
            (SqlType::Decimal, _) => "DECIMAL",
            (SqlType::Text, _) => "TEXT",
            (SqlType::Blob, Dialect::Postgres) => "BYTEA",
            (SqlType::Blob, _) => "BLOB",
            (SqlType::Json, Dialect::Postgres) => "JSONB",
            (SqlType::Json, Dialect::MySql) => "JSON",
            (SqlType::Json, Dialect::Sqlite) => "TEXT",
            (SqlType::Timestamp, Dialect::Postgres) => "TIMESTAMPTZ",
            (SqlType::Timestamp, Dialect::MySql) => "DATETIME(6)",
            (SqlType::Timestamp, Dialect::Sqlite) => "TEXT",
            (SqlType::Uuid, Dialect::Postgres) => "UUID",
            (SqlType::Uuid, Dialect::MySql) => "CHAR(36)",
            (SqlType::Uuid, Dialect::Sqlite) => "TEXT",
        }
    }
}
