//! Table metadata consumed when turning tracked entries into commands.
//!
//! Provides `TableSchema` for describing the target of a write at runtime:
//! which columns form the key, which are generated by the database, and
//! which act as optimistic concurrency tokens.

use serde::{Deserialize, Serialize};

use crate::types::SqlType;

/// When the database generates a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueGenerated {
    /// The application always supplies the value.
    #[default]
    Never,
    /// Generated on insert (identity, serial, defaults).
    OnAdd,
    /// Generated on insert and every update (computed columns, row versions).
    OnAddOrUpdate,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name in the database.
    pub name: String,
    /// SQL type.
    pub sql_type: SqlType,
    /// Whether this column is nullable.
    pub nullable: bool,
    /// Whether this is a primary key column.
    pub primary_key: bool,
    /// Database value generation.
    pub generated: ValueGenerated,
    /// Whether the original value is checked on UPDATE/DELETE.
    pub concurrency_token: bool,
}

impl ColumnDef {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: false,
            primary_key: false,
            generated: ValueGenerated::Never,
            concurrency_token: false,
        }
    }

    /// Mark as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as generated on insert (identity / auto-increment).
    pub fn identity(mut self) -> Self {
        self.generated = ValueGenerated::OnAdd;
        self
    }

    /// Mark as computed by the database on every write.
    pub fn computed(mut self) -> Self {
        self.generated = ValueGenerated::OnAddOrUpdate;
        self
    }

    /// Mark as an optimistic concurrency token.
    pub fn concurrency_token(mut self) -> Self {
        self.concurrency_token = true;
        self
    }

    /// A row version: computed on every write and checked as a token.
    pub fn row_version(self) -> Self {
        self.computed().concurrency_token()
    }
}

/// A table whose shape is known at runtime.
///
/// # Example
///
/// ```
/// use sqlwrite_core::schema::{ColumnDef, TableSchema};
/// use sqlwrite_core::types::SqlType;
///
/// let table = TableSchema::new("orders")
///     .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
///     .column(ColumnDef::new("total", SqlType::Decimal));
///
/// assert_eq!(table.key_columns(), vec!["id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a new table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    /// Set the schema (namespace) the table lives in.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column definition (builder form).
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a column definition.
    pub fn add_column(&mut self, column: ColumnDef) {
        self.columns.push(column);
    }

    /// Get the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the schema name.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Get column definitions in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up a column by name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get primary key column names.
    pub fn key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}
