//! Tracked entries: the change tracker's view of one row.
//!
//! Provides `TrackedEntry` for rows whose shape is only known at runtime.
//! An entry remembers the values it was loaded with, the values it has now,
//! and which columns changed; the update pipeline turns it into a
//! modification command.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::column_set::ColumnSet;
use crate::row::Row;
use crate::schema::TableSchema;
use crate::value::Value;

/// Lifecycle state of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    /// Loaded and not changed; produces no command.
    Unchanged,
    /// New row to INSERT.
    Added,
    /// Existing row with changed columns to UPDATE.
    Modified,
    /// Existing row to DELETE.
    Deleted,
}

/// A row tracked for writing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sqlwrite_core::entry::{EntityState, TrackedEntry};
/// use sqlwrite_core::schema::{ColumnDef, TableSchema};
/// use sqlwrite_core::types::SqlType;
/// use sqlwrite_core::value::Value;
///
/// let table = Arc::new(
///     TableSchema::new("users")
///         .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
///         .column(ColumnDef::new("name", SqlType::Text)),
/// );
///
/// let mut entry = TrackedEntry::existing(Arc::clone(&table), [("id", Value::BigInt(1)), ("name", "Ada".into())]);
/// entry.set("name", Value::Text("Grace".into()));
///
/// assert_eq!(entry.state(), EntityState::Modified);
/// assert_eq!(entry.original("name").unwrap().as_str(), Some("Ada"));
/// ```
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    table: Arc<TableSchema>,
    state: EntityState,
    current: HashMap<String, Value>,
    original: HashMap<String, Value>,
    modified: ColumnSet,
}

impl TrackedEntry {
    /// A new row that will be inserted.
    pub fn added(table: Arc<TableSchema>) -> Self {
        let len = table.columns().len();
        Self {
            table,
            state: EntityState::Added,
            current: HashMap::new(),
            original: HashMap::new(),
            modified: ColumnSet::empty(len),
        }
    }

    /// A row loaded from the database with the given values.
    pub fn existing<K, I>(table: Arc<TableSchema>, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let len = table.columns().len();
        let current: HashMap<String, Value> =
            values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            table,
            state: EntityState::Unchanged,
            original: current.clone(),
            current,
            modified: ColumnSet::empty(len),
        }
    }

    /// Populate an existing entry from a database row.
    pub fn from_row(table: Arc<TableSchema>, row: &Row) -> Self {
        let values: Vec<(String, Value)> = table
            .columns()
            .iter()
            .filter_map(|col| {
                row.get_by_name(&col.name)
                    .map(|value| (col.name.clone(), value.clone()))
            })
            .collect();
        Self::existing(table, values)
    }

    /// Set a column's current value, marking it modified on existing rows.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        if let Some(idx) = self.table.column_index(&column) {
            match self.state {
                EntityState::Added => self.modified.insert(idx),
                EntityState::Deleted => {}
                EntityState::Unchanged | EntityState::Modified => {
                    if self.original.get(&column) == Some(&value) {
                        self.modified.remove(idx);
                    } else {
                        self.modified.insert(idx);
                    }
                    self.state = if self.modified.count() > 0 {
                        EntityState::Modified
                    } else {
                        EntityState::Unchanged
                    };
                }
            }
        }
        self.current.insert(column, value);
    }

    /// Mark the row for deletion.
    pub fn mark_deleted(&mut self) {
        self.state = EntityState::Deleted;
    }

    /// Accept the current values as the new baseline after a successful save.
    pub fn accept_changes(&mut self) {
        self.original = self.current.clone();
        self.modified = ColumnSet::empty(self.table.columns().len());
        self.state = EntityState::Unchanged;
    }

    pub fn table(&self) -> &Arc<TableSchema> {
        &self.table
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Current value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.current.get(column)
    }

    /// Value the column had when the entry was loaded.
    pub fn original(&self, column: &str) -> Option<&Value> {
        self.original.get(column)
    }

    /// Check if a column has a current value.
    pub fn has(&self, column: &str) -> bool {
        self.current.contains_key(column)
    }

    /// Check whether a column was modified.
    pub fn is_modified(&self, column: &str) -> bool {
        self.table
            .column_index(column)
            .is_some_and(|idx| self.modified.contains(idx))
    }

    /// Modified column set.
    pub fn modified(&self) -> &ColumnSet {
        &self.modified
    }

    /// Get primary key values, preferring originals for existing rows.
    pub fn key_values(&self) -> Vec<Value> {
        self.table
            .key_columns()
            .into_iter()
            .map(|c| {
                self.original
                    .get(c)
                    .or_else(|| self.current.get(c))
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}
