//! The provider seam: rendering commands into SQL.
//!
//! Each provider crate implements [`UpdateSqlGenerator`] for its dialect. The
//! free functions in this module render the pieces every dialect shares (column
//! lists, `VALUES` rows, `SET` lists, `WHERE` conditions) so providers only
//! spell out what differs: how generated values and row counts come back.

#![allow(clippy::result_large_err)]

use std::fmt;

use sqlwrite_core::{Dialect, EntityState, Error, Result, UpdateErrorKind};

use crate::command::{ColumnModification, ModificationCommand};
use crate::mapping::ResultSetMapping;
use crate::sql_builder::SqlBuilder;

/// Outcome of rendering one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    /// How the command's results appear in the reader.
    pub mapping: ResultSetMapping,
    /// The rendering emitted more than one statement.
    pub requires_transaction: bool,
}

impl AppendResult {
    pub fn new(mapping: ResultSetMapping, requires_transaction: bool) -> Self {
        Self {
            mapping,
            requires_transaction,
        }
    }

    /// A single statement producing no result set.
    pub fn no_results() -> Self {
        Self::new(ResultSetMapping::NO_RESULTS, false)
    }
}

/// Outcome of rendering a group of inserts as one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAppendResult {
    /// One mapping per command, in order.
    pub mappings: Vec<ResultSetMapping>,
    pub requires_transaction: bool,
}

/// Renders provider-correct SQL for modification commands.
pub trait UpdateSqlGenerator: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    /// Bound-parameter limit for one command text.
    fn max_parameters(&self) -> usize {
        self.dialect().max_parameters()
    }

    /// Commands per batch when the caller does not configure a limit.
    fn default_max_batch_size(&self) -> usize {
        1000
    }

    fn append_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult>;

    fn append_update_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult>;

    fn append_delete_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult>;

    /// Render a call to the command's stored procedure.
    fn append_stored_procedure_call(
        &self,
        _sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        Err(Error::update(
            UpdateErrorKind::Unsupported,
            format!(
                "{} does not support stored procedure mappings (command for '{}')",
                self.dialect().name(),
                command.table()
            ),
        ))
    }

    /// Dialect preamble written once at the start of a batch.
    fn append_batch_header(&self, _sql: &mut SqlBuilder) {}

    /// Render a command according to its state and procedure mapping.
    fn append_command(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        if command.procedure().is_some() {
            return self.append_stored_procedure_call(sql, command);
        }
        match command.entity_state() {
            EntityState::Added => self.append_insert_operation(sql, command),
            EntityState::Modified => self.append_update_operation(sql, command),
            EntityState::Deleted => self.append_delete_operation(sql, command),
            EntityState::Unchanged => Err(Error::update(
                UpdateErrorKind::InvalidCommand,
                format!("command for '{}' has nothing to save", command.table()),
            )),
        }
    }

    /// Whether `next` may join a bulk insert started by `first`.
    fn can_bulk_insert(&self, first: &ModificationCommand, next: &ModificationCommand) -> bool {
        bulk_compatible(first, next) && first.read_columns().next().is_none()
    }

    /// Render a group of compatible inserts. The default renders one insert
    /// per command.
    fn append_bulk_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        commands: &[ModificationCommand],
    ) -> Result<BulkAppendResult> {
        let mut mappings = Vec::with_capacity(commands.len());
        let mut requires_transaction = commands.len() > 1;
        for command in commands {
            let result = self.append_insert_operation(sql, command)?;
            requires_transaction |= result.requires_transaction;
            mappings.push(result.mapping);
        }
        Ok(BulkAppendResult {
            mappings,
            requires_transaction,
        })
    }
}

/// Same table, both inserts, no procedure, identical write and read columns.
pub fn bulk_compatible(first: &ModificationCommand, next: &ModificationCommand) -> bool {
    fn names<'a>(cols: impl Iterator<Item = &'a ColumnModification>) -> Vec<&'a str> {
        cols.map(ColumnModification::column_name).collect()
    }

    first.entity_state() == EntityState::Added
        && next.entity_state() == EntityState::Added
        && first.procedure().is_none()
        && next.procedure().is_none()
        && first.table() == next.table()
        && first.schema() == next.schema()
        && names(first.write_columns()) == names(next.write_columns())
        && names(first.read_columns()) == names(next.read_columns())
}

/// `INSERT INTO t (a, b)`, or the dialect's all-defaults form when nothing is
/// written. Returns whether a column list was written.
pub fn append_insert_header(sql: &mut SqlBuilder, command: &ModificationCommand) -> bool {
    sql.push_str("INSERT INTO ")
        .push_table(command.table(), command.schema());
    let writes: Vec<&str> = command
        .write_columns()
        .map(ColumnModification::column_name)
        .collect();
    if writes.is_empty() {
        return false;
    }
    sql.push_str(" (").push_ident_list(writes).push_str(")");
    true
}

/// ` VALUES (...)` for one command, or the all-defaults form.
pub fn append_values_clause(sql: &mut SqlBuilder, command: &ModificationCommand, has_columns: bool) {
    if has_columns {
        sql.push_str(" VALUES ");
        append_values_row(sql, command);
    } else if sql.dialect() == Dialect::MySql {
        sql.push_str(" () VALUES ()");
    } else {
        sql.push_str(" DEFAULT VALUES");
    }
}

/// `($1, $2)` binding the command's write values.
pub fn append_values_row(sql: &mut SqlBuilder, command: &ModificationCommand) {
    sql.push_str("(");
    for (i, col) in command.write_columns().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_param(col.parameter_name(), col.value());
    }
    sql.push_str(")");
}

/// One `INSERT ... VALUES (...), (...)` statement for commands without reads.
pub fn append_multi_row_insert(sql: &mut SqlBuilder, commands: &[ModificationCommand]) -> Result<()> {
    let Some(first) = commands.first() else {
        return Ok(());
    };
    if !append_insert_header(sql, first) {
        return Err(Error::update(
            UpdateErrorKind::InvalidCommand,
            format!("cannot bulk insert into '{}' without columns", first.table()),
        ));
    }
    sql.push_str(" VALUES ");
    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            sql.push_str(",\n");
        }
        append_values_row(sql, command);
    }
    Ok(())
}

/// `UPDATE t SET a = $1, b = $2`.
pub fn append_update_header(sql: &mut SqlBuilder, command: &ModificationCommand) -> Result<()> {
    sql.push_str("UPDATE ")
        .push_table(command.table(), command.schema())
        .push_str(" SET ");
    let mut any = false;
    for col in command.write_columns() {
        if any {
            sql.push_str(", ");
        }
        sql.push_ident(col.column_name())
            .push_str(" = ")
            .push_param(col.parameter_name(), col.value());
        any = true;
    }
    if any {
        Ok(())
    } else {
        Err(Error::update(
            UpdateErrorKind::InvalidCommand,
            format!("update of {} writes no columns", command.entry_key()),
        ))
    }
}

/// `DELETE FROM t`.
pub fn append_delete_header(sql: &mut SqlBuilder, command: &ModificationCommand) {
    sql.push_str("DELETE FROM ")
        .push_table(command.table(), command.schema());
}

/// ` WHERE k = $3 AND token IS NULL`.
pub fn append_where_clause(sql: &mut SqlBuilder, command: &ModificationCommand) -> Result<()> {
    let mut any = false;
    for col in command.condition_columns() {
        sql.push_str(if any { " AND " } else { " WHERE " });
        append_condition(sql, col);
        any = true;
    }
    if any {
        Ok(())
    } else {
        Err(Error::update(
            UpdateErrorKind::InvalidCommand,
            format!("command for '{}' has no conditions", command.table()),
        ))
    }
}

/// `col = $n`, or `col IS NULL` for a null comparison value.
pub fn append_condition(sql: &mut SqlBuilder, col: &ColumnModification) {
    sql.push_ident(col.column_name());
    let value = col.condition_value();
    if value.is_null() {
        sql.push_str(" IS NULL");
    } else {
        sql.push_str(" = ")
            .push_param(col.condition_parameter_name(), value);
    }
}

/// `k1 = ? AND k2 = ?` on key columns, for follow-up SELECTs that re-read
/// the row just written. Fails for commands without a key.
pub fn append_key_predicate(sql: &mut SqlBuilder, command: &ModificationCommand) -> Result<()> {
    if command.key_columns().next().is_none() {
        return Err(Error::update(
            UpdateErrorKind::InvalidCommand,
            format!(
                "table '{}' needs a key to read computed values back",
                command.table()
            ),
        ));
    }
    for (i, col) in command.key_columns().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        sql.push_ident(col.column_name())
            .push_str(" = ")
            .push_param(None, col.condition_value());
    }
    Ok(())
}

/// ` RETURNING a, b`, or ` RETURNING 1` when only a row is needed.
pub fn append_returning_clause(sql: &mut SqlBuilder, command: &ModificationCommand) {
    let reads: Vec<&str> = command
        .read_columns()
        .map(ColumnModification::column_name)
        .collect();
    sql.push_str(" RETURNING ");
    if reads.is_empty() {
        sql.push_str("1");
    } else {
        sql.push_ident_list(reads);
    }
}

/// Insert rendered with `RETURNING` for generated columns.
pub fn append_returning_insert(
    sql: &mut SqlBuilder,
    command: &ModificationCommand,
) -> Result<AppendResult> {
    let has_columns = append_insert_header(sql, command);
    append_values_clause(sql, command, has_columns);
    let mapping = if command.read_columns().next().is_some() {
        append_returning_clause(sql, command);
        ResultSetMapping::LAST_IN_RESULT_SET
    } else {
        ResultSetMapping::NO_RESULTS
    };
    sql.end_statement();
    Ok(AppendResult::new(mapping, false))
}

/// Update rendered with `RETURNING`; the returned row doubles as the
/// affected-row check.
pub fn append_returning_update(
    sql: &mut SqlBuilder,
    command: &ModificationCommand,
) -> Result<AppendResult> {
    append_update_header(sql, command)?;
    append_where_clause(sql, command)?;
    append_returning_clause(sql, command);
    sql.end_statement();
    Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, false))
}

/// Delete rendered with `RETURNING 1`.
pub fn append_returning_delete(
    sql: &mut SqlBuilder,
    command: &ModificationCommand,
) -> Result<AppendResult> {
    append_delete_header(sql, command);
    append_where_clause(sql, command)?;
    sql.push_str(" RETURNING 1");
    sql.end_statement();
    Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, false))
}
