//! SQL generation for SQLite.
//!
//! With `RETURNING` (3.35+) SQLite renders like PostgreSQL. Older libraries
//! re-read generated values with `last_insert_rowid()` and check affected
//! rows with `changes()`. SQLite has no stored procedures.

#![allow(clippy::result_large_err)]

use sqlwrite_core::{Dialect, Result};
use sqlwrite_update::generator::{
    self, AppendResult, BulkAppendResult, UpdateSqlGenerator, bulk_compatible,
};
use sqlwrite_update::{ColumnModification, ModificationCommand, ResultSetMapping, SqlBuilder};

use crate::options::SqliteOptions;

/// SQLite update SQL generator.
#[derive(Debug, Clone, Default)]
pub struct SqliteUpdateSqlGenerator {
    options: SqliteOptions,
}

impl SqliteUpdateSqlGenerator {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    fn append_select_changes(sql: &mut SqlBuilder) -> AppendResult {
        sql.push_str("SELECT changes()").end_statement();
        AppendResult::new(
            ResultSetMapping::LAST_IN_RESULT_SET | ResultSetMapping::ROWS_AFFECTED_ONLY,
            true,
        )
    }

    fn append_select_reads(sql: &mut SqlBuilder, command: &ModificationCommand) {
        sql.push_str("SELECT ")
            .push_ident_list(command.read_columns().map(ColumnModification::column_name))
            .push_str(" FROM ")
            .push_table(command.table(), command.schema())
            .push_str(" WHERE changes() = 1 AND ");
    }
}

impl UpdateSqlGenerator for SqliteUpdateSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn default_max_batch_size(&self) -> usize {
        self.options.max_batch_size
    }

    fn append_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        if self.options.use_returning {
            return generator::append_returning_insert(sql, command);
        }
        let has_columns = generator::append_insert_header(sql, command);
        generator::append_values_clause(sql, command, has_columns);
        sql.end_statement();
        if command.read_columns().next().is_none() {
            return Ok(AppendResult::no_results());
        }
        Self::append_select_reads(sql, command);
        sql.push_str("\"rowid\" = last_insert_rowid()").end_statement();
        Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, true))
    }

    fn append_update_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        if self.options.use_returning {
            return generator::append_returning_update(sql, command);
        }
        generator::append_update_header(sql, command)?;
        generator::append_where_clause(sql, command)?;
        sql.end_statement();
        if command.read_columns().next().is_none() {
            return Ok(Self::append_select_changes(sql));
        }
        Self::append_select_reads(sql, command);
        generator::append_key_predicate(sql, command)?;
        sql.end_statement();
        Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, true))
    }

    fn append_delete_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        if self.options.use_returning {
            return generator::append_returning_delete(sql, command);
        }
        generator::append_delete_header(sql, command);
        generator::append_where_clause(sql, command)?;
        sql.end_statement();
        Ok(Self::append_select_changes(sql))
    }

    fn can_bulk_insert(&self, first: &ModificationCommand, next: &ModificationCommand) -> bool {
        bulk_compatible(first, next)
            && first.read_columns().next().is_none()
            && first.write_columns().next().is_some()
    }

    fn append_bulk_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        commands: &[ModificationCommand],
    ) -> Result<BulkAppendResult> {
        generator::append_multi_row_insert(sql, commands)?;
        sql.end_statement();
        Ok(BulkAppendResult {
            mappings: vec![ResultSetMapping::NO_RESULTS; commands.len()],
            requires_transaction: false,
        })
    }
}
