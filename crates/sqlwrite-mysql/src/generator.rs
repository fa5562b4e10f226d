//! SQL generation for MySQL.
//!
//! MySQL has no `RETURNING`, so every write that needs something back is
//! followed by a `SELECT` in the same command text:
//!
//! - Inserts re-read generated columns with `LAST_INSERT_ID()`.
//! - Updates re-read computed columns by key, or report `ROW_COUNT()`.
//! - Deletes report `ROW_COUNT()`.
//!
//! Both re-reads are guarded by `ROW_COUNT() = 1`, so a missing row is a
//! concurrency failure. Connections must be opened with `CLIENT_FOUND_ROWS`
//! for `ROW_COUNT()` to count matched rather than changed rows.
//!
//! Stored procedure output parameters are emulated with session variables:
//! `SET` them, pass them to `CALL`, then `SELECT` them back.

#![allow(clippy::result_large_err)]

use sqlwrite_core::{Dialect, Error, Result, UpdateErrorKind, sanitize_identifier};
use sqlwrite_update::generator::{
    self, AppendResult, BulkAppendResult, UpdateSqlGenerator, bulk_compatible,
};
use sqlwrite_update::{
    ColumnModification, ModificationCommand, ParameterDirection, ResultSetMapping, SqlBuilder,
};

use crate::options::MySqlOptions;

/// MySQL update SQL generator.
#[derive(Debug, Clone, Default)]
pub struct MySqlUpdateSqlGenerator {
    options: MySqlOptions,
}

impl MySqlUpdateSqlGenerator {
    pub fn new(options: MySqlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MySqlOptions {
        &self.options
    }

    /// `SELECT reads FROM t WHERE ROW_COUNT() = 1 AND <key>`.
    fn append_select_affected(
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
        after_insert: bool,
    ) -> Result<()> {
        if command.key_columns().next().is_none() {
            return Err(Error::update(
                UpdateErrorKind::InvalidCommand,
                format!(
                    "table '{}' needs a key to read generated values back",
                    command.table()
                ),
            ));
        }
        sql.push_str("SELECT ")
            .push_ident_list(command.read_columns().map(ColumnModification::column_name))
            .push_str(" FROM ")
            .push_table(command.table(), command.schema())
            .push_str(" WHERE ROW_COUNT() = 1");
        for col in command.key_columns() {
            sql.push_str(" AND ").push_ident(col.column_name());
            if after_insert && col.is_read() {
                sql.push_str(" = LAST_INSERT_ID()");
            } else {
                sql.push_str(" = ").push_param(None, col.condition_value());
            }
        }
        sql.end_statement();
        Ok(())
    }

    fn append_select_row_count(sql: &mut SqlBuilder) -> AppendResult {
        sql.push_str("SELECT ROW_COUNT()").end_statement();
        AppendResult::new(
            ResultSetMapping::LAST_IN_RESULT_SET | ResultSetMapping::ROWS_AFFECTED_ONLY,
            true,
        )
    }
}

/// Session variable holding an output parameter's value.
fn output_variable(name: &str) -> String {
    format!("@_out_{}", sanitize_identifier(name))
}

impl UpdateSqlGenerator for MySqlUpdateSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn max_parameters(&self) -> usize {
        self.options.max_parameters
    }

    fn default_max_batch_size(&self) -> usize {
        self.options.max_batch_size
    }

    fn append_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        let has_columns = generator::append_insert_header(sql, command);
        generator::append_values_clause(sql, command, has_columns);
        sql.end_statement();
        if command.read_columns().next().is_none() {
            return Ok(AppendResult::no_results());
        }
        Self::append_select_affected(sql, command, true)?;
        Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, true))
    }

    fn append_update_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        generator::append_update_header(sql, command)?;
        generator::append_where_clause(sql, command)?;
        sql.end_statement();
        if command.read_columns().next().is_none() {
            return Ok(Self::append_select_row_count(sql));
        }
        Self::append_select_affected(sql, command, false)?;
        Ok(AppendResult::new(ResultSetMapping::LAST_IN_RESULT_SET, true))
    }

    fn append_delete_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        generator::append_delete_header(sql, command);
        generator::append_where_clause(sql, command)?;
        sql.end_statement();
        Ok(Self::append_select_row_count(sql))
    }

    fn append_stored_procedure_call(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        let Some(procedure) = command.procedure() else {
            return self.append_command(sql, command);
        };
        let start = sql.statement_count();
        tracing::trace!(
            procedure = %procedure.name,
            outputs = procedure.output_parameters().count(),
            "Emulating output parameters with session variables"
        );

        for param in procedure.output_parameters() {
            sql.push_str("SET ").push_str(&output_variable(&param.name)).push_str(" = ");
            if param.direction == ParameterDirection::InputOutput {
                let value =
                    command.procedure_parameter_value(param.column.as_deref(), param.original_value);
                sql.push_param_with(None, &value, param.direction);
            } else {
                sql.push_str("NULL");
            }
            sql.end_statement();
        }

        sql.push_str("CALL ")
            .push_table(&procedure.name, procedure.schema.as_deref())
            .push_str("(");
        for (i, param) in procedure.parameters.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            if param.direction.is_output() {
                sql.push_str(&output_variable(&param.name));
            } else {
                let value =
                    command.procedure_parameter_value(param.column.as_deref(), param.original_value);
                sql.push_param(None, &value);
            }
        }
        sql.push_str(")").end_statement();

        let mut mapping = if procedure.result_columns.is_empty() {
            ResultSetMapping::NO_RESULTS
        } else {
            ResultSetMapping::LAST_IN_RESULT_SET
        };
        if procedure.has_output_parameters() {
            sql.push_str("SELECT ");
            for (i, param) in procedure.output_parameters().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&output_variable(&param.name))
                    .push_str(" AS ")
                    .push_ident(&param.name);
            }
            sql.end_statement();
            mapping |= ResultSetMapping::HAS_OUTPUT_PARAMETERS;
        }

        Ok(AppendResult::new(mapping, sql.statement_count() - start > 1))
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
