//! SQL generation for PostgreSQL.
//!
//! Every write reports back through `RETURNING`: generated columns for inserts
//! and updates, and `RETURNING 1` where only the affected-row check matters.
//! Inserts without generated columns are folded into one multi-row `VALUES`
//! list. On servers with `MERGE ... RETURNING`, inserts that do read values
//! back are folded into a positional `MERGE` whose rows carry their index in
//! a trailing `_position` column.

#![allow(clippy::result_large_err)]

use sqlwrite_core::{Dialect, Error, Result, UpdateErrorKind};
use sqlwrite_update::generator::{
    self, AppendResult, BulkAppendResult, UpdateSqlGenerator, bulk_compatible,
};
use sqlwrite_update::{
    ColumnModification, ModificationCommand, ParameterDirection, ResultSetMapping, SqlBuilder,
};

use crate::options::PostgresOptions;

/// Name of the column that carries a row's index in positional results.
pub const POSITION_COLUMN: &str = "_position";

/// PostgreSQL update SQL generator.
#[derive(Debug, Clone, Default)]
pub struct PostgresUpdateSqlGenerator {
    options: PostgresOptions,
}

impl PostgresUpdateSqlGenerator {
    pub fn new(options: PostgresOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PostgresOptions {
        &self.options
    }

    /// `MERGE INTO t USING (VALUES ...) AS i (cols, _position) ON FALSE
    /// WHEN NOT MATCHED THEN INSERT ... RETURNING reads, i._position`.
    fn append_merge_insert(
        &self,
        sql: &mut SqlBuilder,
        commands: &[ModificationCommand],
    ) -> Result<BulkAppendResult> {
        let first = &commands[0];
        let writes: Vec<&ColumnModification> = first.write_columns().collect();
        let reads: Vec<&str> = first
            .read_columns()
            .map(ColumnModification::column_name)
            .collect();
        let target = sql.dialect().quote_table(first.table(), first.schema());

        sql.push_str("MERGE INTO ")
            .push_str(&target)
            .push_str(" USING (VALUES ");
        for (position, command) in commands.iter().enumerate() {
            if position > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(");
            for (i, col) in command.write_columns().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_param(col.parameter_name(), col.value());
                // Types are inferred from the first row of a VALUES list.
                if position == 0 {
                    if let Some(ty) = writes[i].column_type() {
                        sql.push_str("::").push_str(ty.sql_name(Dialect::Postgres));
                    }
                }
            }
            sql.push_str(&format!(", {position})"));
        }
        sql.push_str(") AS i (")
            .push_ident_list(writes.iter().map(|c| c.column_name()))
            .push_str(", ")
            .push_ident(POSITION_COLUMN)
            .push_str(") ON FALSE WHEN NOT MATCHED THEN INSERT (")
            .push_ident_list(writes.iter().map(|c| c.column_name()))
            .push_str(") VALUES (");
        for (i, col) in writes.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("i.").push_ident(col.column_name());
        }
        sql.push_str(") RETURNING ");
        for col in &reads {
            sql.push_str(&target).push_str(".").push_ident(col).push_str(", ");
        }
        sql.push_str("i.").push_ident(POSITION_COLUMN).end_statement();

        Ok(BulkAppendResult {
            mappings: ResultSetMapping::positional_group(commands.len()),
            requires_transaction: false,
        })
    }
}

impl UpdateSqlGenerator for PostgresUpdateSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn default_max_batch_size(&self) -> usize {
        self.options.max_batch_size
    }

    fn append_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        generator::append_returning_insert(sql, command)
    }

    fn append_update_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        generator::append_returning_update(sql, command)
    }

    fn append_delete_operation(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        generator::append_returning_delete(sql, command)
    }

    /// `CALL proc("a" => $1, "out" => NULL)`; OUT and INOUT parameters come
    /// back as one row.
    fn append_stored_procedure_call(
        &self,
        sql: &mut SqlBuilder,
        command: &ModificationCommand,
    ) -> Result<AppendResult> {
        let Some(procedure) = command.procedure() else {
            return self.append_command(sql, command);
        };
        if !procedure.result_columns.is_empty() {
            return Err(Error::update(
                UpdateErrorKind::Unsupported,
                format!(
                    "procedure '{}': PostgreSQL procedures return values through OUT parameters, not result columns",
                    procedure.name
                ),
            ));
        }

        sql.push_str("CALL ")
            .push_table(&procedure.name, procedure.schema.as_deref())
            .push_str("(");
        for (i, param) in procedure.parameters.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_ident(&param.name).push_str(" => ");
            if param.direction == ParameterDirection::Output {
                sql.push_str("NULL");
            } else {
                let value =
                    command.procedure_parameter_value(param.column.as_deref(), param.original_value);
                sql.push_param_with(None, &value, param.direction);
            }
        }
        sql.push_str(")").end_statement();

        let mapping = if procedure.has_output_parameters() {
            ResultSetMapping::HAS_OUTPUT_PARAMETERS
        } else {
            ResultSetMapping::NO_RESULTS
        };
        Ok(AppendResult::new(mapping, false))
    }

    fn can_bulk_insert(&self, first: &ModificationCommand, next: &ModificationCommand) -> bool {
        bulk_compatible(first, next)
            && first.write_columns().next().is_some()
            && (first.read_columns().next().is_none() || self.options.supports_merge_returning())
    }

    fn append_bulk_insert_operation(
        &self,
        sql: &mut SqlBuilder,
        commands: &[ModificationCommand],
    ) -> Result<BulkAppendResult> {
        let Some(first) = commands.first() else {
            return Ok(BulkAppendResult {
                mappings: Vec::new(),
                requires_transaction: false,
            });
        };
        if first.read_columns().next().is_none() && first.write_columns().next().is_some() {
            generator::append_multi_row_insert(sql, commands)?;
            sql.end_statement();
            return Ok(BulkAppendResult {
                mappings: vec![ResultSetMapping::NO_RESULTS; commands.len()],
                requires_transaction: false,
            });
        }
        if self.options.supports_merge_returning() && first.write_columns().next().is_some() {
            return self.append_merge_insert(sql, commands);
        }

        let mut mappings = Vec::with_capacity(commands.len());
        for command in commands {
            mappings.push(self.append_insert_operation(sql, command)?.mapping);
        }
        Ok(BulkAppendResult {
            mappings,
            requires_transaction: commands.len() > 1,
        })
    }
}
