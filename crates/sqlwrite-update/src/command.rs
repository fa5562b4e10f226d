//! Modification commands: one pending row-level change each.

#![allow(clippy::result_large_err)]

use serde::{Deserialize, Serialize};
use sqlwrite_core::{
    EntityState, Error, Result, Row, SqlType, TrackedEntry, UpdateErrorKind, Value, ValueGenerated,
};

use crate::procedure::{ParameterDirection, RowsAffectedSource, StoredProcedureMapping};

/// A single column's read/write intent within a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnModification {
    column_name: String,
    sql_type: Option<SqlType>,
    is_read: bool,
    is_write: bool,
    is_key: bool,
    is_condition: bool,
    is_concurrency_token: bool,
    is_nullable: bool,
    value: Value,
    original_value: Option<Value>,
    parameter_name: Option<String>,
    original_parameter_name: Option<String>,
    direction: ParameterDirection,
    propagated: bool,
}

impl ColumnModification {
    /// A column with no intent yet; combine with the builder methods below.
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            sql_type: None,
            is_read: false,
            is_write: false,
            is_key: false,
            is_condition: false,
            is_concurrency_token: false,
            is_nullable: true,
            value: Value::Null,
            original_value: None,
            parameter_name: None,
            original_parameter_name: None,
            direction: ParameterDirection::Input,
            propagated: false,
        }
    }

    /// Write `value` into the column.
    pub fn write(mut self, value: impl Into<Value>) -> Self {
        self.is_write = true;
        self.value = value.into();
        self
    }

    /// Read the column back after the write.
    pub fn read(mut self) -> Self {
        self.is_read = true;
        self.direction = if self.is_write {
            ParameterDirection::InputOutput
        } else {
            ParameterDirection::Output
        };
        self
    }

    /// Part of the row's key.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Use the column in the WHERE clause, compared with `original`.
    pub fn condition(mut self, original: impl Into<Value>) -> Self {
        self.is_condition = true;
        self.original_value = Some(original.into());
        self
    }

    /// Use the column in the WHERE clause, compared with its current value.
    pub fn current_condition(mut self) -> Self {
        self.is_condition = true;
        self
    }

    /// Mark as an optimistic concurrency token.
    pub fn concurrency_token(mut self) -> Self {
        self.is_concurrency_token = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn column_type(&self) -> Option<SqlType> {
        self.sql_type
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn is_write(&self) -> bool {
        self.is_write
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn is_condition(&self) -> bool {
        self.is_condition
    }

    pub fn is_concurrency_token(&self) -> bool {
        self.is_concurrency_token
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// Current value (or the propagated value after execution).
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn original_value(&self) -> Option<&Value> {
        self.original_value.as_ref()
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter_name.as_deref()
    }

    pub fn original_parameter_name(&self) -> Option<&str> {
        self.original_parameter_name.as_deref()
    }

    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// True once a database-generated value was written back.
    pub fn is_propagated(&self) -> bool {
        self.propagated
    }

    /// The current value is bound as a parameter.
    pub fn use_current_value_parameter(&self) -> bool {
        self.is_write || (self.is_condition && self.original_value.is_none())
    }

    /// The original value is bound as a parameter.
    pub fn use_original_value_parameter(&self) -> bool {
        self.is_condition && self.original_value.is_some()
    }

    /// Value compared in the WHERE clause.
    pub fn condition_value(&self) -> &Value {
        self.original_value.as_ref().unwrap_or(&self.value)
    }

    /// Parameter name bound for the WHERE comparison.
    pub fn condition_parameter_name(&self) -> Option<&str> {
        if self.use_original_value_parameter() {
            self.original_parameter_name()
        } else {
            self.parameter_name()
        }
    }

    fn set_propagated(&mut self, value: Value) {
        self.value = value;
        self.propagated = true;
    }
}

/// Where a command is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandState {
    /// Not yet part of a batch (or withdrawn from one).
    Pending,
    /// Accepted into a batch that has not run yet.
    Batched,
    /// Sent to the database; nothing to propagate.
    Executed,
    /// Sent to the database and generated values were written back.
    Propagated,
    /// The batch failed; the database changes were discarded.
    RolledBack,
}

/// Hands out batch-unique parameter names (`p0`, `p1`, ...).
#[derive(Debug, Clone, Default)]
pub struct ParameterNameGenerator {
    next: usize,
}

impl ParameterNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self) -> String {
        let name = format!("p{}", self.next);
        self.next += 1;
        name
    }

    /// Position of the next name, for rolling back.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn reset_to(&mut self, position: usize) {
        self.next = position;
    }
}

/// One logical row-level change.
///
/// # Example
///
/// ```
/// use sqlwrite_core::{EntityState, Value};
/// use sqlwrite_update::{ColumnModification, ModificationCommand};
///
/// let cmd = ModificationCommand::new("orders", EntityState::Modified)
///     .column(ColumnModification::new("id").key().condition(7i64))
///     .column(ColumnModification::new("total").write(Value::Decimal("9.50".into())))
///     .column(ColumnModification::new("version").concurrency_token().condition(3i64));
///
/// assert_eq!(cmd.entry_key(), "orders(id=7)");
/// assert_eq!(cmd.parameter_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationCommand {
    table: String,
    schema: Option<String>,
    entity_state: EntityState,
    columns: Vec<ColumnModification>,
    procedure: Option<StoredProcedureMapping>,
    state: CommandState,
    rows_affected: Option<u64>,
    entry_index: Option<usize>,
}

impl ModificationCommand {
    /// A command with no columns yet.
    pub fn new(table: impl Into<String>, entity_state: EntityState) -> Self {
        Self {
            table: table.into(),
            schema: None,
            entity_state,
            columns: Vec::new(),
            procedure: None,
            state: CommandState::Pending,
            rows_affected: None,
            entry_index: None,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a column modification (builder form).
    pub fn column(mut self, column: ColumnModification) -> Self {
        self.columns.push(column);
        self
    }

    /// Remember which caller-side entry this command was built from.
    pub fn with_entry_index(mut self, index: usize) -> Self {
        self.entry_index = Some(index);
        self
    }

    pub fn entry_index(&self) -> Option<usize> {
        self.entry_index
    }

    /// Bind the command to a stored procedure.
    pub fn with_procedure(mut self, procedure: StoredProcedureMapping) -> Self {
        self.procedure = Some(procedure);
        self
    }

    /// Build the command for a tracked entry.
    ///
    /// - Added: writes every non-generated column that has a value and reads
    ///   generated columns back.
    /// - Modified: writes the modified non-key columns; keys and concurrency
    ///   tokens become conditions on their original values; computed columns
    ///   are read back.
    /// - Deleted: keys and concurrency tokens become conditions.
    pub fn from_entry(entry: &TrackedEntry) -> Result<Self> {
        let table = entry.table();
        let mut cmd = Self::new(table.name(), entry.state());
        cmd.schema = table.schema().map(str::to_string);

        match entry.state() {
            EntityState::Unchanged => {
                return Err(Error::update(
                    UpdateErrorKind::InvalidCommand,
                    format!("entry for '{}' is unchanged; nothing to save", table.name()),
                ));
            }
            EntityState::Added => {
                for def in table.columns() {
                    let mut col = ColumnModification::new(&def.name).sql_type(def.sql_type);
                    if !def.nullable {
                        col = col.not_null();
                    }
                    if def.primary_key {
                        col = col.key();
                    }
                    let supplied = entry.get(&def.name).filter(|v| !v.is_null());
                    match (def.generated, supplied) {
                        (ValueGenerated::Never, None) => {
                            if entry.has(&def.name) {
                                cmd.columns.push(col.write(Value::Null));
                            }
                        }
                        (ValueGenerated::Never, Some(value)) => {
                            cmd.columns.push(col.write(value.clone()));
                        }
                        (_, Some(value)) => cmd.columns.push(col.write(value.clone())),
                        (_, None) => cmd.columns.push(col.read()),
                    }
                }
            }
            EntityState::Modified => {
                for def in table.columns() {
                    let mut col = ColumnModification::new(&def.name).sql_type(def.sql_type);
                    if !def.nullable {
                        col = col.not_null();
                    }
                    let mut used = false;
                    if def.primary_key {
                        col = col.key();
                    }
                    if entry.is_modified(&def.name) && def.generated != ValueGenerated::OnAddOrUpdate {
                        col = col.write(entry.get(&def.name).cloned().unwrap_or_default());
                        used = true;
                    } else if let Some(current) = entry.get(&def.name) {
                        col.value = current.clone();
                    }
                    if def.primary_key || def.concurrency_token {
                        let original = entry
                            .original(&def.name)
                            .or_else(|| entry.get(&def.name))
                            .cloned()
                            .unwrap_or_default();
                        col = col.condition(original);
                        used = true;
                    }
                    if def.concurrency_token {
                        col = col.concurrency_token();
                    }
                    if def.generated == ValueGenerated::OnAddOrUpdate {
                        col = col.read();
                        used = true;
                    }
                    if used {
                        cmd.columns.push(col);
                    }
                }
                if !cmd.columns.iter().any(ColumnModification::is_write) {
                    return Err(Error::update(
                        UpdateErrorKind::InvalidCommand,
                        format!("modified entry for '{}' has no writable changes", table.name()),
                    ));
                }
            }
            EntityState::Deleted => {
                for def in table.columns() {
                    if !(def.primary_key || def.concurrency_token) {
                        continue;
                    }
                    let original = entry
                        .original(&def.name)
                        .or_else(|| entry.get(&def.name))
                        .cloned()
                        .unwrap_or_default();
                    let mut col = ColumnModification::new(&def.name)
                        .sql_type(def.sql_type)
                        .condition(original);
                    if def.primary_key {
                        col = col.key();
                    }
                    if def.concurrency_token {
                        col = col.concurrency_token();
                    }
                    cmd.columns.push(col);
                }
            }
        }

        if matches!(cmd.entity_state, EntityState::Modified | EntityState::Deleted)
            && !cmd.columns.iter().any(ColumnModification::is_condition)
        {
            return Err(Error::update(
                UpdateErrorKind::InvalidCommand,
                format!(
                    "table '{}' has no key; cannot identify the row to change",
                    table.name()
                ),
            ));
        }
        Ok(cmd)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn entity_state(&self) -> EntityState {
        self.entity_state
    }

    pub fn columns(&self) -> &[ColumnModification] {
        &self.columns
    }

    pub fn procedure(&self) -> Option<&StoredProcedureMapping> {
        self.procedure.as_ref()
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Rows the command affected, once known.
    pub fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    /// Look up a column modification by name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnModification> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    /// Value of a column after execution (propagated or as written).
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.find_column(name).map(ColumnModification::value)
    }

    pub fn write_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|c| c.is_write)
    }

    pub fn read_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|c| c.is_read)
    }

    pub fn condition_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|c| c.is_condition)
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnModification> {
        self.columns.iter().filter(|c| c.is_key)
    }

    /// True when database-generated values must be read back.
    pub fn requires_result_propagation(&self) -> bool {
        match &self.procedure {
            Some(p) => !p.result_columns.is_empty() || p.has_output_parameters(),
            None => self.columns.iter().any(|c| c.is_read),
        }
    }

    /// Number of parameters the command binds.
    pub fn parameter_count(&self) -> usize {
        match &self.procedure {
            Some(p) => p.input_parameter_count(),
            None => self
                .columns
                .iter()
                .map(|c| {
                    usize::from(c.use_current_value_parameter())
                        + usize::from(c.use_original_value_parameter())
                })
                .sum(),
        }
    }

    /// Human-readable identity of the row, e.g. `orders(id=7)`.
    pub fn entry_key(&self) -> String {
        let qualified = match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        };
        let keys: Vec<String> = self
            .key_columns()
            .map(|c| {
                let value = if c.propagated {
                    &c.value
                } else {
                    c.original_value.as_ref().unwrap_or(&c.value)
                };
                format!("{}={}", c.column_name, value)
            })
            .collect();
        format!("{qualified}({})", keys.join(", "))
    }

    /// Assign parameter names to every bound value.
    pub fn assign_parameter_names(&mut self, names: &mut ParameterNameGenerator) {
        for col in &mut self.columns {
            col.parameter_name = col.use_current_value_parameter().then(|| names.generate());
            col.original_parameter_name =
                col.use_original_value_parameter().then(|| names.generate());
        }
    }

    /// Value bound for a procedure parameter.
    pub fn procedure_parameter_value(&self, column: Option<&str>, original: bool) -> Value {
        let Some(col) = column.and_then(|name| self.find_column(name)) else {
            return Value::Null;
        };
        if original {
            col.original_value.clone().unwrap_or_else(|| col.value.clone())
        } else {
            col.value.clone()
        }
    }

    /// Copy read columns out of a result row, matched by column name.
    pub fn propagate_results(&mut self, row: &Row) -> Result<()> {
        for col in self.columns.iter_mut().filter(|c| c.is_read) {
            let value = row.get_by_name(&col.column_name).ok_or_else(|| {
                Error::update(
                    UpdateErrorKind::MissingColumn,
                    format!(
                        "result row for '{}' has no column '{}'",
                        self.table, col.column_name
                    ),
                )
            })?;
            col.set_propagated(value.clone());
        }
        Ok(())
    }

    /// Copy a procedure's result columns out of its result row.
    pub fn propagate_result_columns(&mut self, row: &Row) -> Result<()> {
        let Some(procedure) = self.procedure.clone() else {
            return self.propagate_results(row);
        };
        for rc in &procedure.result_columns {
            let value = row.get_by_name(&rc.name).ok_or_else(|| {
                Error::update(
                    UpdateErrorKind::MissingColumn,
                    format!("procedure '{}' returned no column '{}'", procedure.name, rc.name),
                )
            })?;
            self.column_entry(&rc.column).set_propagated(value.clone());
        }
        if let Some(RowsAffectedSource::ResultColumn(name)) = &procedure.rows_affected {
            self.rows_affected = row
                .get_by_name(name)
                .and_then(Value::as_i64)
                .map(|v| u64::try_from(v).unwrap_or(0));
        }
        Ok(())
    }

    /// Copy output parameter values out of an output-parameter row, matched by
    /// parameter name.
    pub fn propagate_output_parameters(&mut self, row: &Row) -> Result<()> {
        let Some(procedure) = self.procedure.clone() else {
            return Ok(());
        };
        for param in procedure.output_parameters() {
            let value = row.get_by_name(&param.name).ok_or_else(|| {
                Error::update(
                    UpdateErrorKind::MissingColumn,
                    format!(
                        "procedure '{}' returned no output parameter '{}'",
                        procedure.name, param.name
                    ),
                )
            })?;
            match &param.column {
                Some(column) => self.column_entry(column).set_propagated(value.clone()),
                None => {
                    if procedure.rows_affected
                        == Some(RowsAffectedSource::Parameter(param.name.clone()))
                    {
                        self.rows_affected = value.as_i64().map(|v| u64::try_from(v).unwrap_or(0));
                    }
                }
            }
        }
        Ok(())
    }

    fn column_entry(&mut self, name: &str) -> &mut ColumnModification {
        let idx = match self.columns.iter().position(|c| c.column_name == name) {
            Some(idx) => idx,
            None => {
                self.columns.push(ColumnModification::new(name).read());
                self.columns.len() - 1
            }
        };
        &mut self.columns[idx]
    }

    /// Write propagated values into `entry` and accept its changes.
    ///
    /// Deleted entries are left untouched; the caller detaches them.
    pub fn apply_to_entry(&self, entry: &mut TrackedEntry) {
        if self.entity_state == EntityState::Deleted {
            return;
        }
        for col in self.columns.iter().filter(|c| c.propagated) {
            entry.set(col.column_name.as_str(), col.value.clone());
        }
        entry.accept_changes();
    }

    /// Rows reported by a procedure's rows-affected source, if it has one.
    pub fn reported_rows_affected(&self) -> Option<u64> {
        self.procedure
            .as_ref()
            .and_then(|p| p.rows_affected.as_ref())
            .and(self.rows_affected)
    }

    pub(crate) fn set_rows_affected(&mut self, rows: u64) {
        self.rows_affected = Some(rows);
    }

    pub(crate) fn set_state(&mut self, state: CommandState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::ProcedureParameter;
    use sqlwrite_core::{ColumnDef, TableSchema};
    use std::sync::Arc;

    fn orders() -> Arc<TableSchema> {
        Arc::new(
            TableSchema::new("orders")
                .column(ColumnDef::new("id", SqlType::BigInt).primary_key().identity())
                .column(ColumnDef::new("customer", SqlType::Text))
                .column(ColumnDef::new("note", SqlType::Text).nullable())
                .column(ColumnDef::new("version", SqlType::BigInt).row_version()),
        )
    }

    #[test]
    fn test_added_entry_reads_generated_columns() {
        let mut entry = TrackedEntry::added(orders());
        entry.set("customer", Value::Text("acme".into()));
        let cmd = ModificationCommand::from_entry(&entry).unwrap();

        let writes: Vec<_> = cmd.write_columns().map(|c| c.column_name()).collect();
        let reads: Vec<_> = cmd.read_columns().map(|c| c.column_name()).collect();
        assert_eq!(writes, vec!["customer"]);
        assert_eq!(reads, vec!["id", "version"]);
        assert!(cmd.requires_result_propagation());
        assert_eq!(cmd.parameter_count(), 1);
    }

    #[test]
    fn test_modified_entry_conditions_on_key_and_token() {
        let mut entry = TrackedEntry::existing(
            orders(),
            [
                ("id", Value::BigInt(10)),
                ("customer", Value::Text("acme".into())),
                ("version", Value::BigInt(4)),
            ],
        );
        entry.set("customer", Value::Text("globex".into()));
        let cmd = ModificationCommand::from_entry(&entry).unwrap();

        let conditions: Vec<_> = cmd.condition_columns().map(|c| c.column_name()).collect();
        assert_eq!(conditions, vec!["id", "version"]);
        let version = cmd.find_column("version").unwrap();
        assert!(version.is_read() && version.is_concurrency_token());
        assert_eq!(version.original_value(), Some(&Value::BigInt(4)));
        assert_eq!(cmd.parameter_count(), 3);
    }

    #[test]
    fn test_modified_entry_without_changes_is_rejected() {
        let entry = TrackedEntry::existing(orders(), [("id", Value::BigInt(1))]);
        assert!(ModificationCommand::from_entry(&entry).is_err());
    }

    #[test]
    fn test_deleted_entry_without_key_is_rejected() {
        let table = Arc::new(TableSchema::new("log").column(ColumnDef::new("line", SqlType::Text)));
        let mut entry = TrackedEntry::existing(table, [("line", Value::Text("x".into()))]);
        entry.mark_deleted();
        let err = ModificationCommand::from_entry(&entry).unwrap_err();
        assert!(err.to_string().contains("no key"));
    }

    #[test]
    fn test_parameter_names_skip_read_only_columns() {
        let mut cmd = ModificationCommand::new("orders", EntityState::Modified)
            .column(ColumnModification::new("id").key().condition(1i64))
            .column(ColumnModification::new("total").write(5i64))
            .column(ColumnModification::new("stamp").read());
        let mut names = ParameterNameGenerator::new();
        names.reset_to(4);
        cmd.assign_parameter_names(&mut names);

        assert_eq!(cmd.columns()[0].original_parameter_name(), Some("p4"));
        assert_eq!(cmd.columns()[0].parameter_name(), None);
        assert_eq!(cmd.columns()[1].parameter_name(), Some("p5"));
        assert_eq!(cmd.columns()[2].parameter_name(), None);
        assert_eq!(names.position(), 6);
    }

    #[test]
    fn test_propagate_results_by_name() {
        let mut cmd = ModificationCommand::new("orders", EntityState::Added)
            .column(ColumnModification::new("id").key().read())
            .column(ColumnModification::new("customer").write("acme"));
        let row = Row::new(vec!["ID".into()], vec![Value::BigInt(41)]);
        cmd.propagate_results(&row).unwrap();

        assert_eq!(cmd.value("id"), Some(&Value::BigInt(41)));
        assert!(cmd.find_column("id").unwrap().is_propagated());
        assert_eq!(cmd.entry_key(), "orders(id=41)");
    }

    #[test]
    fn test_apply_to_entry_accepts_generated_values() {
        let mut entry = TrackedEntry::added(orders());
        entry.set("customer", Value::Text("acme".into()));
        let mut cmd = ModificationCommand::from_entry(&entry).unwrap();
        let row = Row::new(
            vec!["id".into(), "version".into()],
            vec![Value::BigInt(9), Value::BigInt(1)],
        );
        cmd.propagate_results(&row).unwrap();
        cmd.apply_to_entry(&mut entry);

        assert_eq!(entry.state(), EntityState::Unchanged);
        assert_eq!(entry.get("id"), Some(&Value::BigInt(9)));
        assert_eq!(entry.original("version"), Some(&Value::BigInt(1)));
    }

    #[test]
    fn test_propagate_results_missing_column() {
        let mut cmd = ModificationCommand::new("orders", EntityState::Added)
            .column(ColumnModification::new("id").read());
        let row = Row::new(vec!["other".into()], vec![Value::BigInt(1)]);
        let err = cmd.propagate_results(&row).unwrap_err();
        assert!(matches!(
            err,
            Error::Update(ref u) if u.kind == UpdateErrorKind::MissingColumn
        ));
    }

    #[test]
    fn test_output_parameters_and_rows_affected() {
        let mut cmd = ModificationCommand::new("orders", EntityState::Modified)
            .column(ColumnModification::new("id").key().condition(3i64))
            .column(ColumnModification::new("total").write(10i64))
            .with_procedure(
                StoredProcedureMapping::new("order_update")
                    .parameter(ProcedureParameter::original("id", "id"))
                    .parameter(ProcedureParameter::input_output("total", "total"))
                    .parameter(ProcedureParameter::rows_affected("affected")),
            );
        let row = Row::new(
            vec!["total".into(), "affected".into()],
            vec![Value::BigInt(12), Value::BigInt(1)],
        );
        cmd.propagate_output_parameters(&row).unwrap();

        assert_eq!(cmd.value("total"), Some(&Value::BigInt(12)));
        assert_eq!(cmd.reported_rows_affected(), Some(1));
        assert_eq!(cmd.procedure_parameter_value(Some("id"), true), Value::BigInt(3));
    }

    #[test]
    fn test_negative_rows_affected_counts_as_none_found() {
        let mut cmd = ModificationCommand::new("orders", EntityState::Deleted)
            .column(ColumnModification::new("id").key().condition(3i64))
            .with_procedure(
                StoredProcedureMapping::new("order_delete")
                    .parameter(ProcedureParameter::original("id", "id"))
                    .parameter(ProcedureParameter::rows_affected("affected")),
            );
        let row = Row::new(vec!["affected".into()], vec![Value::BigInt(-1)]);
        cmd.propagate_output_parameters(&row).unwrap();
        assert_eq!(cmd.reported_rows_affected(), Some(0));
    }
}

