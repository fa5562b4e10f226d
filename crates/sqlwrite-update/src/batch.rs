//! Modification command batches.
//!
//! A batch owns one command text, its parameters and one [`ResultSetMapping`]
//! per command. Commands are rendered as they are added so an oversized
//! command can be rolled back to a checkpoint and handed back to the caller.
//! Compatible inserts are held back in a pending group and rendered together
//! when the group ends.

#![allow(clippy::result_large_err)]

use std::fmt;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use sqlwrite_core::{
    ConcurrencyError, ConcurrencyFailure, DataReader, EntityState, Error, Result, SqlExecutor,
    UpdateErrorKind, Value,
};

use crate::command::{CommandState, ModificationCommand, ParameterNameGenerator};
use crate::generator::UpdateSqlGenerator;
use crate::mapping::ResultSetMapping;
use crate::sql_builder::{Parameter, SqlBuilder};

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Accepting commands.
    Building,
    /// Command text is final; ready to execute.
    Complete,
    /// Sent to the database.
    Executed,
}

/// Why a command was not added.
#[derive(Debug)]
pub enum RejectReason {
    /// The batch no longer accepts commands.
    BatchComplete,
    /// The batch holds its maximum number of commands.
    BatchFull,
    /// Adding the command would exceed the parameter limit.
    ParameterLimit,
    /// The command cannot be rendered at all.
    Invalid(Error),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BatchComplete => write!(f, "batch is complete"),
            RejectReason::BatchFull => write!(f, "batch is full"),
            RejectReason::ParameterLimit => write!(f, "parameter limit reached"),
            RejectReason::Invalid(e) => write!(f, "invalid command: {e}"),
        }
    }
}

/// A command handed back by [`ModificationCommandBatch::try_add_command`].
#[derive(Debug)]
pub struct Rejected {
    /// The command, back in the `Pending` state.
    pub command: ModificationCommand,
    pub reason: RejectReason,
}

/// Commands sharing one command text and parameter set.
#[derive(Debug)]
pub struct ModificationCommandBatch {
    generator: Arc<dyn UpdateSqlGenerator>,
    max_commands: usize,
    max_parameters: usize,
    sql: SqlBuilder,
    names: ParameterNameGenerator,
    commands: Vec<ModificationCommand>,
    /// Mappings of rendered commands; the commands past its end form the
    /// pending bulk-insert group.
    mappings: Vec<ResultSetMapping>,
    pending_parameters: usize,
    requires_transaction: bool,
    state: BatchState,
}

impl ModificationCommandBatch {
    pub fn new(generator: Arc<dyn UpdateSqlGenerator>, max_commands: usize) -> Self {
        let mut sql = SqlBuilder::new(generator.dialect());
        generator.append_batch_header(&mut sql);
        Self {
            max_parameters: generator.max_parameters(),
            generator,
            max_commands: max_commands.max(1),
            sql,
            names: ParameterNameGenerator::new(),
            commands: Vec::new(),
            mappings: Vec::new(),
            pending_parameters: 0,
            requires_transaction: false,
            state: BatchState::Building,
        }
    }

    /// Add a command, or hand it back with the reason it did not fit.
    pub fn try_add_command(
        &mut self,
        mut command: ModificationCommand,
    ) -> std::result::Result<(), Rejected> {
        if self.state != BatchState::Building {
            return Err(reject(command, RejectReason::BatchComplete));
        }
        if self.commands.len() >= self.max_commands {
            return Err(reject(command, RejectReason::BatchFull));
        }
        if self.sql.parameter_count() + self.pending_parameters + command.parameter_count()
            > self.max_parameters
        {
            return Err(reject(command, RejectReason::ParameterLimit));
        }

        let names_position = self.names.position();
        command.assign_parameter_names(&mut self.names);

        if let Some(first) = self.pending_group().first() {
            if self.generator.can_bulk_insert(first, &command) {
                return self.push_pending(command, names_position);
            }
            if let Err(e) = self.flush_pending() {
                self.names.reset_to(names_position);
                return Err(reject(command, RejectReason::Invalid(e)));
            }
        }

        if is_bulk_candidate(&command) {
            return self.push_pending(command, names_position);
        }

        let checkpoint = self.sql.checkpoint();
        match self.generator.append_command(&mut self.sql, &command) {
            Ok(result) if self.sql.parameter_count() <= self.max_parameters => {
                self.requires_transaction |= result.requires_transaction;
                self.mappings.push(result.mapping);
                command.set_state(CommandState::Batched);
                self.commands.push(command);
                Ok(())
            }
            Ok(_) => {
                self.sql.rollback_to(checkpoint);
                self.names.reset_to(names_position);
                Err(reject(command, RejectReason::ParameterLimit))
            }
            Err(e) => {
                self.sql.rollback_to(checkpoint);
                self.names.reset_to(names_position);
                Err(reject(command, RejectReason::Invalid(e)))
            }
        }
    }

    /// Finish the command text. Further additions are rejected.
    pub fn complete(&mut self, more_batches_expected: bool) -> Result<()> {
        if self.state != BatchState::Building {
            return Err(Error::update(
                UpdateErrorKind::InvalidState,
                "batch was already completed",
            ));
        }
        self.flush_pending()?;
        self.requires_transaction |= self.commands.len() > 1 || more_batches_expected;
        self.state = BatchState::Complete;
        Ok(())
    }

    /// Send the batch and consume its results.
    ///
    /// On any failure every command is marked `RolledBack`; the caller's
    /// transaction is expected to discard the partial work.
    #[tracing::instrument(
        level = "debug",
        skip(self, cx, executor),
        fields(commands = self.commands.len(), parameters = self.sql.parameter_count())
    )]
    pub async fn execute<E: SqlExecutor>(&mut self, cx: &Cx, executor: &E) -> Outcome<(), Error> {
        if self.state != BatchState::Complete {
            return Outcome::Err(Error::update(
                UpdateErrorKind::InvalidState,
                format!("cannot execute a batch in state {:?}", self.state),
            ));
        }
        self.state = BatchState::Executed;
        if self.commands.is_empty() {
            return Outcome::Ok(());
        }

        tracing::debug!(
            commands = self.commands.len(),
            parameters = self.sql.parameter_count(),
            sql_len = self.sql.sql().len(),
            "Executing modification batch"
        );
        tracing::trace!(sql = %self.sql.sql(), "Batch command text");

        let params: Vec<Value> = self.sql.params().iter().map(|p| p.value.clone()).collect();
        let outcome = match executor.execute_reader(cx, self.sql.sql(), &params).await {
            Outcome::Ok(mut reader) => self.consume(cx, &mut reader).await,
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        };
        if !matches!(outcome, Outcome::Ok(())) {
            self.mark_rolled_back();
        }
        outcome
    }

    /// Walk the reader's result sets in step with the mappings.
    async fn consume(&mut self, cx: &Cx, reader: &mut DataReader) -> Outcome<(), Error> {
        let mut failures = Vec::new();
        let mut in_result_set = false;
        let mut index = 0;

        while index < self.commands.len() {
            let mapping = self.mappings[index];

            if mapping.has_result_row() {
                if !in_result_set {
                    try_outcome!(self.next_result(cx, reader, index).await);
                    in_result_set = true;
                }

                if mapping.is_positional() {
                    let end = self.positional_group_end(index);
                    try_outcome!(self.consume_positional(cx, reader, index, end, &mut failures).await);
                    in_result_set = false;
                    index = end + 1;
                    continue;
                }

                let row = try_outcome!(reader.read(cx).await);
                if mapping.is_rows_affected_only() {
                    let count = row
                        .as_ref()
                        .and_then(|r| r.get(0))
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    let count = u64::try_from(count).unwrap_or(0);
                    self.commands[index].set_rows_affected(count);
                    if count == 1 {
                        self.commands[index].set_state(CommandState::Executed);
                    } else {
                        failures.push(self.failure(index, count));
                    }
                } else {
                    match row {
                        Some(row) => {
                            let command = &mut self.commands[index];
                            try_result!(if command.procedure().is_some() {
                                command.propagate_result_columns(&row)
                            } else {
                                command.propagate_results(&row)
                            });
                            if command.reported_rows_affected().is_none() {
                                command.set_rows_affected(1);
                            }
                            let state = if command.requires_result_propagation() {
                                CommandState::Propagated
                            } else {
                                CommandState::Executed
                            };
                            command.set_state(state);
                        }
                        None => failures.push(self.failure(index, 0)),
                    }
                }

                if mapping.is_last_in_result_set() {
                    in_result_set = false;
                }
            }

            if mapping.has_output_parameters() {
                try_outcome!(self.next_result(cx, reader, index).await);
                let Some(row) = try_outcome!(reader.read(cx).await) else {
                    return Outcome::Err(Error::update(
                        UpdateErrorKind::MissingResultSet,
                        format!(
                            "no output parameter row for command {index} ({})",
                            self.commands[index].entry_key()
                        ),
                    ));
                };
                let command = &mut self.commands[index];
                try_result!(command.propagate_output_parameters(&row));
                command.set_state(CommandState::Propagated);
            }

            if let Some(rows) = self.commands[index].reported_rows_affected() {
                if rows != 1 && !failures.iter().any(|f: &ConcurrencyFailure| f.command_index == index) {
                    failures.push(self.failure(index, rows));
                }
            }

            if !mapping.expects_results() {
                self.commands[index].set_state(CommandState::Executed);
            }
            index += 1;
        }

        if failures.is_empty() {
            return Outcome::Ok(());
        }
        for failure in &failures {
            tracing::warn!(
                command = failure.command_index,
                entry = %failure.entry,
                expected = failure.expected_rows,
                actual = failure.actual_rows,
                "Optimistic concurrency check failed"
            );
        }
        Outcome::Err(Error::Concurrency(ConcurrencyError { failures }))
    }

    /// Map a positional result set onto commands `first..=last` by the
    /// trailing position column.
    async fn consume_positional(
        &mut self,
        cx: &Cx,
        reader: &mut DataReader,
        first: usize,
        last: usize,
        failures: &mut Vec<ConcurrencyFailure>,
    ) -> Outcome<(), Error> {
        let count = last - first + 1;
        let mut seen = vec![false; count];

        while let Some(row) = try_outcome!(reader.read(cx).await) {
            let position = row
                .values()
                .last()
                .and_then(Value::as_i64)
                .and_then(|p| usize::try_from(p).ok())
                .filter(|p| *p < count);
            let Some(position) = position else {
                return Outcome::Err(Error::update(
                    UpdateErrorKind::InvalidPosition,
                    format!(
                        "positional row {:?} does not match any of {count} commands",
                        row.values().last()
                    ),
                ));
            };
            let command = &mut self.commands[first + position];
            try_result!(command.propagate_results(&row));
            command.set_rows_affected(1);
            command.set_state(CommandState::Propagated);
            seen[position] = true;
        }

        for (offset, _) in seen.iter().enumerate().filter(|(_, seen)| !**seen) {
            failures.push(self.failure(first + offset, 0));
        }
        Outcome::Ok(())
    }

    async fn next_result(&self, cx: &Cx, reader: &mut DataReader, index: usize) -> Outcome<(), Error> {
        match reader.next_result(cx).await {
            Outcome::Ok(true) => Outcome::Ok(()),
            Outcome::Ok(false) => Outcome::Err(Error::update(
                UpdateErrorKind::MissingResultSet,
                format!(
                    "expected a result set for command {index} ({}); the reader had only {}",
                    self.commands[index].entry_key(),
                    reader.result_sets_seen()
                ),
            )),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    fn positional_group_end(&self, start: usize) -> usize {
        (start..self.mappings.len())
            .find(|&i| self.mappings[i].is_last_in_result_set())
            .unwrap_or(self.mappings.len() - 1)
    }

    fn failure(&self, index: usize, actual_rows: u64) -> ConcurrencyFailure {
        ConcurrencyFailure {
            command_index: index,
            entry: self.commands[index].entry_key(),
            expected_rows: 1,
            actual_rows,
        }
    }

    fn pending_group(&self) -> &[ModificationCommand] {
        &self.commands[self.mappings.len()..]
    }

    /// Add `command` to the pending insert group if the group, rendered the
    /// way it will be flushed, still fits the parameter limit. Otherwise the
    /// command is removed from the group again and handed back.
    fn push_pending(
        &mut self,
        mut command: ModificationCommand,
        names_position: usize,
    ) -> std::result::Result<(), Rejected> {
        command.set_state(CommandState::Batched);
        self.commands.push(command);

        let mut scratch = SqlBuilder::new(self.generator.dialect());
        let rendered = render_group(self.generator.as_ref(), &mut scratch, self.pending_group());
        let reason = match rendered {
            Ok(_) if self.sql.parameter_count() + scratch.parameter_count() <= self.max_parameters => {
                self.pending_parameters = scratch.parameter_count();
                return Ok(());
            }
            Ok(_) => RejectReason::ParameterLimit,
            Err(e) => RejectReason::Invalid(e),
        };

        let command = self.commands.remove(self.commands.len() - 1);
        self.names.reset_to(names_position);
        Err(reject(command, reason))
    }

    /// Render the pending insert group.
    fn flush_pending(&mut self) -> Result<()> {
        let start = self.mappings.len();
        let pending = &self.commands[start..];
        if pending.is_empty() {
            return Ok(());
        }
        let checkpoint = self.sql.checkpoint();
        let rendered = render_group(self.generator.as_ref(), &mut self.sql, pending);
        if rendered.is_ok() && self.sql.parameter_count() > self.max_parameters {
            let count = self.sql.parameter_count();
            self.sql.rollback_to(checkpoint);
            return Err(Error::update(
                UpdateErrorKind::InvalidCommand,
                format!(
                    "pending inserts bind {count} parameters, over the limit of {}",
                    self.max_parameters
                ),
            ));
        }
        match rendered {
            Ok((mappings, requires_transaction)) if mappings.len() == pending.len() => {
                self.mappings.extend(mappings);
                self.requires_transaction |= requires_transaction;
                self.pending_parameters = 0;
                Ok(())
            }
            Ok((mappings, _)) => {
                self.sql.rollback_to(checkpoint);
                Err(Error::update(
                    UpdateErrorKind::InvalidCommand,
                    format!(
                        "bulk insert produced {} mappings for {} commands",
                        mappings.len(),
                        pending.len()
                    ),
                ))
            }
            Err(e) => {
                self.sql.rollback_to(checkpoint);
                Err(e)
            }
        }
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        for command in &mut self.commands {
            command.set_state(CommandState::RolledBack);
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn commands(&self) -> &[ModificationCommand] {
        &self.commands
    }

    /// Take the commands out, e.g. to re-batch them or hand them back.
    pub fn into_commands(self) -> Vec<ModificationCommand> {
        self.commands
    }

    /// Result set mappings of rendered commands, in command order.
    pub fn mappings(&self) -> &[ResultSetMapping] {
        &self.mappings
    }

    pub fn sql(&self) -> &str {
        self.sql.sql()
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.sql.params()
    }

    pub fn requires_transaction(&self) -> bool {
        self.requires_transaction
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Render a pending insert group: one insert, or the provider's bulk form.
fn render_group(
    generator: &dyn UpdateSqlGenerator,
    sql: &mut SqlBuilder,
    pending: &[ModificationCommand],
) -> Result<(Vec<ResultSetMapping>, bool)> {
    match pending {
        [single] => generator
            .append_insert_operation(sql, single)
            .map(|r| (vec![r.mapping], r.requires_transaction)),
        _ => generator
            .append_bulk_insert_operation(sql, pending)
            .map(|r| (r.mappings, r.requires_transaction)),
    }
}

fn is_bulk_candidate(command: &ModificationCommand) -> bool {
    command.entity_state() == EntityState::Added && command.procedure().is_none()
}

fn reject(mut command: ModificationCommand, reason: RejectReason) -> Rejected {
    command.set_state(CommandState::Pending);
    Rejected { command, reason }
}
