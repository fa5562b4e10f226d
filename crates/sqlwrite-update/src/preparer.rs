//! Splitting an ordered command list into batches.

#![allow(clippy::result_large_err)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlwrite_core::{EntityState, Error, Result, UpdateErrorKind};

use crate::batch::{ModificationCommandBatch, RejectReason, Rejected};
use crate::command::ModificationCommand;
use crate::config::UpdateConfig;
use crate::generator::UpdateSqlGenerator;

/// Foreign-key dependencies between tables.
///
/// Used to order commands so parents are inserted before their children
/// and children are deleted before their parents:
/// - Deletes come first, deepest table first.
/// - Inserts follow, shallowest table first.
/// - Updates and procedure calls keep their relative order and come last.
#[derive(Debug, Clone, Default)]
pub struct TableDependencies {
    /// Table -> tables it references.
    dependencies: HashMap<String, Vec<String>>,
}

impl TableDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tables `table` references.
    pub fn register_table<I, S>(&mut self, table: impl Into<String>, depends_on: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .insert(table.into(), depends_on.into_iter().map(Into::into).collect());
    }

    /// Builder form of [`TableDependencies::register_table`].
    pub fn table<I, S>(mut self, table: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_table(table, depends_on);
        self
    }

    /// Length of the longest reference chain starting at `table`.
    ///
    /// Cycles are cut where they close, so self-references count as zero.
    pub fn depth(&self, table: &str) -> usize {
        let mut visiting = HashSet::new();
        self.depth_inner(table, &mut visiting)
    }

    fn depth_inner<'a>(&'a self, table: &'a str, visiting: &mut HashSet<&'a str>) -> usize {
        let Some(deps) = self.dependencies.get(table) else {
            return 0;
        };
        if !visiting.insert(table) {
            return 0;
        }
        let mut depth = 0;
        for dep in deps {
            if dep.as_str() == table || visiting.contains(dep.as_str()) {
                continue;
            }
            depth = depth.max(1 + self.depth_inner(dep, visiting));
        }
        visiting.remove(table);
        depth
    }

    /// Reorder commands by dependency depth. Sorting is stable.
    pub fn order(&self, commands: Vec<ModificationCommand>) -> Vec<ModificationCommand> {
        let mut deletes = Vec::new();
        let mut inserts = Vec::new();
        let mut rest = Vec::new();

        for command in commands {
            match (command.entity_state(), command.procedure()) {
                (EntityState::Deleted, None) => deletes.push(command),
                (EntityState::Added, None) => inserts.push(command),
                _ => rest.push(command),
            }
        }

        deletes.sort_by_key(|c| std::cmp::Reverse(self.depth(c.table())));
        inserts.sort_by_key(|c| self.depth(c.table()));

        deletes.extend(inserts);
        deletes.extend(rest);
        deletes
    }
}

/// Packs commands into batches using the provider's generator.
#[derive(Debug, Clone)]
pub struct CommandBatchPreparer {
    generator: Arc<dyn UpdateSqlGenerator>,
    max_batch_size: usize,
    min_batch_size: usize,
    dependencies: Option<TableDependencies>,
}

impl CommandBatchPreparer {
    pub fn new(generator: Arc<dyn UpdateSqlGenerator>, config: &UpdateConfig) -> Self {
        let max_batch_size = config
            .max_batch_size
            .unwrap_or_else(|| generator.default_max_batch_size())
            .max(1);
        Self {
            generator,
            max_batch_size,
            min_batch_size: config.min_batch_size.max(1),
            dependencies: None,
        }
    }

    /// Order commands by table dependencies before batching.
    pub fn with_dependencies(mut self, dependencies: TableDependencies) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Split `commands` into completed batches, in execution order.
    ///
    /// Fails if a command cannot be rendered or does not fit even in an
    /// empty batch.
    pub fn batch_commands(
        &self,
        commands: Vec<ModificationCommand>,
    ) -> Result<Vec<ModificationCommandBatch>> {
        let total = commands.len();
        let commands = match &self.dependencies {
            Some(deps) => deps.order(commands),
            None => commands,
        };

        let mut batches = Vec::new();
        let mut current = self.new_batch();
        for command in commands {
            let Err(rejected) = current.try_add_command(command) else {
                continue;
            };
            let command = match rejected {
                Rejected {
                    reason: RejectReason::Invalid(e),
                    ..
                } => return Err(e),
                Rejected { command, reason } if current.is_empty() => {
                    return Err(doesnt_fit(&command, &reason));
                }
                Rejected { command, .. } => command,
            };
            let full = std::mem::replace(&mut current, self.new_batch());
            self.push_batch(&mut batches, full)?;
            if let Err(Rejected { command, reason }) = current.try_add_command(command) {
                return Err(match reason {
                    RejectReason::Invalid(e) => e,
                    reason => doesnt_fit(&command, &reason),
                });
            }
        }
        if !current.is_empty() {
            self.push_batch(&mut batches, current)?;
        }

        let count = batches.len();
        for (i, batch) in batches.iter_mut().enumerate() {
            batch.complete(i + 1 < count)?;
        }

        tracing::debug!(
            commands = total,
            batches = count,
            max_batch_size = self.max_batch_size,
            "Prepared modification batches"
        );
        Ok(batches)
    }

    fn new_batch(&self) -> ModificationCommandBatch {
        ModificationCommandBatch::new(Arc::clone(&self.generator), self.max_batch_size)
    }

    /// Keep `batch`, or split it into single-command batches when it is
    /// smaller than the minimum batch size.
    fn push_batch(
        &self,
        batches: &mut Vec<ModificationCommandBatch>,
        batch: ModificationCommandBatch,
    ) -> Result<()> {
        if batch.len() >= self.min_batch_size || batch.len() <= 1 {
            batches.push(batch);
            return Ok(());
        }
        tracing::trace!(
            commands = batch.len(),
            min_batch_size = self.min_batch_size,
            "Splitting small batch into single commands"
        );
        for command in batch.into_commands() {
            let mut single = self.new_batch();
            if let Err(Rejected { command, reason }) = single.try_add_command(command) {
                return Err(match reason {
                    RejectReason::Invalid(e) => e,
                    reason => doesnt_fit(&command, &reason),
                });
            }
            batches.push(single);
        }
        Ok(())
    }
}

fn doesnt_fit(command: &ModificationCommand, reason: &RejectReason) -> Error {
    Error::update(
        UpdateErrorKind::InvalidCommand,
        format!(
            "command for {} does not fit in an empty batch: {reason}",
            command.entry_key()
        ),
    )
}
