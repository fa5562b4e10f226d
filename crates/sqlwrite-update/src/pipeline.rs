//! End-to-end save: commands in, executed commands and a summary out.

#![allow(clippy::result_large_err)]

use std::sync::Arc;

use asupersync::{Cx, Outcome};
use sqlwrite_core::{
    Connection, EntityState, Error, Result, TrackedEntry, TransactionOps, UpdateErrorKind,
};

use crate::batch::ModificationCommandBatch;
use crate::command::ModificationCommand;
use crate::config::UpdateConfig;
use crate::executor::{BatchExecutor, SaveSummary};
use crate::generator::UpdateSqlGenerator;
use crate::preparer::{CommandBatchPreparer, TableDependencies};

/// Commands after a save, in execution order, with the summary.
#[derive(Debug)]
pub struct SaveResult {
    pub summary: SaveSummary,
    pub commands: Vec<ModificationCommand>,
}

/// Prepares and executes modification commands for one provider.
///
/// ```ignore
/// let pipeline = UpdatePipeline::new(Arc::new(PostgresUpdateSqlGenerator::default()), UpdateConfig::default())?;
/// let saved = pipeline.save(&cx, &conn, commands).await;
/// ```
#[derive(Debug, Clone)]
pub struct UpdatePipeline {
    generator: Arc<dyn UpdateSqlGenerator>,
    config: UpdateConfig,
    dependencies: Option<TableDependencies>,
}

impl UpdatePipeline {
    pub fn new(generator: Arc<dyn UpdateSqlGenerator>, config: UpdateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            config,
            dependencies: None,
        })
    }

    /// Order commands by table dependencies before batching.
    pub fn with_dependencies(mut self, dependencies: TableDependencies) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    pub fn generator(&self) -> &Arc<dyn UpdateSqlGenerator> {
        &self.generator
    }

    /// Split commands into completed batches without executing them.
    pub fn prepare(&self, commands: Vec<ModificationCommand>) -> Result<Vec<ModificationCommandBatch>> {
        let mut preparer = CommandBatchPreparer::new(Arc::clone(&self.generator), &self.config);
        if let Some(deps) = &self.dependencies {
            preparer = preparer.with_dependencies(deps.clone());
        }
        preparer.batch_commands(commands)
    }

    /// Save commands on a connection.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, commands), fields(dialect = self.generator.dialect().name()))]
    pub async fn save<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        commands: Vec<ModificationCommand>,
    ) -> Outcome<SaveResult, Error> {
        let count = commands.len();
        let mut batches = try_result!(self.prepare(commands));
        tracing::info!(commands = count, batches = batches.len(), "Saving changes");

        let executor = BatchExecutor::new(self.config.clone());
        let outcome = executor.execute(cx, conn, &mut batches).await;
        finish(outcome, batches)
    }

    /// Save commands inside a transaction the caller owns.
    #[tracing::instrument(level = "debug", skip(self, cx, tx, commands), fields(dialect = self.generator.dialect().name()))]
    pub async fn save_in_transaction<T: TransactionOps>(
        &self,
        cx: &Cx,
        tx: &T,
        commands: Vec<ModificationCommand>,
    ) -> Outcome<SaveResult, Error> {
        let count = commands.len();
        let mut batches = try_result!(self.prepare(commands));
        tracing::info!(commands = count, batches = batches.len(), "Saving changes in transaction");

        let executor = BatchExecutor::new(self.config.clone());
        let outcome = executor.execute_in_transaction(cx, tx, &mut batches).await;
        finish(outcome, batches)
    }

    /// Save tracked entries, writing generated values back into them.
    ///
    /// Unchanged entries are skipped. On success every saved entry that was
    /// not deleted accepts its changes.
    pub async fn save_entries<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        entries: &mut [TrackedEntry],
    ) -> Outcome<SaveSummary, Error> {
        let commands = try_result!(commands_from_entries(entries));
        let saved = try_outcome!(self.save(cx, conn, commands).await);
        for command in &saved.commands {
            let Some(entry) = command.entry_index().and_then(|i| entries.get_mut(i)) else {
                return Outcome::Err(Error::update(
                    UpdateErrorKind::InvalidState,
                    format!("saved command {} lost its entry", command.entry_key()),
                ));
            };
            command.apply_to_entry(entry);
        }
        Outcome::Ok(saved.summary)
    }
}

/// Build a command per changed entry, tagged with the entry's index.
pub fn commands_from_entries(entries: &[TrackedEntry]) -> Result<Vec<ModificationCommand>> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.state() != EntityState::Unchanged)
        .map(|(i, entry)| ModificationCommand::from_entry(entry).map(|c| c.with_entry_index(i)))
        .collect()
}

fn finish(
    outcome: Outcome<SaveSummary, Error>,
    batches: Vec<ModificationCommandBatch>,
) -> Outcome<SaveResult, Error> {
    match outcome {
        Outcome::Ok(summary) => {
            tracing::info!(
                batches = summary.batches,
                inserted = summary.inserted,
                updated = summary.updated,
                deleted = summary.deleted,
                procedures = summary.procedures,
                elapsed_ms = summary.elapsed.as_millis(),
                "Save completed"
            );
            let commands = batches
                .into_iter()
                .flat_map(ModificationCommandBatch::into_commands)
                .collect();
            Outcome::Ok(SaveResult { summary, commands })
        }
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}
