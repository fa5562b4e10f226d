//! Running prepared batches under the configured transaction policy.

use std::time::{Duration, Instant};

use asupersync::{Cx, Outcome};
use serde::Serialize;
use sqlwrite_core::{Connection, EntityState, Error, SqlExecutor, TransactionOps};

use crate::batch::ModificationCommandBatch;
use crate::config::{AutoTransactions, UpdateConfig};

/// What a save did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub batches: usize,
    pub commands: usize,
    /// Number of rows inserted.
    pub inserted: usize,
    /// Number of rows updated.
    pub updated: usize,
    /// Number of rows deleted.
    pub deleted: usize,
    /// Number of stored procedure calls.
    pub procedures: usize,
    pub elapsed: Duration,
}

impl SaveSummary {
    /// Total number of commands executed.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted + self.procedures
    }

    fn record(&mut self, batch: &ModificationCommandBatch) {
        self.batches += 1;
        for command in batch.commands() {
            self.commands += 1;
            if command.procedure().is_some() {
                self.procedures += 1;
                continue;
            }
            match command.entity_state() {
                EntityState::Added => self.inserted += 1,
                EntityState::Modified => self.updated += 1,
                EntityState::Deleted => self.deleted += 1,
                EntityState::Unchanged => {}
            }
        }
    }
}

/// Executes batches in order.
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: UpdateConfig,
}

impl BatchExecutor {
    pub fn new(config: UpdateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Whether a save of `batches` opens its own transaction.
    pub fn needs_transaction(&self, batches: &[ModificationCommandBatch]) -> bool {
        match self.config.auto_transactions {
            AutoTransactions::Always => true,
            AutoTransactions::Never => false,
            AutoTransactions::WhenNeeded => {
                batches.len() > 1
                    || batches
                        .iter()
                        .any(ModificationCommandBatch::requires_transaction)
            }
        }
    }

    /// Execute batches on a connection, inside a transaction of our own when
    /// the policy calls for one. A failure rolls the transaction back.
    #[tracing::instrument(level = "debug", skip(self, cx, conn, batches), fields(batches = batches.len()))]
    pub async fn execute<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        batches: &mut [ModificationCommandBatch],
    ) -> Outcome<SaveSummary, Error> {
        if !self.needs_transaction(batches) {
            return self.run_batches(cx, conn, batches).await;
        }

        let begun = match self.config.isolation_level {
            Some(level) => conn.begin_with(cx, level).await,
            None => conn.begin(cx).await,
        };
        let tx = match begun {
            Outcome::Ok(tx) => tx,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        tracing::debug!("Began transaction for save");

        match self.run_batches(cx, &tx, batches).await {
            Outcome::Ok(summary) => match tx.commit(cx).await {
                Outcome::Ok(()) => Outcome::Ok(summary),
                Outcome::Err(e) => {
                    mark_all_rolled_back(batches);
                    Outcome::Err(e)
                }
                Outcome::Cancelled(r) => {
                    mark_all_rolled_back(batches);
                    Outcome::Cancelled(r)
                }
                Outcome::Panicked(p) => Outcome::Panicked(p),
            },
            failed => {
                mark_all_rolled_back(batches);
                if let Outcome::Err(e) = tx.rollback(cx).await {
                    tracing::warn!(error = %e, "Rollback after failed save also failed");
                }
                failed
            }
        }
    }

    /// Execute batches inside a caller-owned transaction, guarded by a
    /// savepoint when enabled.
    #[tracing::instrument(level = "debug", skip(self, cx, tx, batches), fields(batches = batches.len()))]
    pub async fn execute_in_transaction<T: TransactionOps>(
        &self,
        cx: &Cx,
        tx: &T,
        batches: &mut [ModificationCommandBatch],
    ) -> Outcome<SaveSummary, Error> {
        if !self.config.use_savepoints {
            return self.run_batches(cx, tx, batches).await;
        }

        let name = self.config.savepoint_name.as_str();
        match tx.savepoint(cx, name).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }

        match self.run_batches(cx, tx, batches).await {
            Outcome::Ok(summary) => match tx.release(cx, name).await {
                Outcome::Ok(()) => Outcome::Ok(summary),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            },
            failed => {
                mark_all_rolled_back(batches);
                if let Outcome::Err(e) = tx.rollback_to(cx, name).await {
                    tracing::warn!(error = %e, savepoint = name, "Rollback to savepoint failed");
                }
                failed
            }
        }
    }

    async fn run_batches<E: SqlExecutor>(
        &self,
        cx: &Cx,
        executor: &E,
        batches: &mut [ModificationCommandBatch],
    ) -> Outcome<SaveSummary, Error> {
        let start = Instant::now();
        let mut summary = SaveSummary::default();

        for (i, batch) in batches.iter_mut().enumerate() {
            if let Some(reason) = cx.cancel_reason() {
                tracing::debug!(batch = i, "Save cancelled between batches");
                return Outcome::Cancelled(reason);
            }
            match batch.execute(cx, executor).await {
                Outcome::Ok(()) => summary.record(batch),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        summary.elapsed = start.elapsed();
        Outcome::Ok(summary)
    }
}

fn mark_all_rolled_back(batches: &mut [ModificationCommandBatch]) {
    for batch in batches {
        batch.mark_rolled_back();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_without_batches() {
        let never = BatchExecutor::new(UpdateConfig::new().auto_transactions(AutoTransactions::Never));
        let always =
            BatchExecutor::new(UpdateConfig::new().auto_transactions(AutoTransactions::Always));
        let auto = BatchExecutor::default();

        assert!(!never.needs_transaction(&[]));
        assert!(always.needs_transaction(&[]));
        assert!(!auto.needs_transaction(&[]));
    }

    #[test]
    fn test_summary_total() {
        let summary = SaveSummary {
            inserted: 2,
            updated: 1,
            deleted: 3,
            procedures: 1,
            ..SaveSummary::default()
        };
        assert_eq!(summary.total(), 7);
    }
}
