//! Multi-result-set data reader.
//!
//! A batch sends many statements in one command text. Drivers hand back every
//! statement that produced a result set (including `RETURNING` rows, follow-up
//! `SELECT`s and output-parameter rows) as a [`ResultSet`], in execution order,
//! together with the total number of rows affected by DML in the command.
//!
//! The reader is a cursor over those result sets. Every cursor operation is
//! async and checks the [`Cx`] for cancellation before doing any work.

#![allow(clippy::unused_async)]

use std::collections::VecDeque;
use std::sync::Arc;

use asupersync::{Cx, Outcome};

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// The rows produced by one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: VecDeque<Row>,
}

impl ResultSet {
    /// Create an empty result set with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
        }
    }

    /// Build a result set from raw value rows.
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let shared: Arc<[String]> = columns.clone().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::with_columns(Arc::clone(&shared), values))
            .collect();
        Self { columns, rows }
    }

    /// Append a row.
    pub fn push(&mut self, values: Vec<Value>) {
        let row = Row::new(self.columns.clone(), values);
        self.rows.push_back(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

/// Cursor over the result sets of one executed command text.
#[derive(Debug, Default)]
pub struct DataReader {
    pending: VecDeque<ResultSet>,
    current: Option<ResultSet>,
    records_affected: u64,
    result_sets_seen: usize,
}

impl DataReader {
    /// Create a reader over buffered result sets.
    pub fn new(result_sets: Vec<ResultSet>, records_affected: u64) -> Self {
        Self {
            pending: result_sets.into(),
            current: None,
            records_affected,
            result_sets_seen: 0,
        }
    }

    /// Reader for a command that produced no result sets.
    pub fn empty(records_affected: u64) -> Self {
        Self::new(Vec::new(), records_affected)
    }

    /// Advance to the next result set. Returns `false` when there are none left.
    ///
    /// The reader starts positioned before the first result set.
    pub async fn next_result(&mut self, cx: &Cx) -> Outcome<bool, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        self.current = self.pending.pop_front();
        if self.current.is_some() {
            self.result_sets_seen += 1;
            tracing::trace!(
                result_set = self.result_sets_seen,
                remaining = self.pending.len(),
                "Advanced to next result set"
            );
        }
        Outcome::Ok(self.current.is_some())
    }

    /// Read the next row of the current result set.
    pub async fn read(&mut self, cx: &Cx) -> Outcome<Option<Row>, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        Outcome::Ok(self.current.as_mut().and_then(|set| set.rows.pop_front()))
    }

    /// Column names of the current result set.
    pub fn columns(&self) -> &[String] {
        self.current.as_ref().map_or(&[], |s| s.columns())
    }

    /// Total rows affected by DML statements in the command.
    pub fn records_affected(&self) -> u64 {
        self.records_affected
    }

    /// Number of result sets advanced to so far.
    pub fn result_sets_seen(&self) -> usize {
        self.result_sets_seen
    }

    /// Result sets not yet advanced to.
    pub fn remaining_result_sets(&self) -> usize {
        self.pending.len()
    }
}
