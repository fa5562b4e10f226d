//! Stored procedure mappings.
//!
//! A command can be bound to a stored procedure instead of a plain
//! INSERT/UPDATE/DELETE. Parameters draw their values from the command's
//! column modifications; output parameters and result columns flow back into
//! them after execution.

use serde::{Deserialize, Serialize};

/// Direction of a procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
}

impl ParameterDirection {
    /// True if the database writes a value back.
    pub const fn is_output(self) -> bool {
        matches!(self, ParameterDirection::Output | ParameterDirection::InputOutput)
    }

    /// True if the caller supplies a value.
    pub const fn is_input(self) -> bool {
        matches!(self, ParameterDirection::Input | ParameterDirection::InputOutput)
    }
}

/// One parameter of a procedure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureParameter {
    /// Parameter name as declared by the procedure.
    pub name: String,
    /// Column the value is taken from and written back to. `None` for
    /// parameters that carry no column (the rows-affected parameter).
    pub column: Option<String>,
    pub direction: ParameterDirection,
    /// Bind the column's original value instead of its current value.
    pub original_value: bool,
}

impl ProcedureParameter {
    /// An input parameter bound to a column's current value.
    pub fn input(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
            direction: ParameterDirection::Input,
            original_value: false,
        }
    }

    /// An input parameter bound to a column's original value.
    pub fn original(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            original_value: true,
            ..Self::input(name, column)
        }
    }

    /// An output parameter written back into a column.
    pub fn output(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            direction: ParameterDirection::Output,
            ..Self::input(name, column)
        }
    }

    /// An input/output parameter.
    pub fn input_output(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            direction: ParameterDirection::InputOutput,
            ..Self::input(name, column)
        }
    }

    /// An output parameter receiving the number of rows affected.
    pub fn rows_affected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            direction: ParameterDirection::Output,
            original_value: false,
        }
    }
}

/// A result column returned by the procedure's result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Column name in the procedure's result set.
    pub name: String,
    /// Column modification that receives the value.
    pub column: String,
}

/// Where the procedure reports how many rows it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowsAffectedSource {
    /// An output parameter with this name.
    Parameter(String),
    /// A column of the procedure's result set.
    ResultColumn(String),
}

/// Binding of a command to a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProcedureMapping {
    pub name: String,
    pub schema: Option<String>,
    pub parameters: Vec<ProcedureParameter>,
    pub result_columns: Vec<ResultColumn>,
    pub rows_affected: Option<RowsAffectedSource>,
}

impl StoredProcedureMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            parameters: Vec::new(),
            result_columns: Vec::new(),
            rows_affected: None,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn parameter(mut self, parameter: ProcedureParameter) -> Self {
        if parameter.column.is_none() && parameter.direction.is_output() {
            self.rows_affected = Some(RowsAffectedSource::Parameter(parameter.name.clone()));
        }
        self.parameters.push(parameter);
        self
    }

    pub fn result_column(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.result_columns.push(ResultColumn {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    /// Report rows affected through a result column.
    pub fn rows_affected_column(mut self, name: impl Into<String>) -> Self {
        self.rows_affected = Some(RowsAffectedSource::ResultColumn(name.into()));
        self
    }

    /// Parameters the database writes back.
    pub fn output_parameters(&self) -> impl Iterator<Item = &ProcedureParameter> {
        self.parameters.iter().filter(|p| p.direction.is_output())
    }

    pub fn has_output_parameters(&self) -> bool {
        self.output_parameters().next().is_some()
    }

    /// Number of bound (input) parameters.
    pub fn input_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.direction.is_input())
            .count()
    }
}
