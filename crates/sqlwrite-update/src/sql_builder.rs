//! Command text accumulator shared by every generator.

use serde::Serialize;
use sqlwrite_core::{Dialect, Value};

use crate::procedure::ParameterDirection;

/// A bound parameter in a batch's command text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Batch-unique name (`p0`, `p1`, ...).
    pub name: String,
    pub value: Value,
    pub direction: ParameterDirection,
}

/// Position in a [`SqlBuilder`] that can be returned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    sql_len: usize,
    param_len: usize,
    statements: usize,
}

/// Builds one command text and its parameter list.
///
/// Placeholders are numbered by bind order, so the text and the parameter
/// list always stay in step.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    dialect: Dialect,
    sql: String,
    params: Vec<Parameter>,
    statements: usize,
}

impl SqlBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            statements: 0,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&self.dialect.quote_ident(name));
        self
    }

    /// Append a quoted, possibly schema-qualified table name.
    pub fn push_table(&mut self, table: &str, schema: Option<&str>) -> &mut Self {
        self.sql.push_str(&self.dialect.quote_table(table, schema));
        self
    }

    /// Append a comma-separated list of quoted identifiers.
    pub fn push_ident_list<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_ident(name);
        }
        self
    }

    /// Bind an input parameter and append its placeholder.
    pub fn push_param(&mut self, name: Option<&str>, value: &Value) -> &mut Self {
        self.push_param_with(name, value, ParameterDirection::Input)
    }

    pub fn push_param_with(
        &mut self,
        name: Option<&str>,
        value: &Value,
        direction: ParameterDirection,
    ) -> &mut Self {
        let index = self.params.len() + 1;
        let name = name.map_or_else(|| format!("p{}", index - 1), str::to_string);
        self.params.push(Parameter {
            name,
            value: value.clone(),
            direction,
        });
        self.sql.push_str(&self.dialect.placeholder(index));
        self
    }

    /// Terminate the current statement.
    pub fn end_statement(&mut self) -> &mut Self {
        self.sql.push_str(self.dialect.statement_terminator());
        self.sql.push('\n');
        self.statements += 1;
        self
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            sql_len: self.sql.len(),
            param_len: self.params.len(),
            statements: self.statements,
        }
    }

    /// Discard everything appended after `checkpoint`.
    pub fn rollback_to(&mut self, checkpoint: Checkpoint) {
        self.sql.truncate(checkpoint.sql_len);
        self.params.truncate(checkpoint.param_len);
        self.statements = checkpoint.statements;
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Number of statements appended so far.
    pub fn statement_count(&self) -> usize {
        self.statements
    }

    pub fn into_parts(self) -> (String, Vec<Parameter>) {
        (self.sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_follow_bind_order() {
        let mut b = SqlBuilder::new(Dialect::Postgres);
        b.push_str("UPDATE ")
            .push_table("users", Some("app"))
            .push_str(" SET ")
            .push_ident("name")
            .push_str(" = ")
            .push_param(Some("p0"), &Value::Text("Ada".into()))
            .push_str(" WHERE ")
            .push_ident("id")
            .push_str(" = ")
            .push_param(Some("p1"), &Value::BigInt(1))
            .end_statement();

        assert_eq!(
            b.sql(),
            "UPDATE \"app\".\"users\" SET \"name\" = $1 WHERE \"id\" = $2;\n"
        );
        assert_eq!(b.params()[1].name, "p1");
        assert_eq!(b.statement_count(), 1);
    }

    #[test]
    fn test_rollback_discards_text_and_params() {
        let mut b = SqlBuilder::new(Dialect::Sqlite);
        b.push_str("SELECT ").push_param(None, &Value::Int(1)).end_statement();
        let cp = b.checkpoint();
        b.push_str("SELECT ").push_param(None, &Value::Int(2)).end_statement();
        b.rollback_to(cp);

        assert_eq!(b.sql(), "SELECT ?1;\n");
        assert_eq!(b.parameter_count(), 1);
    }
}
