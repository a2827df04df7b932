//! Query builders for INSERT, UPDATE, DELETE operations.

use crate::clause::Where;
use crate::dialect::Dialect;
use sqlrecord_core::{Error, QueryError, QueryErrorKind, Result, Value};

fn incomplete(message: String) -> Error {
    Error::Query(QueryError::new(QueryErrorKind::Incomplete, message))
}

/// INSERT query builder.
#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    table: String,
    values: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Create a new INSERT builder for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Set a column value.
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Set several column values, keeping iteration order.
    pub fn values<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Build the INSERT SQL and parameters with the ANSI dialect.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        if self.values.is_empty() {
            return Err(incomplete(format!(
                "INSERT into {} has no values",
                self.table
            )));
        }

        let columns: Vec<_> = self
            .values
            .iter()
            .map(|(name, _)| dialect.quote_field(name))
            .collect();
        let placeholders = vec!["?"; self.values.len()];
        let params = self.values.iter().map(|(_, v)| v.clone()).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_table(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, params))
    }
}

/// UPDATE query builder.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    table: String,
    values: Vec<(String, Value)>,
    where_clause: Where,
}

impl UpdateBuilder {
    /// Create a new UPDATE builder for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
            where_clause: Where::new(),
        }
    }

    /// Set a column value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Set several column values, keeping iteration order.
    pub fn values<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Restrict the rows to update.
    pub fn filter(mut self, where_clause: Where) -> Self {
        self.where_clause = where_clause;
        self
    }

    /// Build the UPDATE SQL and parameters with the ANSI dialect.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters with specific dialect.
    ///
    /// SET values bind first, then the WHERE values.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        if self.values.is_empty() {
            return Err(incomplete(format!(
                "UPDATE of {} has no values",
                self.table
            )));
        }

        let set_clauses: Vec<_> = self
            .values
            .iter()
            .map(|(name, _)| format!("{} = ?", dialect.quote_field(name)))
            .collect();
        let mut params: Vec<Value> = self.values.iter().map(|(_, v)| v.clone()).collect();

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_table(&self.table),
            set_clauses.join(", ")
        );

        let predicate = self.where_clause.to_sql(dialect);
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
            params.extend(self.where_clause.params());
        }

        Ok((sql, params))
    }
}

/// DELETE query builder.
#[derive(Debug, Clone, Default)]
pub struct DeleteBuilder {
    table: String,
    where_clause: Where,
}

impl DeleteBuilder {
    /// Create a new DELETE builder for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: Where::new(),
        }
    }

    /// Restrict the rows to delete.
    pub fn filter(mut self, where_clause: Where) -> Self {
        self.where_clause = where_clause;
        self
    }

    /// Build the DELETE SQL and parameters with the ANSI dialect.
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the DELETE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut sql = format!("DELETE FROM {}", dialect.quote_table(&self.table));
        let predicate = self.where_clause.to_sql(dialect);
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        (sql, self.where_clause.params())
    }
}

/// Build a WHERE tree of `column = ?` leaves joined with AND.
pub fn where_eq<I, K>(pairs: I) -> Where
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    pairs
        .into_iter()
        .fold(Where::new(), |w, (k, v)| w.and(k.as_ref(), "=", v))
}
