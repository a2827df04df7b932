//! Statement executor trait.
//!
//! An [`Executor`] is the raw driver behind a connection: it receives SQL text
//! with `?` placeholders plus positional parameters, and returns rows, an
//! affected-row count, or the generated id of an insert. Parameters must be
//! bound in exactly the order supplied.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Synchronous statement executor.
pub trait Executor: Send + Sync {
    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT and return the generated identifier.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Driver name used to pick a quoting dialect (`"mysql"` or anything else).
    fn driver_name(&self) -> &str {
        "ansi"
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        (**self).query_one(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        (**self).insert(sql, params)
    }

    fn driver_name(&self) -> &str {
        (**self).driver_name()
    }
}
