//! Model queries with read-through caching.
//!
//! A [`Query`] is a [`Select`] scoped to one record type's table and bound
//! to a connection. Results come back as models: [`Query::fetch_all`] wraps
//! rows in a lazily-materializing [`Resultset`], [`Query::fetch`] returns a
//! single model.
//!
//! Tagging a query with [`Query::cache_for`] makes every execution check the
//! named cache first. Hits never touch the executor; misses run the query and
//! store the raw rows (empty results included). Counts are stored under the
//! same key with a `__count` suffix so a query can cache both. `fetch` and
//! `fetch_all` share the bare key: `fetch` reuses stored rows, while a single
//! row stored by `fetch` counts as a miss for `fetch_all`.

use crate::connection::{Connection, DEFAULT_CACHE};
use crate::model::Model;
use crate::resultset::Resultset;
use sqlrecord_core::{CacheValue, Error, Result, Row, TypeError, Value};
use sqlrecord_query::{Column, Join, OrderDirection, Select, Where};

/// Cache lifetime meaning "do not cache".
pub const CACHE_NEVER: i64 = -1;
/// Cache lifetime meaning "keep until evicted".
pub const CACHE_FOREVER: i64 = 0;

/// Suffix appended to a query's cache key for its count.
const COUNT_SUFFIX: &str = "__count";

/// How long a cached result lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLifetime {
    Never,
    Forever,
    Seconds(u64),
}

impl CacheLifetime {
    /// TTL handed to the cache; zero means forever.
    fn ttl_seconds(self) -> u64 {
        match self {
            CacheLifetime::Never | CacheLifetime::Forever => 0,
            CacheLifetime::Seconds(secs) => secs,
        }
    }
}

impl From<i64> for CacheLifetime {
    fn from(seconds: i64) -> Self {
        match seconds {
            s if s < 0 => CacheLifetime::Never,
            0 => CacheLifetime::Forever,
            s => CacheLifetime::Seconds(s.unsigned_abs()),
        }
    }
}

impl From<std::time::Duration> for CacheLifetime {
    fn from(duration: std::time::Duration) -> Self {
        match duration.as_secs() {
            0 => CacheLifetime::Forever,
            secs => CacheLifetime::Seconds(secs),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheSettings {
    lifetime: CacheLifetime,
    key: String,
    cache: String,
}

/// A SELECT over one model's table.
#[derive(Debug, Clone)]
pub struct Query<'c> {
    conn: &'c Connection,
    prototype: Model,
    select: Select,
    cache: Option<CacheSettings>,
}

impl<'c> Query<'c> {
    /// Query `prototype`'s table; results are clones of `prototype`.
    pub fn new(conn: &'c Connection, prototype: Model) -> Self {
        let select = conn.select().from(prototype.meta().table());
        Self {
            conn,
            prototype,
            select,
            cache: None,
        }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    pub fn prototype(&self) -> &Model {
        &self.prototype
    }

    /// The underlying SELECT.
    pub fn as_select(&self) -> &Select {
        &self.select
    }

    pub fn sql(&self) -> String {
        self.select.sql()
    }

    pub fn params(&self) -> Vec<Value> {
        self.select.params()
    }

    // ==================== Building ====================

    pub fn select<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.select = self.select.select(cols);
        self
    }

    pub fn select_as(mut self, column: impl Into<Column>, alias: impl Into<String>) -> Self {
        self.select = self.select.select_as(column, alias);
        self
    }

    pub fn filter(mut self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.select = self.select.filter(field, operator, value);
        self
    }

    pub fn or_filter(
        mut self,
        field: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.select = self.select.or_filter(field, operator, value);
        self
    }

    pub fn filter_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.select = self.select.filter_group(build);
        self
    }

    pub fn or_filter_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.select = self.select.or_filter_group(build);
        self
    }

    pub fn having(mut self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.select = self.select.having(field, operator, value);
        self
    }

    pub fn or_having(
        mut self,
        field: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.select = self.select.or_having(field, operator, value);
        self
    }

    pub fn having_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.select = self.select.having_group(build);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.select = self.select.join(join);
        self
    }

    pub fn group_by<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.select = self.select.group_by(cols);
        self
    }

    pub fn order_by(mut self, column: impl Into<Column>, direction: OrderDirection) -> Self {
        self.select = self.select.order_by(column, direction);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.select = self.select.limit(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.select = self.select.offset(n);
        self
    }

    // ==================== Caching ====================

    /// Cache results in the default cache under `key`.
    pub fn cache_for(self, lifetime: impl Into<CacheLifetime>, key: impl Into<String>) -> Self {
        self.cache_for_in(lifetime, key, DEFAULT_CACHE)
    }

    /// Cache results in the cache registered as `cache` under `key`.
    ///
    /// A lifetime of [`CacheLifetime::Never`] turns caching off.
    pub fn cache_for_in(
        mut self,
        lifetime: impl Into<CacheLifetime>,
        key: impl Into<String>,
        cache: impl Into<String>,
    ) -> Self {
        let lifetime = lifetime.into();
        self.cache = match lifetime {
            CacheLifetime::Never => None,
            _ => Some(CacheSettings {
                lifetime,
                key: key.into(),
                cache: cache.into(),
            }),
        };
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.cache.as_ref().map(|c| c.key.as_str())
    }

    pub fn cache_lifetime(&self) -> CacheLifetime {
        self.cache
            .as_ref()
            .map_or(CacheLifetime::Never, |c| c.lifetime)
    }

    // ==================== Execution ====================

    /// Run the query and wrap every row.
    pub fn fetch_all(&self) -> Result<Resultset> {
        let value = self.read_through("", CacheValue::is_rows, || {
            let (sql, params) = self.select.build();
            self.conn.fetch_all(&sql, &params).map(CacheValue::Rows)
        })?;
        let rows = match value {
            CacheValue::Rows(rows) => rows,
            _ => return Err(cache_mismatch("rows")),
        };
        Ok(Resultset::new(rows, self.prototype.clone()))
    }

    /// Run the query with `LIMIT 1`.
    ///
    /// With no matching row the returned model is not loaded.
    pub fn fetch(&self) -> Result<Model> {
        let value = self.read_through("", is_row_or_rows, || {
            let (sql, params) = self.select.clone().limit(1).build();
            self.conn.fetch(&sql, &params).map(CacheValue::Row)
        })?;
        let row: Option<Row> = match value {
            CacheValue::Row(row) => row,
            CacheValue::Rows(rows) => rows.into_iter().next(),
            CacheValue::Count(_) => return Err(cache_mismatch("row")),
        };
        let mut model = self.prototype.clone();
        if let Some(row) = row {
            model.load(&row);
        }
        Ok(model)
    }

    /// Number of rows the query matches, ignoring ORDER BY and pagination.
    pub fn count(&self) -> Result<u64> {
        let value = self.read_through(COUNT_SUFFIX, CacheValue::is_count, || {
            let (sql, params) = self.count_query();
            let row = self.conn.fetch(&sql, &params)?;
            let count = row
                .as_ref()
                .and_then(|r| r.get(0))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            Ok(CacheValue::Count(u64::try_from(count).unwrap_or(0)))
        })?;
        match value {
            CacheValue::Count(count) => Ok(count),
            _ => Err(cache_mismatch("count")),
        }
    }

    fn count_query(&self) -> (String, Vec<Value>) {
        if self.select.group_by_columns().is_empty() {
            return self.select.count_query();
        }
        // Grouped queries count groups, not rows.
        let mut inner = self.select.clone();
        inner.reset_order_by();
        inner.reset_limit();
        inner.reset_offset();
        let (sql, params) = inner.build();
        let dialect = self.select.dialect();
        (
            format!(
                "SELECT COUNT(*) AS {} FROM ({sql}) {}",
                dialect.quote_field("count"),
                dialect.quote_table("grouped")
            ),
            params,
        )
    }

    /// Serve from the cache when the stored value has a shape `usable`
    /// accepts; otherwise run the query and overwrite the entry.
    fn read_through(
        &self,
        suffix: &str,
        usable: fn(&CacheValue) -> bool,
        run: impl FnOnce() -> Result<CacheValue>,
    ) -> Result<CacheValue> {
        let Some(settings) = &self.cache else {
            return run();
        };
        let cache = self.conn.cache(&settings.cache)?;
        let key = format!("{}{suffix}", settings.key);

        match cache.get(&key) {
            Some(hit) if usable(&hit) => {
                tracing::trace!(key = %key, cache = %settings.cache, "Query cache hit");
                return Ok(hit);
            }
            Some(_) => {
                tracing::trace!(key = %key, cache = %settings.cache, "Query cache entry has another shape");
            }
            None => {}
        }
        tracing::trace!(key = %key, cache = %settings.cache, "Query cache miss");
        let value = run()?;
        cache.set(&key, value.clone(), settings.lifetime.ttl_seconds());
        Ok(value)
    }
}

fn is_row_or_rows(value: &CacheValue) -> bool {
    !value.is_count()
}

fn cache_mismatch(expected: &'static str) -> Error {
    Error::Type(TypeError {
        expected,
        actual: "cached value of another shape".to_string(),
        column: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_from_seconds() {
        assert_eq!(CacheLifetime::from(CACHE_NEVER), CacheLifetime::Never);
        assert_eq!(CacheLifetime::from(-30_i64), CacheLifetime::Never);
        assert_eq!(CacheLifetime::from(CACHE_FOREVER), CacheLifetime::Forever);
        assert_eq!(CacheLifetime::from(60_i64), CacheLifetime::Seconds(60));
        assert_eq!(
            CacheLifetime::from(std::time::Duration::from_secs(5)),
            CacheLifetime::Seconds(5)
        );
    }

    #[test]
    fn ttl_seconds() {
        assert_eq!(CacheLifetime::Forever.ttl_seconds(), 0);
        assert_eq!(CacheLifetime::Seconds(90).ttl_seconds(), 90);
    }
}
