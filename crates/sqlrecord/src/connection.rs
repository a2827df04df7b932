//! Connections and the named connection registry.
//!
//! A [`Connection`] wraps a raw [`Executor`] with everything the model layer
//! needs around it: a quoting dialect picked from the driver name, an optional
//! query logger, and named result caches.

use indexmap::IndexMap;
use sqlrecord_core::{
    Cache, ConfigError, ConfigErrorKind, Error, Executor, QueryLogger, Result, Row, Value,
};
use sqlrecord_query::{DeleteBuilder, Dialect, InsertBuilder, Select, UpdateBuilder, where_eq};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Name used when no cache name is given.
pub const DEFAULT_CACHE: &str = "default";

/// An executor plus its logger and caches.
pub struct Connection {
    executor: Box<dyn Executor>,
    dialect: Dialect,
    logger: RwLock<Option<Arc<dyn QueryLogger>>>,
    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.executor.driver_name())
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self::from_boxed(Box::new(executor))
    }

    pub fn from_boxed(executor: Box<dyn Executor>) -> Self {
        let dialect = Dialect::for_driver(executor.driver_name());
        Self {
            executor,
            dialect,
            logger: RwLock::new(None),
            caches: RwLock::new(HashMap::new()),
        }
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Quoting dialect for this connection's driver.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A SELECT builder using this connection's dialect.
    pub fn select(&self) -> Select {
        Select::with_dialect(self.dialect)
    }

    pub fn set_logger(&self, logger: Arc<dyn QueryLogger>) -> &Self {
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = Some(logger);
        self
    }

    pub fn clear_logger(&self) {
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a cache under `name`, replacing any previous one.
    pub fn set_cache(&self, name: impl Into<String>, cache: Arc<dyn Cache>) -> &Self {
        self.caches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), cache);
        self
    }

    pub fn cache(&self, name: &str) -> Result<Arc<dyn Cache>> {
        self.caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::Config(ConfigError::new(
                    ConfigErrorKind::UnknownCache,
                    format!("Cache named \"{name}\" is not registered to this connection"),
                ))
            })
    }

    // ==================== Statements ====================

    /// Insert a row and return the generated id.
    pub fn insert(&self, table: &str, values: IndexMap<String, Value>) -> Result<i64> {
        let (sql, params) = InsertBuilder::new(table)
            .values(values)
            .build_with_dialect(self.dialect)?;
        self.timed(&sql, &params, || self.executor.insert(&sql, &params))
    }

    /// Update rows matching every `column = value` pair in `filter`.
    pub fn update(
        &self,
        table: &str,
        values: IndexMap<String, Value>,
        filter: IndexMap<String, Value>,
    ) -> Result<u64> {
        let (sql, params) = UpdateBuilder::new(table)
            .values(values)
            .filter(where_eq(filter))
            .build_with_dialect(self.dialect)?;
        self.timed(&sql, &params, || self.executor.execute(&sql, &params))
    }

    /// Delete rows matching every `column = value` pair in `filter`.
    pub fn delete(&self, table: &str, filter: IndexMap<String, Value>) -> Result<u64> {
        let (sql, params) = DeleteBuilder::new(table)
            .filter(where_eq(filter))
            .build_with_dialect(self.dialect);
        self.timed(&sql, &params, || self.executor.execute(&sql, &params))
    }

    pub fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.timed(sql, params, || self.executor.query(sql, params))
    }

    /// First row of a query, if any.
    pub fn fetch(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        self.timed(sql, params, || self.executor.query_one(sql, params))
    }

    /// Run a statement that returns no rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.timed(sql, params, || self.executor.execute(sql, params))
    }

    pub fn execute_query(&self, select: &Select) -> Result<Vec<Row>> {
        let (sql, params) = select.build();
        self.fetch_all(&sql, &params)
    }

    fn timed<T>(&self, sql: &str, params: &[Value], run: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = run();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            sql = %sql,
            params = params.len(),
            elapsed_ms,
            ok = result.is_ok(),
            "Executed statement"
        );
        if let Some(logger) = self.logger() {
            logger.on_query(sql, params, elapsed_ms);
        }
        result
    }
}

type ConnectionFactory = Box<dyn Fn() -> Result<Connection> + Send + Sync>;

/// Named connections, each built on first use.
#[derive(Default)]
pub struct ConnectionManager {
    factories: IndexMap<String, ConnectionFactory>,
    built: HashMap<String, Arc<Connection>>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("registered", &self.registered())
            .field("built", &self.built.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection factory. Re-registering a name drops any
    /// connection already built under it.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Connection> + Send + Sync + 'static,
    {
        let name = name.into();
        self.built.remove(&name);
        self.factories.insert(name, Box::new(factory));
        self
    }

    /// Registered names, in registration order.
    pub fn registered(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// The connection called `name`, building it on first request.
    pub fn connection(&mut self, name: &str) -> Result<Arc<Connection>> {
        if let Some(conn) = self.built.get(name) {
            return Ok(Arc::clone(conn));
        }
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(ConfigError::new(
                ConfigErrorKind::UnknownConnection,
                format!("Unknown connection \"{name}\""),
            ))
        })?;
        tracing::debug!(name, "Building connection");
        let conn = Arc::new(factory()?);
        self.built.insert(name.to_string(), Arc::clone(&conn));
        Ok(conn)
    }
}
