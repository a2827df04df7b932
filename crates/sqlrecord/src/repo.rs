//! Repositories and the named repository registry.

use crate::connection::Connection;
use crate::model::{Model, Record};
use crate::query::Query;
use indexmap::IndexMap;
use sqlrecord_core::{ConfigError, ConfigErrorKind, Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Persistence for one kind of model.
pub trait Repo: Send + Sync {
    /// Create or update `model`.
    fn store(&self, model: &mut Model) -> Result<()>;

    /// Delete `model` if it was ever persisted.
    fn remove(&self, model: &Model) -> Result<()>;

    /// A query over the repository's table.
    fn query(&self) -> Result<Query<'_>>;
}

/// A [`Repo`] for record type `R` on a single connection.
pub struct ModelRepo<R: Record> {
    conn: Arc<Connection>,
    record: PhantomData<fn() -> R>,
}

impl<R: Record> ModelRepo<R> {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self {
            conn,
            record: PhantomData,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Load by primary key; not loaded when no row matches.
    pub fn find(&self, id: impl Into<sqlrecord_core::Value>) -> Result<Model> {
        Model::find_by_id::<R>(&self.conn, id)
    }
}

impl<R: Record> fmt::Debug for ModelRepo<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRepo")
            .field("record", &R::NAME)
            .field("conn", &self.conn)
            .finish()
    }
}

impl<R: Record> Repo for ModelRepo<R> {
    fn store(&self, model: &mut Model) -> Result<()> {
        model.save(&self.conn)?;
        Ok(())
    }

    fn remove(&self, model: &Model) -> Result<()> {
        model.delete(&self.conn)
    }

    fn query(&self) -> Result<Query<'_>> {
        Model::query::<R>(&self.conn)
    }
}

type RepoFactory = Box<dyn Fn() -> Result<Arc<dyn Repo>> + Send + Sync>;

/// Named repositories, each built on first request.
#[derive(Default)]
pub struct RepoManager {
    factories: IndexMap<String, RepoFactory>,
    built: HashMap<String, Arc<dyn Repo>>,
}

impl fmt::Debug for RepoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoManager")
            .field("registered", &self.factories.keys().collect::<Vec<_>>())
            .field("built", &self.built.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RepoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, T>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
        T: Repo + 'static,
    {
        let name = name.into();
        self.built.remove(&name);
        self.factories.insert(
            name,
            Box::new(move || factory().map(|repo| Arc::new(repo) as Arc<dyn Repo>)),
        );
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The repository called `name`, building it on first request.
    pub fn get(&mut self, name: &str) -> Result<Arc<dyn Repo>> {
        if let Some(repo) = self.built.get(name) {
            return Ok(Arc::clone(repo));
        }
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(ConfigError::new(
                ConfigErrorKind::UnknownRepo,
                format!("Unknown repository \"{name}\""),
            ))
        })?;
        let repo = factory()?;
        self.built.insert(name.to_string(), Arc::clone(&repo));
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct NullRepo {
        stored: AtomicUsize,
    }

    impl Repo for NullRepo {
        fn store(&self, model: &mut Model) -> Result<()> {
            self.stored.fetch_add(1, Ordering::SeqCst);
            model.set_as_saved();
            Ok(())
        }

        fn remove(&self, _model: &Model) -> Result<()> {
            Ok(())
        }

        fn query(&self) -> Result<Query<'_>> {
            Err(Error::Custom("queries are not supported".to_string()))
        }
    }

    #[test]
    fn builds_lazily_and_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let mut manager = RepoManager::new();
        manager.register("users", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(NullRepo::default())
        });
        assert!(manager.is_registered("users"));
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        let a = manager.get("users").unwrap();
        let b = manager.get("users").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_repo() {
        let mut manager = RepoManager::new();
        match manager.get("users").err() {
            Some(Error::Config(e)) => {
                assert_eq!(e.kind, ConfigErrorKind::UnknownRepo);
                assert_eq!(e.message, "Unknown repository \"users\"");
            }
            other => panic!("expected unknown repo, got {other:?}"),
        }
    }
}
