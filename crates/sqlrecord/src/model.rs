//! Active-record models with change tracking.
//!
//! A [`Model`] keeps two maps: `original`, the last state known to be in the
//! database, and `changed`, the assignments made since. Reads prefer
//! `changed`. [`Model::save`] decides between INSERT and UPDATE by whether
//! the primary key is present in `original`.
//!
//! Record types implement [`Record`] to name themselves and describe their
//! schema:
//!
//! ```rust
//! use sqlrecord::prelude::*;
//!
//! struct User;
//!
//! impl Record for User {
//!     const NAME: &'static str = "User";
//!
//!     fn init(meta: Meta) -> Result<Meta> {
//!         Ok(meta
//!             .with_field("name", Text::with_options(FieldOptions::new().rule(Rule::required())))
//!             .with_field("active", Boolean::new()))
//!     }
//! }
//!
//! let mut user = User::factory().unwrap();
//! assert_eq!(user.meta().table(), "users");
//!
//! user.set("name", "Alex").unwrap().set("active", true).unwrap();
//! assert_eq!(user.changes().get("active"), Some(&Value::Int(1)));
//! assert_eq!(user.get("active").unwrap(), Value::Bool(true));
//! assert!(!user.is_loaded());
//! ```

use crate::connection::Connection;
use crate::meta::Meta;
use crate::query::Query;
use indexmap::IndexMap;
use sqlrecord_core::{
    ConfigError, ConfigErrorKind, Error, MessageBundle, QueryError, QueryErrorKind, Result, Row,
    RuleSet, Validator, Value,
};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A record type: a name plus a schema.
pub trait Record: 'static {
    /// Type name; the default table is its plural, lowercased.
    const NAME: &'static str;

    /// Describe fields, relationships, table and keys.
    fn init(meta: Meta) -> Result<Meta> {
        Ok(meta)
    }

    /// The shared schema for this type.
    fn meta() -> Result<Arc<Meta>> {
        meta_for::<Self>()
    }

    /// A fresh, empty model of this type.
    fn factory() -> Result<Model> {
        Model::factory::<Self>()
    }

    /// Load by primary key; not loaded when no row matches.
    fn find_by_id(conn: &Connection, id: impl Into<Value>) -> Result<Model> {
        Model::find_by_id::<Self>(conn, id)
    }

    /// A query over this type's table.
    fn query(conn: &Connection) -> Result<Query<'_>> {
        Model::query::<Self>(conn)
    }
}

type MetaRegistry = RwLock<HashMap<TypeId, Arc<Meta>>>;

fn registry() -> &'static MetaRegistry {
    static REGISTRY: OnceLock<MetaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MetaRegistry::default)
}

/// Build (once) and return the schema for `R`.
pub fn meta_for<R: Record + ?Sized>() -> Result<Arc<Meta>> {
    let id = TypeId::of::<R>();
    if let Some(meta) = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return Ok(Arc::clone(meta));
    }

    let meta = Arc::new(R::init(Meta::new(R::NAME))?);
    tracing::debug!(model = R::NAME, table = %meta.table(), "Built model meta");
    let mut registry = registry().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(registry.entry(id).or_insert(meta)))
}

/// One row's worth of tracked values.
#[derive(Debug, Clone)]
pub struct Model {
    meta: Arc<Meta>,
    original: IndexMap<String, Value>,
    changed: IndexMap<String, Value>,
}

impl Model {
    pub fn new(meta: Arc<Meta>) -> Self {
        Self {
            meta,
            original: IndexMap::new(),
            changed: IndexMap::new(),
        }
    }

    pub fn factory<R: Record + ?Sized>() -> Result<Self> {
        Ok(Self::new(meta_for::<R>()?))
    }

    pub fn meta(&self) -> &Arc<Meta> {
        &self.meta
    }

    // ==================== Values ====================

    /// Assign a value, passing it through the field's set hook.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let meta = Arc::clone(&self.meta);
        let value = match meta.field(key) {
            Some(field) => field.set(self, key, value.into())?,
            None => value.into(),
        };
        self.changed.insert(key.to_string(), value);
        Ok(self)
    }

    pub fn set_values<I, K, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.set(key.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Stage a fetched row as pending changes, exactly as stored.
    ///
    /// Stored values are already in database form, so set hooks are skipped.
    pub fn set_row(&mut self, row: &Row) -> &mut Self {
        for (name, value) in row.iter() {
            self.changed.insert(name.to_string(), value.clone());
        }
        self
    }

    /// Populate from a fetched row and mark it persisted.
    pub fn load(&mut self, row: &Row) -> &mut Self {
        self.set_row(row).set_as_saved()
    }

    /// Current value: pending change, else original, else `Null`; passed
    /// through the field's read hook.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.get_or(key, Value::Null)
    }

    /// Like [`Model::get`] with a fallback for unset keys.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        let value = self
            .changed
            .get(key)
            .or_else(|| self.original.get(key))
            .cloned()
            .unwrap_or_else(|| default.into());
        self.read_transform(key, value)
    }

    /// The persisted value, ignoring pending changes.
    pub fn original(&self, key: &str) -> Result<Value> {
        match self.original.get(key) {
            None | Some(Value::Null) => Ok(Value::Null),
            Some(value) => self.read_transform(key, value.clone()),
        }
    }

    fn read_transform(&self, key: &str, value: Value) -> Result<Value> {
        match self.meta.field(key) {
            Some(field) => field.database_to_value(self, key, value),
            None => Ok(value),
        }
    }

    pub fn is_value_set(&self, key: &str) -> bool {
        self.changed.contains_key(key) || self.original.contains_key(key)
    }

    /// Pending changes, in assignment order.
    pub fn changes(&self) -> &IndexMap<String, Value> {
        &self.changed
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Original values overlaid with pending changes.
    pub fn values(&self) -> IndexMap<String, Value> {
        let mut merged = self.original.clone();
        for (key, value) in &self.changed {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Promote pending changes into the original values.
    pub fn set_as_saved(&mut self) -> &mut Self {
        for (key, value) in self.changed.drain(..) {
            self.original.insert(key, value);
        }
        self
    }

    pub fn is_loaded(&self) -> bool {
        !self.original.is_empty()
    }

    // ==================== Persistence ====================

    /// Validate, then INSERT or UPDATE.
    ///
    /// A persisted model without pending changes is left alone, unvalidated.
    /// On failure the model is left untouched, pending changes included.
    pub fn save(&mut self, conn: &Connection) -> Result<&mut Self> {
        let persisted = self.has_primary_key();
        if persisted && !self.has_changes() {
            return Ok(self);
        }
        self.validate(&RuleSet::new(), None)?;
        if persisted {
            self.update(conn)
        } else {
            self.create(conn)
        }
    }

    fn has_primary_key(&self) -> bool {
        self.meta
            .primary_key()
            .iter()
            .all(|pk| self.original.contains_key(pk))
    }

    fn create(&mut self, conn: &Connection) -> Result<&mut Self> {
        let table = self.meta.table();
        let values = self.database_values(&self.changed)?;
        let id = conn.insert(&table, values)?;
        tracing::debug!(table = %table, id, "Created record");

        self.set_as_saved();
        if let [pk] = self.meta.primary_key() {
            if !self.original.contains_key(pk) {
                self.original.insert(pk.clone(), Value::BigInt(id));
            }
        }
        Ok(self)
    }

    fn update(&mut self, conn: &Connection) -> Result<&mut Self> {
        let values = self.database_values(&self.changed)?;
        if !values.is_empty() {
            conn.update(&self.meta.table(), values, self.key_filter()?)?;
        }
        self.set_as_saved();
        Ok(self)
    }

    /// DELETE this row. Does nothing for a model that was never loaded.
    pub fn delete(&self, conn: &Connection) -> Result<()> {
        if !self.is_loaded() {
            return Ok(());
        }
        conn.delete(&self.meta.table(), self.key_filter()?)?;
        Ok(())
    }

    /// Primary key columns with their persisted values.
    fn key_filter(&self) -> Result<IndexMap<String, Value>> {
        self.meta
            .primary_key()
            .iter()
            .map(|pk| match self.original.get(pk) {
                Some(value) => Ok((pk.clone(), value.clone())),
                None => Err(Error::Query(QueryError::new(
                    QueryErrorKind::Incomplete,
                    format!(
                        "{} has no stored value for primary key column \"{pk}\"",
                        self.meta.name()
                    ),
                ))),
            })
            .collect()
    }

    /// Run the to-database hook over `values`, dropping columns kept out of
    /// the database.
    fn database_values(&self, values: &IndexMap<String, Value>) -> Result<IndexMap<String, Value>> {
        let mut out = IndexMap::with_capacity(values.len());
        for (key, value) in values {
            match self.meta.field(key) {
                Some(field) if !field.in_database() => {}
                Some(field) => {
                    out.insert(key.clone(), field.value_to_database(self, key, value.clone())?);
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(out)
    }

    // ==================== Validation ====================

    /// Check field rules plus `extra` against original values overlaid with
    /// pending changes.
    ///
    /// Fails with `Error::Validation` carrying every message per field.
    pub fn validate(&self, extra: &RuleSet, messages: Option<&MessageBundle>) -> Result<bool> {
        let mut data = IndexMap::new();
        for (key, value) in self.values() {
            let value = match self.meta.field(&key) {
                Some(field) => field.value_to_database(self, &key, value)?,
                None => value,
            };
            data.insert(key, value);
        }

        let mut validator = Validator::new(&data);
        if let Some(bundle) = messages {
            validator = validator.with_messages(bundle);
        }
        for (name, field) in self.meta.fields() {
            validator.rules(name, field.validation());
        }
        for (name, rules) in extra {
            validator.rules(name, rules.iter().cloned());
        }
        validator.validate()?;
        Ok(true)
    }

    // ==================== Lookup ====================

    /// A query over `R`'s table.
    pub fn query<R: Record + ?Sized>(conn: &Connection) -> Result<Query<'_>> {
        Ok(Query::new(conn, Self::factory::<R>()?))
    }

    /// Load the `R` whose primary key is `id`.
    ///
    /// Returns a model that is not loaded when no row matches.
    pub fn find_by_id<R: Record + ?Sized>(conn: &Connection, id: impl Into<Value>) -> Result<Self> {
        let meta = meta_for::<R>()?;
        let [pk] = meta.primary_key() else {
            return Err(Error::Config(ConfigError::new(
                ConfigErrorKind::Other,
                format!(
                    "find_by_id needs a single-column primary key, {} has {}",
                    meta.name(),
                    meta.primary_key().len()
                ),
            )));
        };
        Self::query::<R>(conn)?.filter(pk.as_str(), "=", id).fetch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Boolean, DateTime, DateTimeOptions, FieldOptions, Text};
    use chrono::FixedOffset;
    use sqlrecord_core::Rule;

    struct Article;

    impl Record for Article {
        const NAME: &'static str = "Article";

        fn init(meta: Meta) -> Result<Meta> {
            Ok(meta
                .with_field(
                    "title",
                    Text::with_options(
                        FieldOptions::new()
                            .rule(Rule::required())
                            .rule(Rule::length_min(2)),
                    ),
                )
                .with_field("published", Boolean::new())
                .with_field(
                    "draft_notes",
                    Text::with_options(FieldOptions::new().in_database(false)),
                ))
        }
    }

    #[test]
    fn meta_is_built_once() {
        let a = Article::meta().unwrap();
        let b = Article::factory().unwrap();
        assert!(Arc::ptr_eq(&a, b.meta()));
        assert_eq!(a.table(), "articles");
    }

    #[test]
    fn changed_wins_over_original() {
        let mut m = Article::factory().unwrap();
        m.set("x", "a").unwrap();
        assert_eq!(m.get("x").unwrap(), Value::from("a"));
        assert!(m.has_changes());

        m.set_as_saved();
        assert_eq!(m.get("x").unwrap(), Value::from("a"));
        assert_eq!(m.original("x").unwrap(), Value::from("a"));
        assert!(!m.has_changes());
        assert!(m.is_loaded());

        m.set("x", "b").unwrap();
        assert_eq!(m.get("x").unwrap(), Value::from("b"));
        assert_eq!(m.original("x").unwrap(), Value::from("a"));
    }

    #[test]
    fn get_falls_back_to_default() {
        let m = Article::factory().unwrap();
        assert_eq!(m.get("missing").unwrap(), Value::Null);
        assert_eq!(m.get_or("missing", 5).unwrap(), Value::Int(5));
        assert!(!m.is_value_set("missing"));
        // Read hooks run on defaults too.
        assert_eq!(m.get("published").unwrap(), Value::Bool(false));
    }

    #[test]
    fn set_as_saved_is_idempotent() {
        let mut m = Article::factory().unwrap();
        m.set("title", "Hello").unwrap();
        m.set_as_saved().set_as_saved();
        assert_eq!(m.original("title").unwrap(), Value::from("Hello"));
        assert!(m.changes().is_empty());
    }

    #[test]
    fn set_runs_field_hook_but_set_row_does_not() {
        let mut m = Article::factory().unwrap();
        m.set("published", "yes").unwrap();
        assert_eq!(m.changes()["published"], Value::Int(1));

        let mut loaded = Article::factory().unwrap();
        loaded.load(&Row::from_pairs([("id", Value::Int(3)), ("published", Value::from("raw"))]));
        assert_eq!(loaded.original.get("published"), Some(&Value::from("raw")));
        assert!(loaded.is_loaded());
        assert!(!loaded.has_changes());
    }

    #[test]
    fn original_null_skips_read_hook() {
        let mut m = Article::factory().unwrap();
        m.load(&Row::from_pairs([("published", Value::Null)]));
        assert_eq!(m.original("published").unwrap(), Value::Null);
        assert_eq!(m.get("published").unwrap(), Value::Bool(false));
    }

    #[test]
    fn validate_reports_per_field_messages() {
        let mut m = Article::factory().unwrap();
        let err = m.validate(&RuleSet::new(), None).unwrap_err();
        let messages = err.validation_messages().unwrap();
        assert_eq!(messages["title"], vec!["Title is required".to_string()]);

        m.set("title", "A").unwrap();
        let messages = m
            .validate(&RuleSet::new(), None)
            .unwrap_err()
            .validation_messages()
            .unwrap();
        assert_eq!(
            messages["title"],
            vec!["Title must be at least 2 characters long".to_string()]
        );

        m.set("title", "Hello").unwrap();
        assert!(m.validate(&RuleSet::new(), None).unwrap());
    }

    #[test]
    fn validate_with_extra_rules() {
        let mut m = Article::factory().unwrap();
        m.set("title", "Hello").unwrap();

        let mut extra = RuleSet::new();
        extra.insert("title".to_string(), vec![Rule::contains("ell")]);
        assert!(m.validate(&extra, None).unwrap());

        extra.insert("title".to_string(), vec![Rule::contains("xyz")]);
        let messages = m.validate(&extra, None).unwrap_err().validation_messages().unwrap();
        assert_eq!(messages["title"], vec!["Title must contain xyz".to_string()]);
    }

    #[test]
    fn database_values_skip_virtual_fields() {
        let mut m = Article::factory().unwrap();
        m.set("title", "Hello").unwrap();
        m.set("draft_notes", "scratch").unwrap();
        m.set("published", false).unwrap();
        let values = m.database_values(m.changes()).unwrap();
        let keys: Vec<_> = values.keys().cloned().collect();
        assert_eq!(keys, vec!["title", "published"]);
        assert_eq!(values["published"], Value::Int(0));
    }

    #[test]
    fn validate_sees_database_form() {
        struct Event;
        impl Record for Event {
            const NAME: &'static str = "Event";
            fn init(meta: Meta) -> Result<Meta> {
                Ok(meta.with_field(
                    "starts_at",
                    DateTime::new(DateTimeOptions {
                        timezone: FixedOffset::east_opt(0),
                        field: FieldOptions::new().rule(Rule::integer()),
                        ..Default::default()
                    })?,
                ))
            }
        }

        let mut m = Event::factory().unwrap();
        m.set("starts_at", "2014-07-02 12:31:47").unwrap();
        assert!(m.validate(&RuleSet::new(), None).unwrap());
    }

    #[test]
    fn key_filter_requires_stored_key() {
        let mut m = Article::factory().unwrap();
        m.load(&Row::from_pairs([("title", "Orphan")]));
        match m.key_filter() {
            Err(Error::Query(e)) => assert_eq!(e.kind, QueryErrorKind::Incomplete),
            other => panic!("expected incomplete key, got {other:?}"),
        }
    }
}
