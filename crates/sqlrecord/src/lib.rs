//! SQLRecord - an active-record ORM with a composable SQL builder.
//!
//! SQLRecord provides:
//!
//! - Models with change tracking (original vs. pending values)
//! - Per-field transforms and validation rules
//! - A fluent SELECT builder with nested AND/OR predicate groups
//! - Read-through result caching keyed per query
//! - Named connection and repository registries
//!
//! # Quick Start
//!
//! ```rust
//! use sqlrecord::prelude::*;
//! use sqlrecord_sqlite::SqliteConnection;
//!
//! struct Hero;
//!
//! impl Record for Hero {
//!     const NAME: &'static str = "Hero";
//!
//!     fn init(meta: Meta) -> Result<Meta> {
//!         Ok(meta
//!             .with_field("name", Text::with_options(FieldOptions::new().rule(Rule::required())))
//!             .with_field("age", Integer::new()))
//!     }
//! }
//!
//! let sqlite = SqliteConnection::open_memory().unwrap();
//! sqlite
//!     .execute_raw("CREATE TABLE heroes (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
//!     .unwrap();
//! let conn = Connection::new(sqlite);
//!
//! // Create
//! let mut hero = Hero::factory().unwrap();
//! hero.set("name", "Spider-Man").unwrap().set("age", 25).unwrap();
//! hero.save(&conn).unwrap();
//! assert!(hero.is_loaded());
//!
//! // Query
//! let adults = Hero::query(&conn)
//!     .unwrap()
//!     .filter("age", ">", 18)
//!     .order_by("name", OrderDirection::Asc)
//!     .count()
//!     .unwrap();
//! assert_eq!(adults, 1);
//!
//! // Update
//! let mut found = Hero::find_by_id(&conn, 1).unwrap();
//! found.set("age", 26).unwrap();
//! found.save(&conn).unwrap();
//!
//! // Delete
//! found.delete(&conn).unwrap();
//! assert!(!Hero::find_by_id(&conn, 1).unwrap().is_loaded());
//! ```
//!
//! # Crates
//!
//! - `sqlrecord-core`: values, rows, errors, the `Executor`/`Cache`/`QueryLogger`
//!   traits and the validation engine
//! - `sqlrecord-query`: SQL rendering (`Select`, `Where`, write builders, dialects)
//! - `sqlrecord-sqlite`: a bundled SQLite executor

pub mod connection;
pub mod field;
pub mod meta;
pub mod model;
pub mod query;
pub mod repo;
pub mod resultset;

pub use connection::{Connection, ConnectionManager, DEFAULT_CACHE};
pub use field::{
    Boolean, DateTime, DateTimeOptions, Email, Enum, EnumOptions, Field, FieldOptions, Float,
    HashFn, Integer, Password, PasswordOptions, StringField, Text,
};
pub use meta::{Meta, Relationship, RelationshipType};
pub use model::{Model, Record, meta_for};
pub use query::{CACHE_FOREVER, CACHE_NEVER, CacheLifetime, Query};
pub use repo::{ModelRepo, Repo, RepoManager};
pub use resultset::Resultset;

pub use sqlrecord_core::{
    ArrayCache, Cache, CacheValue, ConfigError, ConfigErrorKind, Error, Executor, MessageBundle,
    QueryError, QueryErrorKind, QueryEvent, QueryLog, QueryLogger, Result, Row, Rule, RuleSet,
    ValidationError, Validator, Value,
};
pub use sqlrecord_query::{
    Column, Conjunction, DeleteBuilder, Dialect, InsertBuilder, Join, JoinType, OrderDirection,
    Select, UpdateBuilder, Where, raw,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use sqlrecord::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ArrayCache,
        Boolean,
        CacheLifetime,
        Connection,
        DateTime,
        DateTimeOptions,
        Email,
        Enum,
        EnumOptions,
        Error,
        Field,
        FieldOptions,
        Float,
        Integer,
        Join,
        JoinType,
        MessageBundle,
        Meta,
        Model,
        OrderDirection,
        Password,
        PasswordOptions,
        QueryLog,
        Record,
        Result,
        Resultset,
        Rule,
        RuleSet,
        Select,
        StringField,
        Text,
        Value,
        Where,
        raw,
    };
}
