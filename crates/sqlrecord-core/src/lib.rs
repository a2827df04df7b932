//! Core types and traits for SQLRecord.
//!
//! `sqlrecord-core` is the **foundation layer** for the workspace. It defines the
//! values, rows and collaborator traits every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Values and rows**: `Value` and `Row` carry parameters and fetched data.
//! - **Executor**: the raw driver trait (`sqlrecord-sqlite` implements it).
//! - **Cache and logging**: read-through result caches and query logs.
//! - **Validation**: the rule engine behind `Model::validate`.
//!
//! Most users should depend on `sqlrecord` and use its prelude.

pub mod cache;
pub mod error;
pub mod executor;
pub mod log;
pub mod row;
pub mod validate;
pub mod value;

pub use cache::{ArrayCache, Cache, CacheValue};
pub use error::{
    ConfigError, ConfigErrorKind, ConnectionError, ConnectionErrorKind, Error, FieldValidationError,
    QueryError, QueryErrorKind, Result, TypeError, ValidationError,
};
pub use executor::Executor;
pub use log::{QueryEvent, QueryLog, QueryLogger};
pub use row::{ColumnInfo, Row};
pub use validate::{MessageBundle, Rule, RuleSet, Validator};
pub use value::Value;
