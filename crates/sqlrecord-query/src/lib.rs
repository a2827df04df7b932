//! SQL query builder for SQLRecord.
//!
//! `sqlrecord-query` is the **query construction layer**. It turns fluent builder
//! calls into SQL text with `?` placeholders plus a positional parameter list.
//!
//! # Role In The Architecture
//!
//! - **Predicate trees**: `Where` builds nested AND/OR conditions for WHERE and HAVING.
//! - **SELECT assembly**: `Select` renders every clause in a fixed order.
//! - **Write statements**: `InsertBuilder`, `UpdateBuilder`, `DeleteBuilder`.
//! - **Dialect support**: identifier quoting for ANSI SQL and MySQL.
//!
//! The resulting statements execute through the `Executor` trait from
//! `sqlrecord-core`. Most users reach these builders through the `sqlrecord`
//! facade crate.

pub mod builder;
pub mod clause;
pub mod dialect;
pub mod join;
pub mod paginate;
pub mod select;

pub use builder::{DeleteBuilder, InsertBuilder, UpdateBuilder, where_eq};
pub use clause::{Conjunction, OrderBy, OrderDirection, Predicate, Where};
pub use dialect::{Column, Dialect, raw};
pub use join::{Join, JoinType};
pub use paginate::Paginate;
pub use select::{FromTable, Select, SelectColumn};
