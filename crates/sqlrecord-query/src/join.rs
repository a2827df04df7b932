//! JOIN clause types.

use crate::dialect::Dialect;
use sqlrecord_core::{Error, QueryError, QueryErrorKind};
use std::fmt;
use std::str::FromStr;

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    ///
    /// INNER is the implied default and renders as a bare `JOIN`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        })
    }
}

impl FromStr for JoinType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            _ => Err(Error::Query(QueryError::new(
                QueryErrorKind::BadJoinType,
                format!("Unknown join type \"{s}\""),
            ))),
        }
    }
}

/// A JOIN clause.
///
/// The ON predicate is raw SQL; only the joined table (and its alias) are quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Table (or FROM alias) on the left-hand side
    pub left: String,
    /// Table being joined in
    pub right: String,
    /// Optional alias for the joined table
    pub alias: Option<String>,
    /// ON condition, e.g. `users.id = posts.user_id`
    pub predicate: String,
}

impl Join {
    pub fn new(
        join_type: JoinType,
        left: impl Into<String>,
        right: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            join_type,
            left: left.into(),
            right: right.into(),
            alias: None,
            predicate: predicate.into(),
        }
    }

    /// Create an INNER JOIN.
    pub fn inner(
        left: impl Into<String>,
        right: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Inner, left, right, predicate)
    }

    /// Create a LEFT JOIN.
    pub fn left(
        left: impl Into<String>,
        right: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Left, left, right, predicate)
    }

    /// Create a RIGHT JOIN.
    pub fn right(
        left: impl Into<String>,
        right: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Right, left, right, predicate)
    }

    /// Set an alias for the joined table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Generate SQL for this join.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = format!(
            "{} {}",
            self.join_type.as_str(),
            dialect.quote_table(&self.right)
        );
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(&dialect.quote_table(alias));
        }
        sql.push_str(" ON ");
        sql.push_str(&self.predicate);
        sql
    }
}
