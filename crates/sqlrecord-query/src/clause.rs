//! SQL clause types (WHERE/HAVING predicates, ORDER BY).

use crate::dialect::{Column, Dialect};
use sqlrecord_core::{Error, QueryError, QueryErrorKind, Value};
use std::fmt;
use std::str::FromStr;

/// How a predicate attaches to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conjunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Conjunction::And),
            "OR" => Ok(Conjunction::Or),
            _ => Err(Error::Query(QueryError::new(
                QueryErrorKind::BadConjunction,
                format!("Unknown conjunction \"{s}\", expected AND or OR"),
            ))),
        }
    }
}

/// One node of a predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `<field> <operator> ?` bound to `value`
    Leaf {
        join: Conjunction,
        field: Column,
        operator: String,
        value: Value,
    },
    /// A parenthesised sub-tree
    Group { join: Conjunction, children: Where },
}

impl Predicate {
    pub fn join(&self) -> Conjunction {
        match self {
            Predicate::Leaf { join, .. } | Predicate::Group { join, .. } => *join,
        }
    }
}

/// A WHERE or HAVING predicate tree.
///
/// Leaves render as `<field> <operator> ?`, groups as `(<children>)`, each
/// joined to its predecessor by its own conjunction; the conjunction of the
/// first emitted node is dropped. `params()` walks the tree in the same order,
/// so the i-th parameter always binds the i-th placeholder.
///
/// ```
/// use sqlrecord_query::{Dialect, Where};
///
/// let w = Where::new()
///     .and("name", "=", "Alex")
///     .or("name", "=", "Lucie")
///     .and_group(|g| g.and("city", "=", "London").and("country", "=", "GB"));
///
/// assert_eq!(
///     w.to_sql(Dialect::Ansi),
///     r#""name" = ? OR "name" = ? AND ("city" = ? AND "country" = ?)"#
/// );
/// assert_eq!(w.params().len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    parts: Vec<Predicate>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf joined with AND.
    pub fn and(self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.push(Conjunction::And, field, operator, value)
    }

    /// Append a leaf joined with OR.
    pub fn or(self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.push(Conjunction::Or, field, operator, value)
    }

    /// Append a nested group joined with AND.
    pub fn and_group(self, build: impl FnOnce(Where) -> Where) -> Self {
        self.push_group(Conjunction::And, build)
    }

    /// Append a nested group joined with OR.
    pub fn or_group(self, build: impl FnOnce(Where) -> Where) -> Self {
        self.push_group(Conjunction::Or, build)
    }

    pub fn push(
        mut self,
        join: Conjunction,
        field: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.parts.push(Predicate::Leaf {
            join,
            field: field.into(),
            operator: operator.trim().to_string(),
            value: value.into(),
        });
        self
    }

    /// Build a fresh tree with `build` and attach it as one group.
    ///
    /// The conjunctions used inside `build` relate the group's own children;
    /// `join` only decides how the group attaches here.
    pub fn push_group(mut self, join: Conjunction, build: impl FnOnce(Where) -> Where) -> Self {
        let children = build(Where::new());
        self.parts.push(Predicate::Group { join, children });
        self
    }

    pub fn parts(&self) -> &[Predicate] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| match p {
            Predicate::Leaf { .. } => false,
            Predicate::Group { children, .. } => children.is_empty(),
        })
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Render the predicate without the WHERE/HAVING keyword.
    ///
    /// Empty trees (and empty groups) render to nothing.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::new();
        for part in &self.parts {
            let rendered = match part {
                Predicate::Leaf {
                    field, operator, ..
                } => format!("{} {} ?", dialect.quote_column(field), operator),
                Predicate::Group { children, .. } => {
                    let inner = children.to_sql(dialect);
                    if inner.is_empty() {
                        continue;
                    }
                    format!("({inner})")
                }
            };
            if !sql.is_empty() {
                sql.push(' ');
                sql.push_str(part.join().as_str());
                sql.push(' ');
            }
            sql.push_str(&rendered);
        }
        sql
    }

    /// Leaf values in placeholder order.
    pub fn params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        self.collect_params(&mut params);
        params
    }

    fn collect_params(&self, out: &mut Vec<Value>) {
        for part in &self.parts {
            match part {
                Predicate::Leaf { value, .. } => out.push(value.clone()),
                Predicate::Group { children, .. } => children.collect_params(out),
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            _ => Err(Error::Query(QueryError::new(
                QueryErrorKind::Syntax,
                format!("Unknown sort direction \"{s}\""),
            ))),
        }
    }
}

/// ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        format!(
            "{} {}",
            dialect.quote_column(&self.column),
            self.direction.as_str()
        )
    }
}
