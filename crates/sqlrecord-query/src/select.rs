//! SELECT query builder.

use crate::clause::{Conjunction, OrderBy, OrderDirection, Where};
use crate::dialect::{Column, Dialect};
use crate::join::Join;
use crate::paginate::Paginate;
use sqlrecord_core::Value;

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub column: Column,
    pub alias: Option<String>,
}

impl SelectColumn {
    fn to_sql(&self, dialect: Dialect) -> String {
        let col = dialect.quote_column(&self.column);
        match &self.alias {
            Some(alias) => format!("{} AS {}", col, dialect.quote_field(alias)),
            None => col,
        }
    }
}

/// A table in the FROM list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromTable {
    pub table: String,
    pub alias: Option<String>,
}

/// A SELECT query builder.
///
/// Every clause accumulates through consuming builder methods, can be read
/// back through an accessor, and can be cleared on its own with a `reset_*`
/// method. Rendering always follows the fixed clause order
/// SELECT, FROM, JOIN, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, and clauses
/// with nothing set are left out entirely.
///
/// ```
/// use sqlrecord_query::{OrderDirection, Select};
///
/// let (sql, params) = Select::new()
///     .from("users")
///     .filter("name", "=", "Alex")
///     .order_by("created", OrderDirection::Desc)
///     .limit(10)
///     .build();
///
/// assert_eq!(
///     sql,
///     r#"SELECT * FROM "users" WHERE "name" = ? ORDER BY "created" DESC LIMIT 10"#
/// );
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    dialect: Dialect,
    /// Columns to select (empty = all)
    columns: Vec<SelectColumn>,
    /// FROM tables, one entry per table name
    tables: Vec<FromTable>,
    /// JOIN clauses
    joins: Vec<Join>,
    /// WHERE predicate tree
    where_clause: Where,
    /// GROUP BY columns
    group_by: Vec<Column>,
    /// HAVING predicate tree
    having: Where,
    /// ORDER BY entries, one per column
    order_by: Vec<OrderBy>,
    /// LIMIT / OFFSET
    paginate: Paginate,
}

impl Select {
    /// Create an empty SELECT using the ANSI dialect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty SELECT for a specific dialect.
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    // ==================== SELECT ====================

    /// Add bare columns to the SELECT list.
    pub fn select<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns.extend(cols.into_iter().map(|c| SelectColumn {
            column: c.into(),
            alias: None,
        }));
        self
    }

    /// Add `column AS alias` to the SELECT list.
    pub fn select_as(mut self, column: impl Into<Column>, alias: impl Into<String>) -> Self {
        self.columns.push(SelectColumn {
            column: column.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Add a raw expression (e.g. `COUNT(id) as num`) to the SELECT list.
    pub fn select_raw(self, expr: impl Into<String>) -> Self {
        self.select([crate::dialect::raw(expr)])
    }

    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    pub fn reset_select(&mut self) {
        self.columns.clear();
    }

    // ==================== FROM ====================

    /// Add a table to the FROM list.
    pub fn from(self, table: impl Into<String>) -> Self {
        self.add_table(table.into(), None)
    }

    /// Add an aliased table to the FROM list.
    pub fn from_as(self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.add_table(table.into(), Some(alias.into()))
    }

    fn add_table(mut self, table: String, alias: Option<String>) -> Self {
        // A table appears at most once; adding it again only updates its alias.
        match self.tables.iter_mut().find(|t| t.table == table) {
            Some(existing) => existing.alias = alias,
            None => self.tables.push(FromTable { table, alias }),
        }
        self
    }

    pub fn tables(&self) -> &[FromTable] {
        &self.tables
    }

    pub fn reset_from(&mut self) {
        self.tables.clear();
    }

    // ==================== JOIN ====================

    /// Add a JOIN clause.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn reset_joins(&mut self) {
        self.joins.clear();
    }

    // ==================== WHERE ====================

    /// Add a WHERE condition joined with AND.
    pub fn filter(mut self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.where_clause = self.where_clause.and(field, operator, value);
        self
    }

    /// Add a WHERE condition joined with OR.
    pub fn or_filter(
        mut self,
        field: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.where_clause = self.where_clause.or(field, operator, value);
        self
    }

    /// Add a nested WHERE group joined with AND.
    pub fn filter_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.where_clause = self.where_clause.push_group(Conjunction::And, build);
        self
    }

    /// Add a nested WHERE group joined with OR.
    pub fn or_filter_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.where_clause = self.where_clause.push_group(Conjunction::Or, build);
        self
    }

    pub fn where_clause(&self) -> &Where {
        &self.where_clause
    }

    pub fn reset_where(&mut self) {
        self.where_clause.clear();
    }

    // ==================== GROUP BY ====================

    /// Add GROUP BY columns.
    pub fn group_by<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.group_by.extend(cols.into_iter().map(Into::into));
        self
    }

    pub fn group_by_columns(&self) -> &[Column] {
        &self.group_by
    }

    pub fn reset_group_by(&mut self) {
        self.group_by.clear();
    }

    // ==================== HAVING ====================

    /// Add a HAVING condition joined with AND.
    pub fn having(mut self, field: impl Into<Column>, operator: &str, value: impl Into<Value>) -> Self {
        self.having = self.having.and(field, operator, value);
        self
    }

    /// Add a HAVING condition joined with OR.
    pub fn or_having(
        mut self,
        field: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.having = self.having.or(field, operator, value);
        self
    }

    /// Add a nested HAVING group joined with AND.
    pub fn having_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.having = self.having.push_group(Conjunction::And, build);
        self
    }

    /// Add a nested HAVING group joined with OR.
    pub fn or_having_group(mut self, build: impl FnOnce(Where) -> Where) -> Self {
        self.having = self.having.push_group(Conjunction::Or, build);
        self
    }

    pub fn having_clause(&self) -> &Where {
        &self.having
    }

    pub fn reset_having(&mut self) {
        self.having.clear();
    }

    // ==================== ORDER BY ====================

    /// Add an ORDER BY column.
    ///
    /// Ordering by a column that is already present replaces its direction
    /// and keeps its position.
    pub fn order_by(mut self, column: impl Into<Column>, direction: OrderDirection) -> Self {
        let column = column.into();
        match self.order_by.iter_mut().find(|o| o.column == column) {
            Some(existing) => existing.direction = direction,
            None => self.order_by.push(OrderBy { column, direction }),
        }
        self
    }

    pub fn order_by_columns(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn reset_order_by(&mut self) {
        self.order_by.clear();
    }

    // ==================== LIMIT / OFFSET ====================

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.paginate.set_limit(n);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: u64) -> Self {
        self.paginate.set_offset(n);
        self
    }

    pub fn paginate(&self) -> &Paginate {
        &self.paginate
    }

    pub fn reset_limit(&mut self) {
        self.paginate.clear_limit();
    }

    pub fn reset_offset(&mut self) {
        self.paginate.clear_offset();
    }

    /// Clear every clause. The dialect is kept.
    pub fn reset(&mut self) {
        *self = Self::with_dialect(self.dialect);
    }

    // ==================== Rendering ====================

    fn select_sql(&self) -> String {
        if self.columns.is_empty() {
            return "SELECT *".to_string();
        }
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_sql(self.dialect)).collect();
        format!("SELECT {}", cols.join(", "))
    }

    fn from_sql(&self) -> String {
        if self.tables.is_empty() {
            return String::new();
        }
        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|t| match &t.alias {
                Some(alias) => format!(
                    "{} {}",
                    self.dialect.quote_table(&t.table),
                    self.dialect.quote_table(alias)
                ),
                None => self.dialect.quote_table(&t.table),
            })
            .collect();
        format!("FROM {}", tables.join(", "))
    }

    fn join_sql(&self) -> String {
        self.joins
            .iter()
            .map(|j| j.to_sql(self.dialect))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn where_sql(&self) -> String {
        keyword_clause("WHERE", self.where_clause.to_sql(self.dialect))
    }

    fn group_by_sql(&self) -> String {
        if self.group_by.is_empty() {
            return String::new();
        }
        let cols: Vec<String> = self
            .group_by
            .iter()
            .map(|c| self.dialect.quote_column(c))
            .collect();
        format!("GROUP BY {}", cols.join(", "))
    }

    fn having_sql(&self) -> String {
        keyword_clause("HAVING", self.having.to_sql(self.dialect))
    }

    fn order_by_sql(&self) -> String {
        if self.order_by.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .order_by
            .iter()
            .map(|o| o.to_sql(self.dialect))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Render the full statement.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn sql(&self) -> String {
        let parts = [
            self.select_sql(),
            self.from_sql(),
            self.join_sql(),
            self.where_sql(),
            self.group_by_sql(),
            self.having_sql(),
            self.order_by_sql(),
            self.paginate.to_sql(),
        ];
        join_non_empty(&parts)
    }

    /// Bound parameters: WHERE values followed by HAVING values.
    pub fn params(&self) -> Vec<Value> {
        let mut params = self.where_clause.params();
        params.extend(self.having.params());
        params
    }

    /// Build the SQL string and parameters.
    pub fn build(&self) -> (String, Vec<Value>) {
        (self.sql(), self.params())
    }

    /// Derive a `SELECT COUNT(*)` over the same rows.
    ///
    /// Keeps FROM, JOIN, WHERE, GROUP BY and HAVING; drops the column list,
    /// ORDER BY and pagination.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn count_query(&self) -> (String, Vec<Value>) {
        let head = format!("SELECT COUNT(*) AS {}", self.dialect.quote_field("count"));
        let parts = [
            head,
            self.from_sql(),
            self.join_sql(),
            self.where_sql(),
            self.group_by_sql(),
            self.having_sql(),
        ];
        (join_non_empty(&parts), self.params())
    }
}

fn keyword_clause(keyword: &str, body: String) -> String {
    if body.is_empty() {
        body
    } else {
        format!("{keyword} {body}")
    }
}

fn join_non_empty(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::raw;

    #[test]
    fn test_simple_select() {
        let (sql, params) = Select::new().from("users").build();
        assert_eq!(sql, "SELECT * FROM \"users\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_columns_accumulate() {
        let q = Select::new()
            .select(["name"])
            .select(["age", "users.email"])
            .from("users");
        assert_eq!(
            q.sql(),
            "SELECT \"name\", \"age\", \"users\".\"email\" FROM \"users\""
        );
        assert_eq!(q.columns().len(), 3);
    }

    #[test]
    fn test_select_alias_and_raw() {
        let q = Select::new()
            .select_as("name", "n")
            .select([raw("COUNT(id) as num")])
            .from("users");
        assert_eq!(
            q.sql(),
            "SELECT \"name\" AS \"n\", COUNT(id) as num FROM \"users\""
        );
    }

    #[test]
    fn test_from_with_aliases() {
        let q = Select::new().from_as("users", "u").from_as("roles", "r");
        assert_eq!(q.sql(), "SELECT * FROM \"users\" \"u\", \"roles\" \"r\"");

        let q = q.from_as("users", "usr");
        assert_eq!(q.tables().len(), 2);
        assert_eq!(q.tables()[0].alias.as_deref(), Some("usr"));
    }

    #[test]
    fn test_where_example() {
        let (sql, params) = Select::new()
            .from("users")
            .filter("name", "=", "Alex")
            .or_filter("name", "=", "Lucie")
            .filter_group(|w| w.and("city", "=", "London").and("country", "=", "GB"))
            .build();

        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"name\" = ? OR \"name\" = ? AND (\"city\" = ? AND \"country\" = ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::from("Alex"),
                Value::from("Lucie"),
                Value::from("London"),
                Value::from("GB"),
            ]
        );
    }

    #[test]
    fn test_full_clause_order() {
        let q = Select::new()
            .select(["users.name"])
            .select([raw("COUNT(p.id) AS posts")])
            .from("users")
            .join(Join::left("users", "posts", "users.id = p.user_id").alias("p"))
            .filter("users.active", "=", true)
            .group_by(["users.name"])
            .having(raw("COUNT(p.id)"), ">", 5)
            .order_by("users.name", OrderDirection::Asc)
            .limit(10)
            .offset(20);

        assert_eq!(
            q.sql(),
            "SELECT \"users\".\"name\", COUNT(p.id) AS posts FROM \"users\" \
             LEFT JOIN \"posts\" \"p\" ON users.id = p.user_id \
             WHERE \"users\".\"active\" = ? GROUP BY \"users\".\"name\" \
             HAVING COUNT(p.id) > ? ORDER BY \"users\".\"name\" ASC LIMIT 20, 10"
        );
        assert_eq!(q.params(), vec![Value::Bool(true), Value::Int(5)]);
    }

    #[test]
    fn test_params_follow_placeholder_order() {
        let q = Select::new()
            .from("orders")
            .having("total", ">", 100)
            .filter("status", "=", "paid")
            .or_having_group(|h| h.and("total", "<", 5));

        let (sql, params) = q.build();
        assert_eq!(sql.matches('?').count(), params.len());
        assert_eq!(
            params,
            vec![Value::from("paid"), Value::Int(100), Value::Int(5)]
        );
    }

    #[test]
    fn test_multiple_joins() {
        let q = Select::new()
            .from("users")
            .join(Join::inner("users", "posts", "users.id = posts.user_id"))
            .join(Join::left("users", "comments", "users.id = comments.user_id"));
        assert_eq!(
            q.sql(),
            "SELECT * FROM \"users\" JOIN \"posts\" ON users.id = posts.user_id \
             LEFT JOIN \"comments\" ON users.id = comments.user_id"
        );
    }

    #[test]
    fn test_order_by_replaces_direction() {
        let q = Select::new()
            .from("users")
            .order_by("name", OrderDirection::Desc)
            .order_by("age", OrderDirection::Asc)
            .order_by("name", OrderDirection::Asc);
        assert_eq!(
            q.sql(),
            "SELECT * FROM \"users\" ORDER BY \"name\" ASC, \"age\" ASC"
        );
    }

    #[test]
    fn test_empty_select_has_no_stray_keywords() {
        let mut q = Select::new()
            .from("users")
            .filter_group(|w| w)
            .offset(3);
        assert_eq!(q.sql(), "SELECT * FROM \"users\"");

        q.reset();
        assert_eq!(q.sql(), "SELECT *");
    }

    #[test]
    fn test_individual_resets() {
        let mut q = Select::new()
            .select(["name"])
            .from("users")
            .filter("id", "=", 1)
            .group_by(["name"])
            .having("id", ">", 0)
            .order_by("name", OrderDirection::Desc)
            .limit(5)
            .offset(10);

        q.reset_where();
        q.reset_having();
        assert!(q.params().is_empty());

        q.reset_select();
        q.reset_group_by();
        q.reset_order_by();
        q.reset_offset();
        assert_eq!(q.sql(), "SELECT * FROM \"users\" LIMIT 5");

        q.reset_limit();
        q.reset_from();
        assert_eq!(q.sql(), "SELECT *");
    }

    #[test]
    fn test_mysql_dialect() {
        let q = Select::with_dialect(Dialect::Mysql)
            .select(["u.name"])
            .from_as("users", "u")
            .filter("u.id", "=", 1);
        assert_eq!(
            q.sql(),
            "SELECT `u`.`name` FROM `users` `u` WHERE `u`.`id` = ?"
        );

        let mut q = q;
        q.reset();
        assert_eq!(q.dialect(), Dialect::Mysql);
    }

    #[test]
    fn test_count_query_drops_order_and_limit() {
        let q = Select::new()
            .select(["name"])
            .from("users")
            .filter("active", "=", true)
            .order_by("name", OrderDirection::Asc)
            .limit(10);

        let (sql, params) = q.count_query();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS \"count\" FROM \"users\" WHERE \"active\" = ?"
        );
        assert_eq!(params, vec![Value::Bool(true)]);
    }
}
