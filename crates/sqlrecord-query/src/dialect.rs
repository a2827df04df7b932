//! SQL dialects and identifier quoting.

/// SQL dialect, selecting the identifier quote mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// ANSI SQL (double quotes)
    #[default]
    Ansi,
    /// MySQL (backticks)
    Mysql,
}

/// Identifier segments that are never quoted.
const UNQUOTABLE: &[&str] = &["*"];

impl Dialect {
    /// Pick a dialect from an executor's driver name.
    pub fn for_driver(driver: &str) -> Self {
        if driver.eq_ignore_ascii_case("mysql") {
            Dialect::Mysql
        } else {
            Dialect::Ansi
        }
    }

    pub const fn quote_char(self) -> char {
        match self {
            Dialect::Ansi => '"',
            Dialect::Mysql => '`',
        }
    }

    /// Quote a table name.
    pub fn quote_table(self, name: &str) -> String {
        self.quote_identifier(name)
    }

    /// Quote a field name, optionally qualified as `table.field`.
    pub fn quote_field(self, name: &str) -> String {
        self.quote_identifier(name)
    }

    /// Quote a column reference; raw expressions pass through untouched.
    pub fn quote_column(self, column: &Column) -> String {
        match column {
            Column::Name(name) => self.quote_field(name),
            Column::Raw(sql) => sql.clone(),
        }
    }

    /// Quote each dot-separated segment on its own.
    ///
    /// Segments that already start or end with the quote mark are not quoted
    /// again on that side, so quoting is idempotent.
    fn quote_identifier(self, name: &str) -> String {
        let q = self.quote_char();
        name.split('.')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                if UNQUOTABLE.contains(&part) {
                    return part.to_string();
                }
                let mut quoted = String::with_capacity(part.len() + 2);
                if !part.starts_with(q) {
                    quoted.push(q);
                }
                quoted.push_str(part);
                if !part.ends_with(q) || part.len() == 1 {
                    quoted.push(q);
                }
                quoted
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A column reference: a (possibly qualified) name, or a raw SQL expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Name(String),
    Raw(String),
}

impl Column {
    pub fn is_raw(&self) -> bool {
        matches!(self, Column::Raw(_))
    }

    /// The unquoted text of this column.
    pub fn as_str(&self) -> &str {
        match self {
            Column::Name(s) | Column::Raw(s) => s,
        }
    }
}

impl From<&str> for Column {
    fn from(s: &str) -> Self {
        Column::Name(s.to_string())
    }
}

impl From<String> for Column {
    fn from(s: String) -> Self {
        Column::Name(s)
    }
}

impl From<&String> for Column {
    fn from(s: &String) -> Self {
        Column::Name(s.clone())
    }
}

/// Mark a SQL fragment as an expression that must not be quoted.
///
/// ```
/// use sqlrecord_query::{Dialect, raw};
///
/// assert_eq!(Dialect::Ansi.quote_column(&raw("COUNT(*)")), "COUNT(*)");
/// ```
pub fn raw(sql: impl Into<String>) -> Column {
    Column::Raw(sql.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_and_qualified_names() {
        let d = Dialect::Ansi;
        assert_eq!(d.quote_table("users"), "\"users\"");
        assert_eq!(d.quote_field("users.name"), "\"users\".\"name\"");
        assert_eq!(d.quote_field("  users.name "), "\"users\".\"name\"");
    }

    #[test]
    fn segments_are_trimmed_one_by_one() {
        assert_eq!(Dialect::Ansi.quote_field("users. name"), "\"users\".\"name\"");
        assert_eq!(Dialect::Mysql.quote_table(" app . users "), "`app`.`users`");
        assert_eq!(Dialect::Ansi.quote_field("users . *"), "\"users\".*");
    }

    #[test]
    fn wildcard_is_never_quoted() {
        assert_eq!(Dialect::Ansi.quote_field("*"), "*");
        assert_eq!(Dialect::Ansi.quote_field("users.*"), "\"users\".*");
    }

    #[test]
    fn quoting_is_idempotent() {
        for d in [Dialect::Ansi, Dialect::Mysql] {
            for name in ["users", "users.name", "u.*", "\"half", "half`"] {
                let once = d.quote_field(name);
                assert_eq!(d.quote_field(&once), once, "{d:?} {name}");
            }
        }
    }

    #[test]
    fn partially_quoted_segments_are_completed() {
        assert_eq!(Dialect::Ansi.quote_field("\"users.name"), "\"users\".\"name\"");
        assert_eq!(Dialect::Mysql.quote_field("users`.name"), "`users`.`name`");
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(Dialect::Ansi.quote_field("users..name"), "\"users\".\"name\"");
        assert_eq!(Dialect::Ansi.quote_field(""), "");
    }

    #[test]
    fn mysql_uses_backticks() {
        assert_eq!(Dialect::Mysql.quote_field("users.name"), "`users`.`name`");
        assert_eq!(Dialect::for_driver("mysql"), Dialect::Mysql);
        assert_eq!(Dialect::for_driver("sqlite"), Dialect::Ansi);
    }

    #[test]
    fn raw_expressions_pass_through() {
        let col = raw("COUNT(id) as num");
        assert!(col.is_raw());
        assert_eq!(Dialect::Mysql.quote_column(&col), "COUNT(id) as num");
        assert_eq!(Dialect::Ansi.quote_column(&"name".into()), "\"name\"");
    }
}
