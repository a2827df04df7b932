//! Field kinds and the per-column transform pipeline.
//!
//! Every column a model declares may carry a [`Field`]. A field sees a value
//! at three points:
//!
//! - [`Field::database_to_value`] when the value is read back out of a model,
//! - [`Field::set`] when the value is assigned into the pending changes,
//! - [`Field::value_to_database`] right before the value is written.
//!
//! All three default to the identity. Fields also declare validation rules.

use crate::model::Model;
use chrono::{DateTime as ChronoDateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use sqlrecord_core::{ConfigError, ConfigErrorKind, Error, Result, Rule, TypeError, Value};
use std::fmt;
use std::sync::Arc;

/// Transform and validation hooks for one model column.
pub trait Field: Send + Sync + fmt::Debug {
    /// Short name of this kind (`"text"`, `"boolean"`, ...).
    fn kind(&self) -> &'static str;

    /// Convert a stored value into its application form.
    fn database_to_value(&self, _model: &Model, _name: &str, value: Value) -> Result<Value> {
        Ok(value)
    }

    /// Transform a value being assigned.
    fn set(&self, _model: &Model, _name: &str, value: Value) -> Result<Value> {
        Ok(value)
    }

    /// Convert a value into its stored form just before persistence.
    fn value_to_database(&self, _model: &Model, _name: &str, value: Value) -> Result<Value> {
        Ok(value)
    }

    /// Validation rules declared for this field.
    fn validation(&self) -> Vec<Rule> {
        Vec::new()
    }

    /// Whether the column is written to the database at all.
    fn in_database(&self) -> bool {
        true
    }
}

/// Options shared by every field kind.
#[derive(Debug, Clone)]
pub struct FieldOptions {
    pub rules: Vec<Rule>,
    pub in_database: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            in_database: true,
        }
    }
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Keep the column out of INSERT/UPDATE statements.
    pub fn in_database(mut self, in_database: bool) -> Self {
        self.in_database = in_database;
        self
    }

    /// Lay caller options over a kind's defaults: caller flags win, rules append.
    fn merged_over(self, defaults: FieldOptions) -> FieldOptions {
        let mut rules = defaults.rules;
        rules.extend(self.rules);
        FieldOptions {
            rules,
            in_database: self.in_database,
        }
    }
}

fn missing_options(names: &[&str]) -> Error {
    Error::Config(ConfigError::new(
        ConfigErrorKind::MissingRequiredOptions,
        format!("Missing required options: {}", names.join(", ")),
    ))
}

macro_rules! plain_field {
    ($(#[$doc:meta])* $name:ident, $kind:literal, [$($default:expr),*]) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            options: FieldOptions,
        }

        impl $name {
            pub fn new() -> Self {
                Self::with_options(FieldOptions::default())
            }

            pub fn with_options(options: FieldOptions) -> Self {
                let defaults = FieldOptions::default().rules([$($default),*]);
                Self {
                    options: options.merged_over(defaults),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Field for $name {
            fn kind(&self) -> &'static str {
                $kind
            }

            fn validation(&self) -> Vec<Rule> {
                self.options.rules.clone()
            }

            fn in_database(&self) -> bool {
                self.options.in_database
            }
        }
    };
}

plain_field!(
    /// Free-form text.
    Text,
    "text",
    []
);
plain_field!(
    /// Short string.
    StringField,
    "string",
    []
);
plain_field!(
    /// Whole number; always validated as an integer.
    Integer,
    "integer",
    [Rule::integer()]
);
plain_field!(
    /// Floating-point number; always validated as numeric.
    Float,
    "float",
    [Rule::numeric()]
);
plain_field!(
    /// Email address; always validated as an email.
    Email,
    "email",
    [Rule::email()]
);

/// True/false stored as an integer 0/1.
#[derive(Debug, Clone, Default)]
pub struct Boolean {
    options: FieldOptions,
}

impl Boolean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FieldOptions) -> Self {
        Self { options }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(v) => *v != 0,
        Value::BigInt(v) => *v != 0,
        Value::Double(v) => *v != 0.0,
        Value::Text(s) => !(s.is_empty() || s == "0"),
        Value::Bytes(b) => !b.is_empty(),
        Value::DateTime(_) => true,
        Value::Json(j) => !j.is_null(),
    }
}

impl Field for Boolean {
    fn kind(&self) -> &'static str {
        "boolean"
    }

    fn database_to_value(&self, _model: &Model, _name: &str, value: Value) -> Result<Value> {
        Ok(Value::Bool(truthy(&value)))
    }

    fn set(&self, _model: &Model, _name: &str, value: Value) -> Result<Value> {
        Ok(Value::Int(i32::from(truthy(&value))))
    }

    fn validation(&self) -> Vec<Rule> {
        self.options.rules.clone()
    }

    fn in_database(&self) -> bool {
        self.options.in_database
    }
}

/// Options for [`Enum`].
#[derive(Debug, Clone, Default)]
pub struct EnumOptions {
    /// Allowed values (required)
    pub choices: Option<Vec<Value>>,
    pub field: FieldOptions,
}

/// One of a fixed set of values.
#[derive(Debug, Clone)]
pub struct Enum {
    choices: Vec<Value>,
    options: FieldOptions,
}

impl Enum {
    pub fn new(options: EnumOptions) -> Result<Self> {
        let Some(choices) = options.choices else {
            return Err(missing_options(&["choices"]));
        };
        Ok(Self {
            choices,
            options: options.field,
        })
    }

    /// Shorthand for an enum with default field options.
    pub fn of<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            options: FieldOptions::default(),
        }
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }
}

impl Field for Enum {
    fn kind(&self) -> &'static str {
        "enum"
    }

    fn validation(&self) -> Vec<Rule> {
        let mut rules = self.options.rules.clone();
        rules.push(Rule::in_list(self.choices.iter().cloned()));
        rules
    }

    fn in_database(&self) -> bool {
        self.options.in_database
    }
}

/// Options for [`DateTime`].
#[derive(Debug, Clone, Default)]
pub struct DateTimeOptions {
    /// Zone naive values are interpreted in (required)
    pub timezone: Option<FixedOffset>,
    /// `strftime` format for the stored form; unix seconds when unset
    pub format: Option<String>,
    pub field: FieldOptions,
}

/// A point in time.
///
/// Reading converts numbers (unix seconds) and strings into a
/// `Value::DateTime` in the configured zone. Assigning and persisting store
/// the formatted string, or the unix timestamp when no format is configured.
#[derive(Debug, Clone)]
pub struct DateTime {
    timezone: FixedOffset,
    format: Option<String>,
    options: FieldOptions,
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

impl DateTime {
    pub fn new(options: DateTimeOptions) -> Result<Self> {
        let Some(timezone) = options.timezone else {
            return Err(missing_options(&["timezone"]));
        };
        Ok(Self {
            timezone,
            format: options.format,
            options: options.field,
        })
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    fn from_timestamp(&self, secs: i64, name: &str) -> Result<Value> {
        self.timezone
            .timestamp_opt(secs, 0)
            .single()
            .map(Value::DateTime)
            .ok_or_else(|| bad_datetime(name, &secs.to_string()))
    }

    fn parse(&self, text: &str, name: &str) -> Result<Value> {
        let text = text.trim();
        if let Some(fmt) = &self.format {
            if let Some(value) = self.parse_with_format(text, fmt) {
                return Ok(value);
            }
        }
        if let Ok(secs) = text.parse::<i64>() {
            return self.from_timestamp(secs, name);
        }
        if let Ok(dt) = ChronoDateTime::parse_from_rfc3339(text) {
            return Ok(Value::DateTime(dt.with_timezone(&self.timezone)));
        }
        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| bad_datetime(name, text))?;
        self.timezone
            .from_local_datetime(&naive)
            .single()
            .map(Value::DateTime)
            .ok_or_else(|| bad_datetime(name, text))
    }

    /// Read text in the configured stored form. Formats may carry an offset,
    /// a date and time, or only a date (midnight).
    fn parse_with_format(&self, text: &str, fmt: &str) -> Option<Value> {
        if let Ok(dt) = ChronoDateTime::parse_from_str(text, fmt) {
            return Some(Value::DateTime(dt.with_timezone(&self.timezone)));
        }
        let naive = NaiveDateTime::parse_from_str(text, fmt).ok().or_else(|| {
            NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
        self.timezone
            .from_local_datetime(&naive)
            .single()
            .map(Value::DateTime)
    }

    /// Normalise any accepted input into `Value::DateTime` (or `Null`).
    #[allow(clippy::cast_possible_truncation)]
    fn to_datetime(&self, name: &str, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::DateTime(dt) => Ok(Value::DateTime(dt)),
            Value::Int(v) => self.from_timestamp(i64::from(v), name),
            Value::BigInt(v) => self.from_timestamp(v, name),
            Value::Double(v) if v.is_finite() => self.from_timestamp(v.round() as i64, name),
            Value::Double(v) => Err(bad_datetime(name, &v.to_string())),
            Value::Text(s) => self.parse(&s, name),
            other => Err(bad_datetime(name, other.type_name())),
        }
    }

    fn to_stored(&self, name: &str, value: Value) -> Result<Value> {
        match self.to_datetime(name, value)? {
            Value::DateTime(dt) => Ok(match &self.format {
                Some(fmt) => Value::Text(dt.format(fmt).to_string()),
                None => Value::BigInt(dt.timestamp()),
            }),
            other => Ok(other),
        }
    }
}

fn bad_datetime(name: &str, actual: &str) -> Error {
    Error::Type(TypeError {
        expected: "date-time",
        actual: actual.to_string(),
        column: Some(name.to_string()),
    })
}

impl Field for DateTime {
    fn kind(&self) -> &'static str {
        "datetime"
    }

    fn database_to_value(&self, _model: &Model, name: &str, value: Value) -> Result<Value> {
        self.to_datetime(name, value)
    }

    fn set(&self, _model: &Model, name: &str, value: Value) -> Result<Value> {
        self.to_stored(name, value)
    }

    fn value_to_database(&self, _model: &Model, name: &str, value: Value) -> Result<Value> {
        self.to_stored(name, value)
    }

    fn validation(&self) -> Vec<Rule> {
        self.options.rules.clone()
    }

    fn in_database(&self) -> bool {
        self.options.in_database
    }
}

/// One-way hash applied to a password as it is assigned.
pub type HashFn = Arc<dyn Fn(&Model, &str, Value) -> Result<Value> + Send + Sync>;

/// Options for [`Password`].
#[derive(Clone, Default)]
pub struct PasswordOptions {
    /// Hash function (required)
    pub hash_with: Option<HashFn>,
    pub field: FieldOptions,
}

impl fmt::Debug for PasswordOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordOptions")
            .field("hash_with", &self.hash_with.as_ref().map(|_| ".."))
            .field("field", &self.field)
            .finish()
    }
}

/// A password, hashed on assignment with a caller-supplied function.
#[derive(Clone)]
pub struct Password {
    hash_with: HashFn,
    options: FieldOptions,
}

impl Password {
    pub fn new(options: PasswordOptions) -> Result<Self> {
        let Some(hash_with) = options.hash_with else {
            return Err(missing_options(&["hash_with"]));
        };
        Ok(Self {
            hash_with,
            options: options.field,
        })
    }

    /// Shorthand for a password field hashed with `hash`.
    pub fn hashed_with<F>(hash: F) -> Self
    where
        F: Fn(&Model, &str, Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            hash_with: Arc::new(hash),
            options: FieldOptions::default(),
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Field for Password {
    fn kind(&self) -> &'static str {
        "password"
    }

    fn set(&self, model: &Model, name: &str, value: Value) -> Result<Value> {
        (self.hash_with)(model, name, value)
    }

    fn validation(&self) -> Vec<Rule> {
        self.options.rules.clone()
    }

    fn in_database(&self) -> bool {
        self.options.in_database
    }
}
