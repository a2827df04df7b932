//! Rule-based validation.
//!
//! A [`Validator`] checks a flat `field -> value` map against a list of
//! `(field, Rule)` declarations and reports every failure as a localized
//! message, grouped by field, inside [`Error::Validation`].
//!
//! Messages come from a [`MessageBundle`]: English is built in, other locales
//! are JSON files named `<locale>.json` mapping rule names to templates.
//! Templates use `{field}` for the field label and `{0}`, `{1}`, ... for rule
//! arguments.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;

use crate::Value;
use crate::error::{ConfigError, ConfigErrorKind, Error, Result, ValidationError};

/// Thread-safe regex cache for compiled patterns.
struct RegexCache {
    cache: std::sync::RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> std::result::Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern.
///
/// Returns `false` (and logs a warning) if the pattern is invalid.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const URL_PATTERN: &str = r"^(https?|ftp)://[^\s/$.?#][^\s]*$";
const ALPHA_PATTERN: &str = r"^[a-zA-Z]+$";
const ALPHA_NUM_PATTERN: &str = r"^[a-zA-Z0-9]+$";
const SLUG_PATTERN: &str = r"^[-a-zA-Z0-9_]+$";

// ============================================================================
// Rules
// ============================================================================

/// A named validation rule with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    name: String,
    args: Vec<Value>,
}

impl Rule {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// A rule registered on the validator with [`Validator::add_rule`].
    pub fn custom(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::new(name, args)
    }

    pub fn required() -> Self {
        Self::new("required", Vec::new())
    }

    pub fn length_min(min: usize) -> Self {
        Self::new("lengthMin", vec![Value::BigInt(min as i64)])
    }

    pub fn length_max(max: usize) -> Self {
        Self::new("lengthMax", vec![Value::BigInt(max as i64)])
    }

    pub fn length_between(min: usize, max: usize) -> Self {
        Self::new(
            "lengthBetween",
            vec![Value::BigInt(min as i64), Value::BigInt(max as i64)],
        )
    }

    pub fn min(min: impl Into<Value>) -> Self {
        Self::new("min", vec![min.into()])
    }

    pub fn max(max: impl Into<Value>) -> Self {
        Self::new("max", vec![max.into()])
    }

    pub fn in_list<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new("in", choices.into_iter().map(Into::into).collect())
    }

    pub fn not_in<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new("notIn", choices.into_iter().map(Into::into).collect())
    }

    pub fn integer() -> Self {
        Self::new("integer", Vec::new())
    }

    pub fn numeric() -> Self {
        Self::new("numeric", Vec::new())
    }

    pub fn boolean() -> Self {
        Self::new("boolean", Vec::new())
    }

    pub fn email() -> Self {
        Self::new("email", Vec::new())
    }

    pub fn url() -> Self {
        Self::new("url", Vec::new())
    }

    pub fn alpha() -> Self {
        Self::new("alpha", Vec::new())
    }

    pub fn alpha_num() -> Self {
        Self::new("alphaNum", Vec::new())
    }

    pub fn slug() -> Self {
        Self::new("slug", Vec::new())
    }

    pub fn date() -> Self {
        Self::new("date", Vec::new())
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self::new("contains", vec![Value::Text(needle.into())])
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new("regex", vec![Value::Text(pattern.into())])
    }

    /// Value must equal the value of `other_field`.
    pub fn equals(other_field: impl Into<String>) -> Self {
        Self::new("equals", vec![Value::Text(other_field.into())])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

/// One-shot rules keyed by field, as passed to a model's `validate`.
pub type RuleSet = IndexMap<String, Vec<Rule>>;

// ============================================================================
// Messages
// ============================================================================

const ENGLISH: &[(&str, &str)] = &[
    ("required", "{field} is required"),
    ("equals", "{field} must be the same as '{0}'"),
    ("integer", "{field} must be an integer"),
    ("numeric", "{field} must be numeric"),
    ("boolean", "{field} must be a boolean"),
    ("lengthMin", "{field} must be at least {0} characters long"),
    ("lengthMax", "{field} must not exceed {0} characters"),
    ("lengthBetween", "{field} must be between {0} and {1} characters"),
    ("min", "{field} must be at least {0}"),
    ("max", "{field} must be no more than {0}"),
    ("in", "{field} contains invalid value"),
    ("notIn", "{field} contains invalid value"),
    ("email", "{field} is not a valid email address"),
    ("url", "{field} is not a valid URL"),
    ("alpha", "{field} must contain only letters a-z"),
    ("alphaNum", "{field} must contain only letters a-z and/or numbers 0-9"),
    (
        "slug",
        "{field} must contain only letters a-z, numbers 0-9, dashes and underscores",
    ),
    ("regex", "{field} contains invalid characters"),
    ("contains", "{field} must contain {0}"),
    ("date", "{field} is not a valid date"),
];

/// Localized message templates keyed by rule name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBundle {
    locale: String,
    messages: HashMap<String, String>,
}

impl MessageBundle {
    /// The built-in English messages.
    pub fn english() -> Self {
        Self {
            locale: "en".to_string(),
            messages: ENGLISH
                .iter()
                .map(|(rule, msg)| ((*rule).to_string(), (*msg).to_string()))
                .collect(),
        }
    }

    /// Parse a bundle from a JSON object of `rule -> template`.
    pub fn from_json(locale: impl Into<String>, json: &str) -> Result<Self> {
        let messages: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            locale: locale.into(),
            messages,
        })
    }

    /// Load `<dir>/<locale>.json`.
    pub fn load(dir: impl AsRef<Path>, locale: &str) -> Result<Self> {
        let path = dir.as_ref().join(format!("{locale}.json"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(ConfigError {
                kind: ConfigErrorKind::MessageBundle,
                message: format!("Cannot read message bundle {}", path.display()),
                source: Some(Box::new(e)),
            })
        })?;
        tracing::debug!(locale, path = %path.display(), "Loaded validation messages");
        Self::from_json(locale, &raw)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn message(&self, rule: &str) -> Option<&str> {
        self.messages.get(rule).map(String::as_str)
    }
}

impl Default for MessageBundle {
    fn default() -> Self {
        Self::english()
    }
}

/// Human label for a field: `first_name` becomes `First name`.
pub fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render(template: &str, field: &str, args: &[Value]) -> String {
    let mut out = template.replace("{field}", &field_label(field));
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), &arg.to_string());
    }
    out
}

// ============================================================================
// Validator
// ============================================================================

type RuleFn = dyn Fn(&Value, &[Value]) -> bool + Send + Sync;

#[derive(Clone)]
struct CustomRule {
    check: Arc<RuleFn>,
    message: String,
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Evaluates declared rules against a data map.
#[derive(Debug)]
pub struct Validator<'a> {
    data: &'a IndexMap<String, Value>,
    rules: Vec<(String, Rule)>,
    custom: HashMap<String, CustomRule>,
    bundle: Option<&'a MessageBundle>,
}

impl<'a> Validator<'a> {
    pub fn new(data: &'a IndexMap<String, Value>) -> Self {
        Self {
            data,
            rules: Vec::new(),
            custom: HashMap::new(),
            bundle: None,
        }
    }

    /// Use a localized message bundle; English fills any gaps.
    pub fn with_messages(mut self, bundle: &'a MessageBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn rule(&mut self, field: impl Into<String>, rule: Rule) -> &mut Self {
        self.rules.push((field.into(), rule));
        self
    }

    pub fn rules(&mut self, field: &str, rules: impl IntoIterator<Item = Rule>) -> &mut Self {
        for rule in rules {
            self.rules.push((field.to_string(), rule));
        }
        self
    }

    /// Register a rule under `name` with its message template.
    pub fn add_rule<F>(&mut self, name: impl Into<String>, check: F, message: impl Into<String>)
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(
            name.into(),
            CustomRule {
                check: Arc::new(check),
                message: message.into(),
            },
        );
    }

    /// Run every rule; fails with every message on any rule failure.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationError::new();
        for (field, rule) in &self.rules {
            let value = self.data.get(field).unwrap_or(&Value::Null);
            if self.passes(rule, value)? {
                continue;
            }
            let message = render(&self.template(rule.name()), field, rule.args());
            tracing::trace!(field = %field, rule = %rule, "Validation rule failed");
            errors.add(field.clone(), rule.name(), message);
        }
        errors.into_result().map_err(Error::Validation)
    }

    fn template(&self, rule: &str) -> String {
        if let Some(msg) = self.bundle.and_then(|b| b.message(rule)) {
            return msg.to_string();
        }
        if let Some(custom) = self.custom.get(rule) {
            return custom.message.clone();
        }
        ENGLISH
            .iter()
            .find(|(name, _)| *name == rule)
            .map_or_else(|| "{field} is invalid".to_string(), |(_, m)| (*m).to_string())
    }

    fn passes(&self, rule: &Rule, value: &Value) -> Result<bool> {
        let args = rule.args();
        if rule.name() == "required" {
            return Ok(!value.is_blank());
        }
        if let Some(custom) = self.custom.get(rule.name()) {
            return Ok((custom.check)(value, args));
        }
        // Optional fields only get checked when they carry a value.
        if matches!(value, Value::Null) || value.as_str() == Some("") {
            return Ok(true);
        }

        let ok = match rule.name() {
            "equals" => {
                let other = text_arg(rule, 0)?;
                self.data.get(other).unwrap_or(&Value::Null) == value
            }
            "integer" => match value {
                Value::Int(_) | Value::BigInt(_) => true,
                Value::Text(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            "numeric" => value.is_numeric(),
            "boolean" => match value {
                Value::Bool(_) => true,
                Value::Int(v) => *v == 0 || *v == 1,
                Value::BigInt(v) => *v == 0 || *v == 1,
                Value::Text(s) => matches!(s.as_str(), "0" | "1"),
                _ => false,
            },
            "lengthMin" => text_len(value) >= usize_arg(rule, 0)?,
            "lengthMax" => text_len(value) <= usize_arg(rule, 0)?,
            "lengthBetween" => {
                let len = text_len(value);
                len >= usize_arg(rule, 0)? && len <= usize_arg(rule, 1)?
            }
            "min" => {
                let min = number_arg(rule, 0)?;
                value.as_f64().is_some_and(|v| v >= min)
            }
            "max" => {
                let max = number_arg(rule, 0)?;
                value.as_f64().is_some_and(|v| v <= max)
            }
            "in" => args.iter().any(|choice| loosely_equal(choice, value)),
            "notIn" => !args.iter().any(|choice| loosely_equal(choice, value)),
            "email" => matches_text(value, EMAIL_PATTERN),
            "url" => matches_text(value, URL_PATTERN),
            "alpha" => matches_text(value, ALPHA_PATTERN),
            "alphaNum" => matches_text(value, ALPHA_NUM_PATTERN),
            "slug" => matches_text(value, SLUG_PATTERN),
            "regex" => matches_text(value, text_arg(rule, 0)?),
            "contains" => value.to_string().contains(text_arg(rule, 0)?),
            "date" => is_date(value),
            other => {
                return Err(Error::Config(ConfigError::new(
                    ConfigErrorKind::UnknownRule,
                    format!("Unknown validation rule \"{other}\""),
                )));
            }
        };
        Ok(ok)
    }
}

fn text_len(value: &Value) -> usize {
    value.to_string().chars().count()
}

fn matches_text(value: &Value, pattern: &str) -> bool {
    match value {
        Value::Text(s) => matches_pattern(s, pattern),
        _ => false,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || a.to_string() == b.to_string()
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::DateTime(_) => true,
        Value::Text(s) => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        _ => false,
    }
}

fn missing_arg(rule: &Rule, index: usize) -> Error {
    Error::Config(ConfigError::new(
        ConfigErrorKind::Other,
        format!("Rule {} expects argument {}", rule.name(), index),
    ))
}

fn text_arg(rule: &Rule, index: usize) -> Result<&str> {
    rule.args()
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| missing_arg(rule, index))
}

fn number_arg(rule: &Rule, index: usize) -> Result<f64> {
    rule.args()
        .get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| missing_arg(rule, index))
}

fn usize_arg(rule: &Rule, index: usize) -> Result<usize> {
    rule.args()
        .get(index)
        .and_then(Value::as_i64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| missing_arg(rule, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn messages(result: Result<()>) -> IndexMap<String, Vec<String>> {
        match result {
            Err(Error::Validation(v)) => v.messages(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_matches_pattern_email() {
        assert!(matches_pattern("test@example.com", EMAIL_PATTERN));
        assert!(!matches_pattern("invalid", EMAIL_PATTERN));
        assert!(!matches_pattern("a b@example.com", EMAIL_PATTERN));
    }

    #[test]
    fn test_invalid_pattern_is_non_match() {
        assert!(!matches_pattern("anything", "[invalid"));
    }

    #[test]
    fn required_and_length() {
        let values = data(&[("name", Value::from("A"))]);
        let mut v = Validator::new(&values);
        v.rules("name", [Rule::required(), Rule::length_min(2)]);
        v.rule("about", Rule::required());

        let msgs = messages(v.validate());
        assert_eq!(msgs["name"], vec!["Name must be at least 2 characters long"]);
        assert_eq!(msgs["about"], vec!["About is required"]);
    }

    #[test]
    fn optional_fields_skip_checks() {
        let values = data(&[("email", Value::Null)]);
        let mut v = Validator::new(&values);
        v.rule("email", Rule::email()).rule("age", Rule::integer());
        assert!(v.validate().is_ok());
    }

    #[test]
    fn contains_and_in() {
        let values = data(&[("name", Value::from("Alex")), ("status", Value::from("live"))]);
        let mut v = Validator::new(&values);
        v.rule("name", Rule::contains("le"))
            .rule("status", Rule::in_list(["draft", "live"]));
        assert!(v.validate().is_ok());

        let mut v = Validator::new(&values);
        v.rule("name", Rule::contains("uo"))
            .rule("status", Rule::in_list(["draft"]));
        let msgs = messages(v.validate());
        assert_eq!(msgs["name"], vec!["Name must contain uo"]);
        assert_eq!(msgs["status"], vec!["Status contains invalid value"]);
    }

    #[test]
    fn numeric_rules() {
        let values = data(&[
            ("age", Value::from("27")),
            ("total", Value::Double(9.5)),
            ("count", Value::from("2.5")),
        ]);
        let mut v = Validator::new(&values);
        v.rule("age", Rule::integer())
            .rule("age", Rule::min(18))
            .rule("total", Rule::numeric())
            .rule("total", Rule::max(10))
            .rule("count", Rule::integer());
        let msgs = messages(v.validate());
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs["count"], vec!["Count must be an integer"]);
    }

    #[test]
    fn localized_messages_fall_back_to_english() {
        let fr = MessageBundle::from_json(
            "fr",
            r#"{"required": "{field} is required [in French]"}"#,
        )
        .unwrap();
        let values = data(&[("name", Value::Null), ("email", Value::from("nope"))]);
        let mut v = Validator::new(&values);
        v.rule("name", Rule::required()).rule("email", Rule::email());
        let v = v.with_messages(&fr);

        let msgs = messages(v.validate());
        assert_eq!(msgs["name"], vec!["Name is required [in French]"]);
        assert_eq!(msgs["email"], vec!["Email is not a valid email address"]);
    }

    #[test]
    fn custom_rules() {
        let values = data(&[("code", Value::from("abc"))]);
        let mut v = Validator::new(&values);
        v.add_rule(
            "upper",
            |value, _| value.as_str().is_some_and(|s| s.chars().all(char::is_uppercase)),
            "{field} must be upper case",
        );
        v.rule("code", Rule::custom("upper", Vec::new()));
        let msgs = messages(v.validate());
        assert_eq!(msgs["code"], vec!["Code must be upper case"]);
    }

    #[test]
    fn unknown_rule_is_a_config_error() {
        let values = data(&[("name", Value::from("Alex"))]);
        let mut v = Validator::new(&values);
        v.rule("name", Rule::new("sparkles", Vec::new()));
        match v.validate() {
            Err(Error::Config(e)) => assert_eq!(e.kind, ConfigErrorKind::UnknownRule),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn equals_compares_fields() {
        let values = data(&[
            ("password", Value::from("secret")),
            ("confirm", Value::from("secrit")),
        ]);
        let mut v = Validator::new(&values);
        v.rule("confirm", Rule::equals("password"));
        let msgs = messages(v.validate());
        assert_eq!(msgs["confirm"], vec!["Confirm must be the same as 'password'"]);
    }

    #[test]
    fn labels() {
        assert_eq!(field_label("name"), "Name");
        assert_eq!(field_label("first_name"), "First name");
        assert_eq!(field_label(""), "");
    }

    #[test]
    fn dates() {
        assert!(is_date(&Value::from("2014-07-02 12:31:47")));
        assert!(is_date(&Value::from("2014-07-02")));
        assert!(!is_date(&Value::from("yesterday-ish")));
    }
}
