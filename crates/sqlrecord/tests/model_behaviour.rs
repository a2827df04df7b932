use chrono::FixedOffset;
use indexmap::IndexMap;
use sha1::{Digest, Sha1};
use sqlrecord::prelude::*;
use sqlrecord::{ConfigErrorKind, RelationshipType};

struct BlogPost;

impl Record for BlogPost {
    const NAME: &'static str = "BlogPost";
}

struct UserValidated;

impl Record for UserValidated {
    const NAME: &'static str = "UserValidated";

    fn init(meta: Meta) -> Result<Meta> {
        meta.with_table("users")
            .with_field(
                "name",
                StringField::with_options(
                    FieldOptions::new()
                        .rule(Rule::required())
                        .rule(Rule::length_min(2)),
                ),
            )
            .with_field("about", Text::new())
            .with_relationship("posts", "hasMany", "BlogPost", IndexMap::new())?
            .with_relationship("orders", "hasMany", "Order", IndexMap::new())
    }
}

struct Account;

impl Record for Account {
    const NAME: &'static str = "Account";

    fn init(meta: Meta) -> Result<Meta> {
        Ok(meta
            .with_field(
                "password",
                Password::hashed_with(|_, _, value| {
                    let plain = value.as_str().unwrap_or_default().to_string();
                    Ok(Value::Text(sha1_hex(&plain)))
                }),
            )
            .with_field(
                "created",
                DateTime::new(DateTimeOptions {
                    timezone: FixedOffset::east_opt(3600),
                    ..Default::default()
                })?,
            )
            .with_field(
                "status",
                Enum::new(EnumOptions {
                    choices: Some(vec![Value::from("active"), Value::from("banned")]),
                    ..Default::default()
                })?,
            )
            .with_field("admin", Boolean::new()))
    }
}

fn sha1_hex(plain: &str) -> String {
    Sha1::digest(plain.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn lang_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/lang")
}

fn messages_of(result: Result<bool>) -> IndexMap<String, Vec<String>> {
    match result {
        Err(err) => err.validation_messages().expect("validation error"),
        Ok(_) => panic!("expected validation to fail"),
    }
}

// ==================== Meta ====================

#[test]
fn meta_defaults() {
    let meta = BlogPost::meta().unwrap();
    assert_eq!(meta.table(), "blogposts");
    assert_eq!(meta.connection(), "default");
    assert_eq!(meta.primary_key(), ["id".to_string()]);
}

#[test]
fn meta_relationships() {
    let meta = UserValidated::meta().unwrap();
    assert_eq!(meta.table(), "users");
    let posts = meta.relationship("posts").unwrap();
    assert_eq!(posts.relationship_type, RelationshipType::HasMany);
    assert_eq!(posts.model, "BlogPost");
    assert_eq!(meta.relationships().len(), 2);
}

#[test]
fn unknown_relationship_type_fails_fast() {
    let err = Meta::new("User")
        .with_relationship("friends", "hasSome", "User", IndexMap::new())
        .unwrap_err();
    match err {
        Error::Config(e) => assert_eq!(e.kind, ConfigErrorKind::UnknownRelationship),
        other => panic!("expected config error, got {other:?}"),
    }
}

// ==================== Values ====================

#[test]
fn set_values_and_changes() {
    let mut post = BlogPost::factory().unwrap();
    post.set_values([("title", "Post Title"), ("body", "Post Body")])
        .unwrap();
    assert_eq!(post.get("title").unwrap(), Value::from("Post Title"));
    assert_eq!(post.get("body").unwrap(), Value::from("Post Body"));
    assert_eq!(post.get_or("author", "Rebecca").unwrap(), Value::from("Rebecca"));

    let keys: Vec<&str> = post.changes().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["title", "body"]);

    post.set_as_saved();
    assert!(!post.has_changes());
    assert!(post.changes().is_empty());
    assert!(post.is_loaded());
}

#[test]
fn original_ignores_pending_changes() {
    let mut user = BlogPost::factory().unwrap();
    user.set_values([("name", "Alex"), ("city", "London")]).unwrap();
    user.set_as_saved();

    user.set("name", "Jake").unwrap();
    assert_eq!(user.original("name").unwrap(), Value::from("Alex"));
    assert_eq!(user.original("city").unwrap(), Value::from("London"));
    assert_eq!(user.get("name").unwrap(), Value::from("Jake"));

    user.set_as_saved();
    assert_eq!(user.original("name").unwrap(), Value::from("Jake"));
}

// ==================== Validation ====================

#[test]
fn validation_empty_model_fails() {
    let user = UserValidated::factory().unwrap();
    let messages = messages_of(user.validate(&RuleSet::new(), None));
    assert_eq!(messages["name"], vec!["Name is required".to_string()]);
}

#[test]
fn validation_valid() {
    let mut user = UserValidated::factory().unwrap();
    user.set("name", "Alex").unwrap();
    assert!(user.validate(&RuleSet::new(), None).unwrap());

    user.set("about", "Alex is awesome").unwrap();
    assert!(user.validate(&RuleSet::new(), None).unwrap());
}

#[test]
fn validation_mixes_original_and_changed() {
    let mut user = UserValidated::factory().unwrap();
    user.set("name", "Alex").unwrap();
    user.set("about", "Alex is awesome").unwrap();
    assert!(user.validate(&RuleSet::new(), None).unwrap());
    user.set_as_saved();

    user.set("name", Value::Null).unwrap();
    let messages = messages_of(user.validate(&RuleSet::new(), None));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages["name"], vec!["Name is required".to_string()]);
}

#[test]
fn validation_with_extra_rules() {
    let mut user = UserValidated::factory().unwrap();
    user.set("name", "Alex").unwrap();

    let mut extra = RuleSet::new();
    extra.insert("name".to_string(), vec![Rule::contains("le")]);
    assert!(user.validate(&extra, None).unwrap());

    extra.insert("name".to_string(), vec![Rule::contains("uo")]);
    let messages = messages_of(user.validate(&extra, None));
    assert_eq!(messages["name"], vec!["Name must contain uo".to_string()]);
}

#[test]
fn validation_messages_default_to_english() {
    let user = UserValidated::factory().unwrap();
    let english = MessageBundle::english();
    let messages = messages_of(user.validate(&RuleSet::new(), Some(&english)));
    assert_eq!(messages["name"][0], "Name is required");
}

#[test]
fn validation_messages_in_french() {
    let user = UserValidated::factory().unwrap();
    let french = MessageBundle::load(lang_dir(), "fr").unwrap();
    assert_eq!(french.locale(), "fr");

    let messages = messages_of(user.validate(&RuleSet::new(), Some(&french)));
    assert_eq!(messages["name"][0], "Name is required [in French]");
}

#[test]
fn french_bundle_falls_back_for_missing_rules() {
    let mut user = UserValidated::factory().unwrap();
    user.set("name", "A").unwrap();
    let french = MessageBundle::load(lang_dir(), "fr").unwrap();

    let messages = messages_of(user.validate(&RuleSet::new(), Some(&french)));
    assert_eq!(
        messages["name"][0],
        "Name must be at least 2 characters long"
    );
}

#[test]
fn missing_locale_is_a_config_error() {
    match MessageBundle::load(lang_dir(), "xx") {
        Err(Error::Config(e)) => assert_eq!(e.kind, ConfigErrorKind::MessageBundle),
        other => panic!("expected message bundle error, got {other:?}"),
    }
}

// ==================== Field kinds ====================

#[test]
fn password_is_hashed_on_set() {
    let mut account = Account::factory().unwrap();
    account.set("password", "MyAwesomePassword").unwrap();
    assert_eq!(
        account.get("password").unwrap(),
        Value::from("de5f7d71dda25c2e9957be163800502b1abe95cb")
    );
}

#[test]
fn password_requires_hash_function() {
    match Password::new(PasswordOptions::default()) {
        Err(Error::Config(e)) => {
            assert_eq!(e.kind, ConfigErrorKind::MissingRequiredOptions);
            assert_eq!(e.message, "Missing required options: hash_with");
        }
        Ok(_) => panic!("expected missing options"),
        Err(other) => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn datetime_set_and_get() {
    let mut account = Account::factory().unwrap();
    account.set("created", "2014-07-02 12:31:47").unwrap();
    assert_eq!(account.changes()["created"], Value::BigInt(1_404_300_707));

    let created = account.get("created").unwrap();
    let dt = created.as_datetime().expect("structured date-time");
    assert_eq!(dt.timestamp(), 1_404_300_707);
    assert_eq!(dt.format("%H:%M:%S").to_string(), "12:31:47");

    account.set("created", Value::Null).unwrap();
    assert_eq!(account.get("created").unwrap(), Value::Null);
}

#[test]
fn enum_choices_are_validated() {
    let mut account = Account::factory().unwrap();
    account.set("status", "active").unwrap();
    assert!(account.validate(&RuleSet::new(), None).unwrap());

    account.set("status", "deleted").unwrap();
    let messages = messages_of(account.validate(&RuleSet::new(), None));
    assert_eq!(messages["status"], vec!["Status contains invalid value".to_string()]);
}

#[test]
fn boolean_round_trip() {
    let mut account = Account::factory().unwrap();
    assert_eq!(account.get("admin").unwrap(), Value::Bool(false));

    account.set("admin", true).unwrap();
    assert_eq!(account.changes()["admin"], Value::Int(1));
    assert_eq!(account.get("admin").unwrap(), Value::Bool(true));

    account.set("admin", 0).unwrap();
    assert_eq!(account.get("admin").unwrap(), Value::Bool(false));
}
