//! Per-model schema descriptors.
//!
//! A [`Meta`] is built once per record type and shared by every instance of
//! it through an `Arc`. It names the table, the primary key, the connection
//! the model lives on, its fields and its relationships.

use crate::field::Field;
use indexmap::IndexMap;
use sqlrecord_core::{ConfigError, ConfigErrorKind, Error, Result, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Cardinality of a relationship between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    HasOne,
    HasMany,
    BelongsTo,
    ManyToMany,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 4] = [
        RelationshipType::HasOne,
        RelationshipType::HasMany,
        RelationshipType::BelongsTo,
        RelationshipType::ManyToMany,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::HasOne => "hasOne",
            RelationshipType::HasMany => "hasMany",
            RelationshipType::BelongsTo => "belongsTo",
            RelationshipType::ManyToMany => "manyToMany",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(RelationshipType::as_str).collect();
                Error::Config(ConfigError::new(
                    ConfigErrorKind::UnknownRelationship,
                    format!(
                        "Unknown relationship type \"{s}\". Known types: {}",
                        known.join(", ")
                    ),
                ))
            })
    }
}

/// A declared link from one model to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub relationship_type: RelationshipType,
    /// Name of the related record type.
    pub model: String,
    /// Free-form options (foreign keys, pivot table, ...).
    pub options: IndexMap<String, Value>,
}

/// Schema descriptor for one record type.
#[derive(Debug, Clone)]
pub struct Meta {
    name: String,
    table: Option<String>,
    connection: String,
    primary_key: Vec<String>,
    fields: IndexMap<String, Arc<dyn Field>>,
    relationships: IndexMap<String, Relationship>,
}

impl Meta {
    /// Empty descriptor for the record type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            connection: "default".to_string(),
            primary_key: vec!["id".to_string()],
            fields: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name; defaults to the pluralized, lowercased type name.
    pub fn table(&self) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None => pluralizer::pluralize(&self.name, 2, false).to_lowercase(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = Some(table.into());
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        self.fields.insert(name.into(), Arc::new(field));
        self
    }

    pub fn field(&self, name: &str) -> Option<&Arc<dyn Field>> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Arc<dyn Field>> {
        &self.fields
    }

    /// Declare a relationship. `relationship_type` is one of `hasOne`,
    /// `hasMany`, `belongsTo` or `manyToMany`.
    pub fn with_relationship(
        mut self,
        name: impl Into<String>,
        relationship_type: &str,
        model: impl Into<String>,
        options: IndexMap<String, Value>,
    ) -> Result<Self> {
        let name = name.into();
        let relationship_type = relationship_type.parse()?;
        self.relationships.insert(
            name.clone(),
            Relationship {
                name,
                relationship_type,
                model: model.into(),
                options,
            },
        );
        Ok(self)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> &IndexMap<String, Relationship> {
        &self.relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Boolean, Text};

    #[test]
    fn table_defaults_to_plural_lowercase() {
        assert_eq!(Meta::new("User").table(), "users");
        assert_eq!(Meta::new("Category").table(), "categories");
        assert_eq!(Meta::new("Person").table(), "people");
        assert_eq!(Meta::new("User").with_table("members").table(), "members");
    }

    #[test]
    fn defaults() {
        let meta = Meta::new("User");
        assert_eq!(meta.connection(), "default");
        assert_eq!(meta.primary_key(), ["id".to_string()]);
        assert!(meta.fields().is_empty());
        assert!(meta.relationships().is_empty());
    }

    #[test]
    fn fields_keep_declaration_order() {
        let meta = Meta::new("User")
            .with_field("name", Text::new())
            .with_field("active", Boolean::new());
        let names: Vec<_> = meta.fields().keys().cloned().collect();
        assert_eq!(names, vec!["name", "active"]);
        assert_eq!(meta.field("active").map(|f| f.kind()), Some("boolean"));
        assert!(meta.field("missing").is_none());
    }

    #[test]
    fn relationships() {
        let meta = Meta::new("User")
            .with_relationship("posts", "hasMany", "Post", IndexMap::new())
            .unwrap();
        let rel = meta.relationship("posts").unwrap();
        assert_eq!(rel.relationship_type, RelationshipType::HasMany);
        assert_eq!(rel.model, "Post");
    }

    #[test]
    fn unknown_relationship_type() {
        let err = Meta::new("User")
            .with_relationship("posts", "hasLots", "Post", IndexMap::new())
            .unwrap_err();
        match err {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::UnknownRelationship);
                assert_eq!(
                    e.message,
                    "Unknown relationship type \"hasLots\". Known types: hasOne, hasMany, belongsTo, manyToMany"
                );
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
