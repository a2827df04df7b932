//! Lazily-materialized query results.

use crate::model::Model;
use sqlrecord_core::Row;
use std::ops::Range;

/// Raw rows that turn into models on first access.
///
/// Each index is built at most once: repeated access hands back the same
/// instance, so edits made through one access are visible to the next.
///
/// Models are populated with [`Model::load`], which stores row values as
/// they came from the database. Field `set` hooks do not run, so a stored
/// password hash is not hashed a second time.
#[derive(Debug, Clone)]
pub struct Resultset {
    rows: Vec<Row>,
    built: Vec<Option<Model>>,
    prototype: Model,
}

impl Resultset {
    pub fn new(rows: Vec<Row>, prototype: Model) -> Self {
        let built = vec![None; rows.len()];
        Self {
            rows,
            built,
            prototype,
        }
    }

    /// Model cloned for every row.
    pub fn result_model(&self) -> &Model {
        &self.prototype
    }

    /// Replace the prototype. Rows already built keep their instances.
    pub fn set_result_model(&mut self, prototype: Model) -> &mut Self {
        self.prototype = prototype;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The model for row `index`, built on first access.
    pub fn get(&mut self, index: usize) -> Option<&mut Model> {
        self.build(index);
        self.built.get_mut(index).and_then(Option::as_mut)
    }

    /// Models for every row in `range`, clamped to the result length.
    pub fn slice(&mut self, range: Range<usize>) -> Vec<&mut Model> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        for index in start..end {
            self.build(index);
        }
        self.built[start..end]
            .iter_mut()
            .filter_map(Option::as_mut)
            .collect()
    }

    /// Every model, in row order.
    pub fn models(&mut self) -> Vec<&mut Model> {
        self.slice(0..self.len())
    }

    pub fn into_models(mut self) -> Vec<Model> {
        for index in 0..self.len() {
            self.build(index);
        }
        self.built.into_iter().flatten().collect()
    }

    fn build(&mut self, index: usize) {
        let (Some(row), Some(slot)) = (self.rows.get(index), self.built.get_mut(index)) else {
            return;
        };
        if slot.is_none() {
            let mut model = self.prototype.clone();
            model.load(row);
            *slot = Some(model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Meta;
    use sqlrecord_core::Value;
    use std::sync::Arc;

    fn resultset() -> Resultset {
        let rows = ["Alex", "Lucie", "Archibald"]
            .iter()
            .enumerate()
            .map(|(i, name)| Row::from_pairs([("id", Value::from(i as i64 + 1)), ("name", Value::from(*name))]))
            .collect();
        Resultset::new(rows, Model::new(Arc::new(Meta::new("User"))))
    }

    #[test]
    fn builds_on_access() {
        let mut rs = resultset();
        assert_eq!(rs.len(), 3);
        let first = rs.get(0).unwrap();
        assert!(first.is_loaded());
        assert!(!first.has_changes());
        assert_eq!(first.get("name").unwrap(), Value::from("Alex"));
        assert!(rs.get(3).is_none());
    }

    #[test]
    fn access_is_memoized() {
        let mut rs = resultset();
        rs.get(1).unwrap().set("name", "Lucy").unwrap();
        let again = rs.get(1).unwrap();
        assert_eq!(again.get("name").unwrap(), Value::from("Lucy"));
        assert_eq!(again.original("name").unwrap(), Value::from("Lucie"));
    }

    #[test]
    fn slices_share_memoized_instances() {
        let mut rs = resultset();
        rs.get(2).unwrap().set("name", "Archie").unwrap();

        let names: Vec<Value> = rs
            .slice(1..10)
            .into_iter()
            .map(|m| m.get("name").unwrap())
            .collect();
        assert_eq!(names, vec![Value::from("Lucie"), Value::from("Archie")]);
        assert!(rs.slice(5..7).is_empty());
    }

    #[test]
    fn into_models_keeps_edits() {
        let mut rs = resultset();
        rs.get(0).unwrap().set("name", "Alexander").unwrap();
        let models = rs.into_models();
        assert_eq!(models.len(), 3);
        assert_eq!(models[0].get("name").unwrap(), Value::from("Alexander"));
        assert_eq!(models[2].get("id").unwrap(), Value::BigInt(3));
    }

    #[test]
    fn empty() {
        let mut rs = Resultset::new(Vec::new(), Model::new(Arc::new(Meta::new("User"))));
        assert!(rs.is_empty());
        assert!(rs.models().is_empty());
    }
}
