//! Mapping between embedded relation labels and the identifiers edit forms need.
//!
//! Matching is by exact name. Two related entities sharing a display name are both
//! selected; the backend does not give the console anything better to go on.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{EntityId, Label};

/// A backend collection that can serve as the option list of a multi-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    Authors,
    Categories,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Books => "/books",
            Collection::Authors => "/authors",
            Collection::Categories => "/categories",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Authors => "authors",
            Collection::Categories => "categories",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationOption {
    pub id: EntityId,
    pub name: String,
}

impl RelationOption {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Option lists of the auxiliary collections a panel has loaded.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    by_collection: HashMap<Collection, Vec<RelationOption>>,
}

impl Relations {
    pub fn set(&mut self, collection: Collection, options: Vec<RelationOption>) {
        self.by_collection.insert(collection, options);
    }

    pub fn with(mut self, collection: Collection, options: Vec<RelationOption>) -> Self {
        self.set(collection, options);
        self
    }

    pub fn options(&self, collection: Collection) -> &[RelationOption] {
        self.by_collection
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_loaded(&self, collection: Collection) -> bool {
        self.by_collection.contains_key(&collection)
    }

    pub fn name_of(&self, collection: Collection, id: EntityId) -> Option<&str> {
        self.options(collection)
            .iter()
            .find(|option| option.id == id)
            .map(|option| option.name.as_str())
    }

    pub fn resolve(&self, collection: Collection, labels: &[Label]) -> Vec<EntityId> {
        resolve_ids(labels, self.options(collection))
    }
}

/// Identifiers of the options whose name equals the name of any label, in option order.
pub fn resolve_ids(labels: &[Label], options: &[RelationOption]) -> Vec<EntityId> {
    options
        .iter()
        .filter(|option| labels.iter().any(|label| label.name() == Some(option.name.as_str())))
        .map(|option| option.id)
        .collect()
}

/// Reads `{id, name}` pairs out of a collection payload, skipping malformed items.
pub fn parse_options(payload: &Value) -> Vec<RelationOption> {
    let Some(items) = payload.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?.as_i64()?;
            let name = item.get("name")?.as_str()?;
            Some(RelationOption::new(id, name))
        })
        .collect()
}
