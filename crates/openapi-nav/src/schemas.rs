//! Named reusable schemas (`components.schemas`).

use crate::document::Document;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SchemaIndex {
    document: Arc<Document>,
}

impl SchemaIndex {
    #[must_use]
    pub fn new(document: Arc<Document>) -> Self {
        Self { document }
    }

    /// Schema names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.document
            .schemas()
            .into_iter()
            .flat_map(|schemas| schemas.keys().map(String::as_str))
    }

    /// Raw (unresolved) schema by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.document.schemas()?.get(name)
    }

    /// `(name, schema)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.document
            .schemas()
            .into_iter()
            .flat_map(|schemas| schemas.iter().map(|(k, v)| (k.as_str(), v)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.document.schemas().map_or(0, serde_json::Map::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
