//! Flattened `(method, path)` view over `paths`.

use crate::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Path-item keys that name operations. Everything else under a path item (`parameters`,
/// `summary`, `servers`, `x-*`) is not an operation.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

#[must_use]
pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(key))
}

/// One `(route, method)` pair, in document declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Upper-cased method for display.
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Method key exactly as it appears under the path item.
    method_key: String,
}

impl EndpointRecord {
    fn from_operation(path: &str, method_key: &str, op: &Value) -> Self {
        let text = |key: &str| op.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            method: method_key.to_ascii_uppercase(),
            path: path.to_string(),
            operation_id: text("operationId"),
            summary: text("summary"),
            description: text("description"),
            method_key: method_key.to_string(),
        }
    }

    #[must_use]
    pub fn method_key(&self) -> &str {
        &self.method_key
    }

    /// `METHOD path`, the form used when listing alternatives.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Compact endpoint description shared by the overview and search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl From<&EndpointRecord> for EndpointSummary {
    fn from(record: &EndpointRecord) -> Self {
        Self {
            method: record.method.clone(),
            path: record.path.clone(),
            operation_id: record.operation_id.clone(),
            summary: record.summary.clone(),
        }
    }
}

/// How a caller picks one endpoint.
///
/// `operation_id` takes precedence; `path` + `method` is the fallback when the id is absent or
/// matches nothing. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSelector {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

impl EndpointSelector {
    #[must_use]
    pub fn by_operation_id(id: impl Into<String>) -> Self {
        Self {
            operation_id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_route(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            operation_id: None,
            path: Some(path.into()),
            method: Some(method.into()),
        }
    }
}

/// A found endpoint: its record plus the raw (unresolved) operation.
#[derive(Debug, Clone, Copy)]
pub struct EndpointMatch<'a> {
    pub record: &'a EndpointRecord,
    pub operation: &'a Value,
}

#[derive(Debug, Clone)]
pub struct EndpointIndex {
    document: Arc<Document>,
    records: Vec<EndpointRecord>,
}

impl EndpointIndex {
    /// Flatten `paths` once. The document never changes, so neither does the index.
    #[must_use]
    pub fn build(document: Arc<Document>) -> Self {
        let mut records = Vec::new();
        for (path, item) in document.paths().into_iter().flatten() {
            let Some(item) = item.as_object() else {
                tracing::warn!(path = %path, "Skipping path item that is not an object");
                continue;
            };
            for (method_key, op) in item {
                if !is_http_method(method_key) {
                    continue;
                }
                if !op.is_object() {
                    tracing::warn!(
                        path = %path,
                        method = %method_key,
                        "Skipping operation that is not an object"
                    );
                    continue;
                }
                records.push(EndpointRecord::from_operation(path, method_key, op));
            }
        }

        Self { document, records }
    }

    #[must_use]
    pub fn list(&self) -> &[EndpointRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw operation object behind a record.
    #[must_use]
    pub fn operation(&self, record: &EndpointRecord) -> Option<&Value> {
        self.document
            .paths()?
            .get(&record.path)?
            .get(record.method_key())
    }

    /// Records paired with their raw operations, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = EndpointMatch<'_>> {
        self.records.iter().filter_map(|record| {
            self.operation(record)
                .map(|operation| EndpointMatch { record, operation })
        })
    }

    /// First endpoint (declaration order) selected by `selector`.
    #[must_use]
    pub fn find(&self, selector: &EndpointSelector) -> Option<EndpointMatch<'_>> {
        let operation_id = non_empty(selector.operation_id.as_deref());
        let path = non_empty(selector.path.as_deref());
        let method = non_empty(selector.method.as_deref());

        if let Some(id) = operation_id
            && let Some(found) = self
                .operations()
                .find(|m| m.record.operation_id.as_deref() == Some(id))
        {
            return Some(found);
        }

        let (Some(path), Some(method)) = (path, method) else {
            return None;
        };
        self.operations()
            .find(|m| m.record.path == path && m.record.method_key.eq_ignore_ascii_case(method))
    }

    /// Every endpoint as `METHOD path`, for not-found guidance.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(EndpointRecord::label).collect()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
