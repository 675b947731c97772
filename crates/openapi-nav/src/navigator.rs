//! The five query operations exposed to agents.
//!
//! `SpecNavigator` owns the derived indices and only shapes inputs and outputs; lookups, `$ref`
//! inlining and search live in their own modules. Not-found outcomes are ordinary values carrying
//! the valid alternatives so a caller can correct itself without another round trip.

use crate::config::{AuthHint, SpecSource};
use crate::document::{Document, SpecStore};
use crate::endpoints::{EndpointIndex, EndpointRecord, EndpointSelector, EndpointSummary};
use crate::error::Result;
use crate::resolver::RefResolver;
use crate::schemas::SchemaIndex;
use crate::search::{SearchEngine, SearchResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Maximum characters of an endpoint description shown by `list_endpoints`.
pub const LIST_DESCRIPTION_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct SpecNavigator {
    document: Arc<Document>,
    endpoints: EndpointIndex,
    schemas: SchemaIndex,
    auth: AuthHint,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub authentication: Authentication,
    pub endpoints: Vec<EndpointSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub kind: String,
    pub header: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemes: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointListing {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&EndpointRecord> for EndpointListing {
    fn from(record: &EndpointRecord) -> Self {
        Self {
            method: record.method.clone(),
            path: record.path.clone(),
            operation_id: record.operation_id.clone(),
            summary: record.summary.clone(),
            description: record
                .description
                .as_deref()
                .map(|d| truncate_chars(d, LIST_DESCRIPTION_CHARS)),
        }
    }
}

/// A fully resolved operation plus the route it was found under.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub method: String,
    pub path: String,
    pub operation: Value,
}

impl ResolvedEndpoint {
    /// `{ "method", "path", ...operation }`. `method` and `path` win over same-named operation
    /// members.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("method".to_string(), Value::String(self.method.clone()));
        out.insert("path".to_string(), Value::String(self.path.clone()));
        match &self.operation {
            Value::Object(op) => {
                for (k, v) in op {
                    if k != "method" && k != "path" {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Value::Null => {}
            other => {
                out.insert("operation".to_string(), other.clone());
            }
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndpointLookup {
    Found(ResolvedEndpoint),
    /// Every endpoint as `METHOD path`.
    NotFound { available: Vec<String> },
}

impl EndpointLookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Text payload returned to the agent.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Found(endpoint) => to_pretty_json(&endpoint.to_value()),
            Self::NotFound { available } => format!(
                "Endpoint not found. Available endpoints:\n{}",
                available.join("\n")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLookup {
    Found { name: String, schema: Value },
    NotFound { name: String, available: Vec<String> },
}

impl SchemaLookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Found { schema, .. } => to_pretty_json(schema),
            Self::NotFound { name, available } => format!(
                "Schema '{name}' not found. Available schemas:\n{}",
                available.join("\n")
            ),
        }
    }
}

impl SpecNavigator {
    /// Load the spec and build the indices.
    ///
    /// # Errors
    ///
    /// Returns a load error if the spec is missing or malformed.
    pub fn load(source: &SpecSource) -> Result<Self> {
        Ok(Self::new(&SpecStore::load(source)?))
    }

    #[must_use]
    pub fn new(store: &SpecStore) -> Self {
        Self::from_document(store.shared())
    }

    #[must_use]
    pub fn from_document(document: Arc<Document>) -> Self {
        Self {
            endpoints: EndpointIndex::build(Arc::clone(&document)),
            schemas: SchemaIndex::new(Arc::clone(&document)),
            document,
            auth: AuthHint::default(),
        }
    }

    #[must_use]
    pub fn with_auth_hint(mut self, auth: AuthHint) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn endpoints(&self) -> &EndpointIndex {
        &self.endpoints
    }

    #[must_use]
    pub fn schemas(&self) -> &SchemaIndex {
        &self.schemas
    }

    fn resolver(&self) -> RefResolver<'_> {
        RefResolver::new(self.document.root())
    }

    /// API description, base URL, authentication and the full endpoint list.
    #[must_use]
    pub fn overview(&self) -> Overview {
        let doc = &*self.document;
        Overview {
            title: doc.title().map(str::to_string),
            version: doc.version().map(str::to_string),
            description: doc.description().map(str::to_string),
            base_url: doc.base_url().map(str::to_string),
            authentication: self.authentication(),
            endpoints: self
                .endpoints
                .list()
                .iter()
                .map(EndpointSummary::from)
                .collect(),
        }
    }

    fn authentication(&self) -> Authentication {
        let schemes = self.document.security_schemes();

        let declared = schemes.into_iter().flatten().find_map(|(_, scheme)| {
            let kind = scheme.get("type").and_then(Value::as_str)?;
            match kind {
                "apiKey" if scheme.get("in").and_then(Value::as_str) == Some("header") => {
                    let header = scheme.get("name").and_then(Value::as_str)?;
                    Some(("API Key".to_string(), header.to_string()))
                }
                "http" => {
                    let scheme_name = scheme
                        .get("scheme")
                        .and_then(Value::as_str)
                        .unwrap_or("auth");
                    Some((format!("HTTP {scheme_name}"), "Authorization".to_string()))
                }
                _ => None,
            }
        });

        let (kind, header) =
            declared.unwrap_or_else(|| ("API Key".to_string(), self.auth.header.clone()));
        let description = if header.eq_ignore_ascii_case(&self.auth.header) {
            self.auth.description.clone()
        } else {
            format!("Pass your credentials in the {header} request header")
        };

        Authentication {
            kind,
            header,
            description,
            schemes: schemes.map(|s| Value::Object(s.clone())),
        }
    }

    /// Every endpoint with a description preview.
    #[must_use]
    pub fn list_endpoints(&self) -> Vec<EndpointListing> {
        self.endpoints
            .list()
            .iter()
            .map(EndpointListing::from)
            .collect()
    }

    /// One endpoint with all `$ref`s inlined.
    #[must_use]
    pub fn get_endpoint(&self, selector: &EndpointSelector) -> EndpointLookup {
        match self.endpoints.find(selector) {
            Some(found) => EndpointLookup::Found(ResolvedEndpoint {
                method: found.record.method.clone(),
                path: found.record.path.clone(),
                operation: self.resolver().resolve(found.operation),
            }),
            None => EndpointLookup::NotFound {
                available: self.endpoints.labels(),
            },
        }
    }

    /// One named schema with all `$ref`s inlined.
    #[must_use]
    pub fn get_schema(&self, name: &str) -> SchemaLookup {
        match self.schemas.get(name) {
            Some(schema) => SchemaLookup::Found {
                name: name.to_string(),
                schema: self.resolver().resolve(schema),
            },
            None => SchemaLookup::NotFound {
                name: name.to_string(),
                available: self.schemas.names().map(str::to_string).collect(),
            },
        }
    }

    #[must_use]
    pub fn search_docs(&self, query: &str) -> SearchResult {
        SearchEngine::new(&self.endpoints, &self.schemas).search(query)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s.to_string(),
    }
}

/// Pretty JSON text for tool payloads.
#[must_use]
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn navigator(doc: Value) -> SpecNavigator {
        SpecNavigator::from_document(Arc::new(Document::from_value("inline", doc).unwrap()))
    }

    #[test]
    fn truncates_on_character_boundaries() {
        let long = "ñ".repeat(LIST_DESCRIPTION_CHARS + 5);
        let cut = truncate_chars(&long, LIST_DESCRIPTION_CHARS);
        assert_eq!(cut.chars().count(), LIST_DESCRIPTION_CHARS + 1);
        assert!(cut.ends_with('…'));

        let exact = "a".repeat(LIST_DESCRIPTION_CHARS);
        assert_eq!(truncate_chars(&exact, LIST_DESCRIPTION_CHARS), exact);
    }

    #[test]
    fn resolved_endpoint_keeps_route_over_operation_members() {
        let endpoint = ResolvedEndpoint {
            method: "GET".to_string(),
            path: "/v3/banks".to_string(),
            operation: json!({ "path": "shadow", "summary": "Bancos" }),
        };
        assert_eq!(
            endpoint.to_value(),
            json!({ "method": "GET", "path": "/v3/banks", "summary": "Bancos" })
        );
    }

    #[test]
    fn authentication_prefers_declared_api_key_scheme() {
        let nav = navigator(json!({
            "components": {
                "securitySchemes": {
                    "Token": { "type": "apiKey", "in": "header", "name": "x-merchant-key" }
                }
            }
        }));
        let auth = nav.overview().authentication;
        assert_eq!(auth.kind, "API Key");
        assert_eq!(auth.header, "x-merchant-key");
        assert!(auth.description.contains("x-merchant-key"));
        assert!(auth.schemes.is_some());
    }

    #[test]
    fn authentication_falls_back_to_hint() {
        let nav = navigator(json!({ "paths": {} }));
        let auth = nav.overview().authentication;
        assert_eq!(auth.header, "x-api-key");
        assert_eq!(auth.description, AuthHint::default().description);
        assert!(auth.schemes.is_none());

        let rendered = serde_json::to_value(nav.overview()).unwrap();
        assert_eq!(rendered["authentication"]["type"], json!("API Key"));
        assert!(rendered.get("title").is_none());
    }

    #[test]
    fn not_found_payloads_list_alternatives() {
        let nav = navigator(json!({
            "paths": { "/v3/banks": { "get": { "operationId": "getBanks" } } },
            "components": { "schemas": { "success": {}, "error": {} } }
        }));

        let lookup = nav.get_endpoint(&EndpointSelector::by_operation_id("nope"));
        assert_eq!(
            lookup.render(),
            "Endpoint not found. Available endpoints:\nGET /v3/banks"
        );

        let lookup = nav.get_schema("missing");
        assert_eq!(
            lookup.render(),
            "Schema 'missing' not found. Available schemas:\nsuccess\nerror"
        );
    }
}
