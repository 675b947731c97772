//! Case-insensitive substring search over endpoints and schemas.
//!
//! No ranking: results come back in document declaration order. An operation or schema matches
//! when its compact JSON text contains the query, so parameter names, enum values and response
//! descriptions are all searchable.

use crate::endpoints::{EndpointIndex, EndpointSummary};
use crate::schemas::SchemaIndex;
use serde::{Serialize, Serializer};
use std::fmt;

/// Characters of context kept on each side of a description match.
pub const SNIPPET_CONTEXT_CHARS: usize = 40;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub matching_endpoints: Vec<EndpointSummary>,
    pub matching_schemas: Vec<String>,
    pub context_snippets: Vec<ContextSnippet>,
    pub total_matches: usize,
}

impl SearchResult {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            matching_endpoints: Vec::new(),
            matching_schemas: Vec::new(),
            context_snippets: Vec::new(),
            total_matches: 0,
        }
    }
}

/// Excerpt of an endpoint description around the first match.
///
/// Serialized as `[METHOD path]: …text…`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnippet {
    pub method: String,
    pub path: String,
    pub text: String,
}

impl fmt::Display for ContextSnippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]: …{}…", self.method, self.path, self.text)
    }
}

impl Serialize for ContextSnippet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchEngine<'a> {
    endpoints: &'a EndpointIndex,
    schemas: &'a SchemaIndex,
}

impl<'a> SearchEngine<'a> {
    #[must_use]
    pub fn new(endpoints: &'a EndpointIndex, schemas: &'a SchemaIndex) -> Self {
        Self { endpoints, schemas }
    }

    /// Run `query` against every endpoint and schema. An empty query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> SearchResult {
        let needle: Vec<char> = fold_chars(query).collect();
        if needle.is_empty() {
            return SearchResult::empty(query);
        }
        let needle_str: String = needle.iter().collect();

        let mut result = SearchResult::empty(query);

        for m in self.endpoints.operations() {
            let serialized = fold(&m.operation.to_string());
            if !serialized.contains(&needle_str) && !fold(&m.record.path).contains(&needle_str) {
                continue;
            }
            result.matching_endpoints.push(EndpointSummary::from(m.record));

            if let Some(description) = m.record.description.as_deref()
                && let Some(text) = snippet(description, &needle)
            {
                result.context_snippets.push(ContextSnippet {
                    method: m.record.method.clone(),
                    path: m.record.path.clone(),
                    text,
                });
            }
        }

        for (name, schema) in self.schemas.iter() {
            if fold(name).contains(&needle_str) || fold(&schema.to_string()).contains(&needle_str)
            {
                result.matching_schemas.push(name.to_string());
            }
        }

        result.total_matches = result.matching_endpoints.len() + result.matching_schemas.len();
        tracing::debug!(
            query,
            endpoints = result.matching_endpoints.len(),
            schemas = result.matching_schemas.len(),
            "search complete"
        );
        result
    }
}

fn fold_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn fold(s: &str) -> String {
    fold_chars(s).collect()
}

/// Up to [`SNIPPET_CONTEXT_CHARS`] characters either side of the first case-insensitive match of
/// `needle` (already folded) inside `text`, clipped to `text`.
fn snippet(text: &str, needle: &[char]) -> Option<String> {
    let (start, end) = find_folded(text, needle)?;
    let from = start.saturating_sub(SNIPPET_CONTEXT_CHARS);
    let to = end + SNIPPET_CONTEXT_CHARS;
    Some(text.chars().skip(from).take(to - from).collect())
}

/// Character range `[start, end)` in `text` of the first match of `needle`.
///
/// Folding may expand one character into several, so matches are found on the folded sequence
/// and mapped back to original character positions.
fn find_folded(text: &str, needle: &[char]) -> Option<(usize, usize)> {
    let mut folded: Vec<char> = Vec::new();
    let mut origin: Vec<usize> = Vec::new();
    for (i, c) in text.chars().enumerate() {
        for lower in c.to_lowercase() {
            folded.push(lower);
            origin.push(i);
        }
    }

    if needle.is_empty() || needle.len() > folded.len() {
        return None;
    }
    let pos = folded.windows(needle.len()).position(|w| w == needle)?;
    let start = *origin.get(pos)?;
    let end = *origin.get(pos + needle.len() - 1)? + 1;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;
    use std::sync::Arc;

    fn engine_parts() -> (EndpointIndex, SchemaIndex) {
        let doc = Document::from_value(
            "inline",
            json!({
                "paths": {
                    "/v3/payments/{id}/refunds": {
                        "post": {
                            "operationId": "postPaymentRefundsById",
                            "summary": "Reembolsar un pago",
                            "description": "Refund a payment. Only available for merchants collecting into a Khipu account and before fund settlement, and only once per payment."
                        }
                    },
                    "/v3/banks": {
                        "get": {
                            "operationId": "getBanks",
                            "summary": "Listado de bancos",
                            "responses": { "200": { "description": "list of banks (refund capable flag included)" } }
                        }
                    }
                },
                "components": {
                    "schemas": {
                        "refund-post": { "type": "object" },
                        "bank-get-banks": { "properties": { "refundable": { "type": "boolean" } } },
                        "success": { "type": "object" }
                    }
                }
            }),
        )
        .unwrap();
        let doc = Arc::new(doc);
        (
            EndpointIndex::build(Arc::clone(&doc)),
            SchemaIndex::new(doc),
        )
    }

    #[test]
    fn refund_query_finds_endpoints_schemas_and_snippet() {
        let (endpoints, schemas) = engine_parts();
        let result = SearchEngine::new(&endpoints, &schemas).search("refund");

        assert_eq!(result.query, "refund");
        assert_eq!(
            result
                .matching_endpoints
                .iter()
                .map(|e| e.path.as_str())
                .collect::<Vec<_>>(),
            ["/v3/payments/{id}/refunds", "/v3/banks"]
        );
        assert_eq!(result.matching_schemas, ["refund-post", "bank-get-banks"]);
        assert_eq!(result.total_matches, 4);

        // Only the first endpoint has the query inside its description.
        assert_eq!(result.context_snippets.len(), 1);
        let snippet = &result.context_snippets[0];
        assert_eq!(snippet.method, "POST");
        assert!(snippet.text.contains("Refund"));
        assert!(snippet.text.chars().count() <= 2 * SNIPPET_CONTEXT_CHARS + "refund".len());
        assert!(snippet.text.starts_with("Refund a payment"));
        assert_eq!(
            snippet.to_string(),
            format!("[POST /v3/payments/{{id}}/refunds]: …{}…", snippet.text)
        );
    }

    #[test]
    fn no_match_returns_empty_collections() {
        let (endpoints, schemas) = engine_parts();
        let result = SearchEngine::new(&endpoints, &schemas).search("zzz-nomatch-zzz");
        assert!(result.matching_endpoints.is_empty());
        assert!(result.matching_schemas.is_empty());
        assert!(result.context_snippets.is_empty());
        assert_eq!(result.total_matches, 0);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let (endpoints, schemas) = engine_parts();
        let result = SearchEngine::new(&endpoints, &schemas).search("");
        assert_eq!(result.total_matches, 0);
        assert!(result.matching_endpoints.is_empty());
    }

    #[test]
    fn route_path_alone_can_match() {
        let (endpoints, schemas) = engine_parts();
        let result = SearchEngine::new(&endpoints, &schemas).search("/V3/BANKS");
        assert_eq!(result.matching_endpoints.len(), 1);
        assert_eq!(
            result.matching_endpoints[0].operation_id.as_deref(),
            Some("getBanks")
        );
        assert!(result.context_snippets.is_empty());
    }

    #[test]
    fn snippet_window_is_clipped_and_counts_characters() {
        let text = format!("{}needle{}", "á".repeat(50), "é".repeat(50));
        let needle: Vec<char> = "NEEDLE".chars().flat_map(char::to_lowercase).collect();
        let s = snippet(&text, &needle).unwrap();
        assert_eq!(
            s,
            format!("{}needle{}", "á".repeat(40), "é".repeat(40))
        );

        let short = snippet("needle at start", &needle).unwrap();
        assert_eq!(short, "needle at start");
    }

    #[test]
    fn folded_match_maps_back_to_original_positions() {
        // 'İ' folds to two characters; offsets must still point into the original text.
        let needle: Vec<char> = "pago".chars().collect();
        assert_eq!(find_folded("İİ Pago", &needle), Some((3, 7)));
    }

    #[test]
    fn snippets_serialize_as_labeled_strings() {
        let snippet = ContextSnippet {
            method: "GET".to_string(),
            path: "/v3/banks".to_string(),
            text: "bancos".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&snippet).unwrap(),
            json!("[GET /v3/banks]: …bancos…")
        );
    }
}
