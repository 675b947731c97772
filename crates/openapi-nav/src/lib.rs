//! Read-only navigation over an `OpenAPI` document.
//!
//! The document is loaded once ([`document::SpecStore`]) and never mutated. Everything else is a
//! pure projection over that snapshot:
//! - [`endpoints`]: flattened `(method, path)` records and endpoint lookup
//! - [`schemas`]: named reusable schemas
//! - [`resolver`]: local `$ref` inlining with cycle protection
//! - [`search`]: case-insensitive substring search with description snippets
//! - [`navigator`]: the five query operations composed from the above
//!
//! It intentionally contains **no** transport or HTTP client code.

pub mod config;
pub mod document;
pub mod endpoints;
pub mod error;
pub mod navigator;
pub mod resolver;
pub mod schemas;
pub mod search;

pub use config::{AuthHint, HashPolicy, SpecSource};
pub use document::{Document, SpecStore};
pub use endpoints::{EndpointRecord, EndpointSelector, EndpointSummary};
pub use error::{Result, SpecNavError};
pub use navigator::{EndpointLookup, SchemaLookup, SpecNavigator};
pub use search::{ContextSnippet, SearchResult};
