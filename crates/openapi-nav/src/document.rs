//! Spec loading and the immutable document snapshot.
//!
//! The document is kept as a `serde_json::Value` tree rather than a typed `OpenAPI` model: the
//! navigation tools need to echo arbitrary vendor extensions and partially-invalid sections
//! verbatim, and `$ref` resolution works on raw JSON pointers anyway.

use crate::config::{HashPolicy, SpecSource};
use crate::error::{Result, SpecNavError};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Parsed API description. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Wrap an already-parsed tree after checking it has the shape of an API description.
    ///
    /// # Errors
    ///
    /// Returns [`SpecNavError::InvalidDocument`] if the root is not an object, or if `paths`,
    /// `components` or `components.schemas` are present but not objects.
    pub fn from_value(location: &str, root: Value) -> Result<Self> {
        let invalid = |message: &str| SpecNavError::InvalidDocument {
            location: location.to_string(),
            message: message.to_string(),
        };

        let Some(obj) = root.as_object() else {
            return Err(invalid("document root must be an object"));
        };
        if obj.get("paths").is_some_and(|p| !p.is_object()) {
            return Err(invalid("'paths' must be an object"));
        }
        match obj.get("components") {
            Some(Value::Object(components)) => {
                if components.get("schemas").is_some_and(|s| !s.is_object()) {
                    return Err(invalid("'components.schemas' must be an object"));
                }
            }
            Some(_) => return Err(invalid("'components' must be an object")),
            None => {}
        }

        Ok(Self { root })
    }

    /// The whole tree; `$ref` pointers are resolved against this.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    fn info_field(&self, key: &str) -> Option<&str> {
        self.root.get("info")?.get(key)?.as_str()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.info_field("title")
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.info_field("version")
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.info_field("description")
    }

    /// Server URLs in declaration order.
    pub fn server_urls(&self) -> impl Iterator<Item = &str> {
        self.root
            .get("servers")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|s| s.get("url").and_then(Value::as_str))
    }

    /// First declared server URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.server_urls().next()
    }

    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.root.get("paths")?.as_object()
    }

    fn component_section(&self, section: &str) -> Option<&Map<String, Value>> {
        self.root.get("components")?.get(section)?.as_object()
    }

    /// `components.schemas`, in declaration order.
    #[must_use]
    pub fn schemas(&self) -> Option<&Map<String, Value>> {
        self.component_section("schemas")
    }

    /// `components.securitySchemes`, in declaration order.
    #[must_use]
    pub fn security_schemes(&self) -> Option<&Map<String, Value>> {
        self.component_section("securitySchemes")
    }
}

/// Owner of the loaded document.
///
/// Loading happens once; afterwards only shared, read-only handles are handed out.
#[derive(Debug, Clone)]
pub struct SpecStore {
    location: String,
    document: Arc<Document>,
}

impl SpecStore {
    /// Read, verify and parse a spec file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the hash check fails under
    /// [`HashPolicy::Fail`], or the content is not a well-formed API description.
    pub fn load(source: &SpecSource) -> Result<Self> {
        tracing::info!("Loading OpenAPI spec from {}", source.spec);
        let content =
            std::fs::read_to_string(&source.spec).map_err(|e| SpecNavError::SpecReadFile {
                path: source.spec.clone(),
                source: e,
            })?;

        verify_hash(source, &content)?;
        Self::parse(&source.spec, &content)
    }

    /// Parse spec text that is already in memory.
    ///
    /// `location` is only used for error messages and logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is neither JSON nor YAML, or is not a well-formed API
    /// description.
    pub fn parse(location: &str, content: &str) -> Result<Self> {
        // Plain JSON first (fast path for bundled specs), YAML as fallback.
        let root: Value = serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| SpecNavError::SpecParse {
                location: location.to_string(),
                source: e,
            })?;

        let document = Document::from_value(location, root)?;
        tracing::info!(
            location,
            title = document.title().unwrap_or_default(),
            paths = document.paths().map_or(0, Map::len),
            schemas = document.schemas().map_or(0, Map::len),
            "OpenAPI spec loaded"
        );

        Ok(Self {
            location: location.to_string(),
            document: Arc::new(document),
        })
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn get(&self) -> &Document {
        &self.document
    }

    /// Shared handle for components that outlive the store borrow.
    #[must_use]
    pub fn shared(&self) -> Arc<Document> {
        Arc::clone(&self.document)
    }
}

/// `sha256:<hex>` digest of spec content.
#[must_use]
pub fn content_hash(content: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content.as_bytes())))
}

fn verify_hash(source: &SpecSource, content: &str) -> Result<()> {
    let Some(expected) = &source.spec_hash else {
        return Ok(());
    };
    if source.spec_hash_policy == HashPolicy::Ignore {
        return Ok(());
    }

    let actual = content_hash(content);
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    match source.spec_hash_policy {
        HashPolicy::Fail => Err(SpecNavError::HashMismatch {
            location: source.spec.clone(),
            expected: expected.clone(),
            actual,
        }),
        HashPolicy::Warn => {
            tracing::warn!(
                "Spec hash mismatch for '{}'. Expected: {}, Got: {}",
                source.spec,
                expected,
                actual
            );
            Ok(())
        }
        HashPolicy::Ignore => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write as _;

    fn write_spec(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_json_and_keeps_declaration_order() {
        let store = SpecStore::parse(
            "inline",
            r#"{"info":{"title":"t","version":"3"},"paths":{"/z":{},"/a":{},"/m":{}}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = store
            .get()
            .paths()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["/z", "/a", "/m"]);
        assert_eq!(store.get().title(), Some("t"));
        assert_eq!(store.get().version(), Some("3"));
    }

    #[test]
    fn parses_yaml_fallback() {
        let store = SpecStore::parse(
            "inline.yaml",
            "openapi: 3.0.0\ninfo:\n  title: y\n  version: '1'\nservers:\n  - url: https://a.example\n  - url: https://b.example\npaths: {}\n",
        )
        .unwrap();
        assert_eq!(store.get().base_url(), Some("https://a.example"));
        assert_eq!(store.get().server_urls().count(), 2);
    }

    #[test]
    fn rejects_non_object_root() {
        let err = SpecStore::parse("inline", "[1, 2, 3]").unwrap_err();
        assert!(matches!(err, SpecNavError::InvalidDocument { .. }));
    }

    #[test]
    fn rejects_malformed_content() {
        let err = SpecStore::parse("inline", "{ \"paths\": [").unwrap_err();
        assert!(matches!(err, SpecNavError::SpecParse { .. }));
    }

    #[test]
    fn rejects_non_object_schemas() {
        let err = Document::from_value("inline", json!({"components": {"schemas": []}}))
            .unwrap_err();
        assert!(err.to_string().contains("components.schemas"));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = SpecStore::load(&SpecSource::from_path("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, SpecNavError::SpecReadFile { .. }));
    }

    #[test]
    fn loads_from_file() {
        let file = write_spec(r#"{"info":{"title":"file"},"paths":{}}"#);
        let store =
            SpecStore::load(&SpecSource::from_path(file.path().display().to_string())).unwrap();
        assert_eq!(store.get().title(), Some("file"));
    }

    #[test]
    fn hash_mismatch_fails_only_under_fail_policy() {
        let content = r#"{"paths":{}}"#;
        let file = write_spec(content);
        let mut source = SpecSource::from_path(file.path().display().to_string());
        source.spec_hash = Some("sha256:deadbeef".to_string());

        source.spec_hash_policy = HashPolicy::Warn;
        assert!(SpecStore::load(&source).is_ok());

        source.spec_hash_policy = HashPolicy::Fail;
        let err = SpecStore::load(&source).unwrap_err();
        assert!(matches!(err, SpecNavError::HashMismatch { .. }));

        source.spec_hash = Some(content_hash(content));
        assert!(SpecStore::load(&source).is_ok());
    }
}
