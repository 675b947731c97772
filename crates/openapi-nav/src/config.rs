use serde::{Deserialize, Serialize};

/// Header the payment API reads its key from when the spec does not declare an `apiKey` scheme.
pub const DEFAULT_AUTH_HEADER: &str = "x-api-key";

/// Where the spec comes from and how strictly its content is pinned.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSource {
    /// Spec file path (JSON or YAML).
    pub spec: String,

    /// Optional content hash (`sha256:<hex>`) for version pinning.
    #[serde(default)]
    pub spec_hash: Option<String>,

    /// What to do when `spec_hash` does not match.
    #[serde(default)]
    pub spec_hash_policy: HashPolicy,
}

impl SpecSource {
    #[must_use]
    pub fn from_path(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            spec_hash: None,
            spec_hash_policy: HashPolicy::default(),
        }
    }
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log warning if hash doesn't match.
    #[default]
    Warn,
    /// Fail startup if hash doesn't match.
    Fail,
    /// Ignore hash verification.
    Ignore,
}

impl std::str::FromStr for HashPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!(
                "unknown hash policy '{other}' (expected warn, fail or ignore)"
            )),
        }
    }
}

/// How the overview describes authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthHint {
    /// Header used when the spec has no `apiKey` security scheme.
    pub header: String,
    /// Human-readable instructions for the caller.
    pub description: String,
}

impl Default for AuthHint {
    fn default() -> Self {
        Self {
            header: DEFAULT_AUTH_HEADER.to_string(),
            description: "Pass your Khipu API key in the x-api-key request header".to_string(),
        }
    }
}
