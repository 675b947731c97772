//! Local `$ref` resolver.
//!
//! Inlines every `{"$ref": "#/..."}` node reachable from a starting node by following the pointer
//! into the root document, recursively. Resolution never fails: a pointer that cannot be followed
//! (missing segment, scalar intermediate, external document) or that re-enters a reference already
//! being expanded becomes `null` in place, and the rest of the tree is still returned.
//!
//! Only same-document refs are supported; `other.yaml#/...` and URL refs resolve to `null`.
//!
//! Shared refs are expanded once per call and reused. The output is capped at
//! [`MAX_RESOLVED_NODES`] nodes, since shared acyclic refs can still inline to a tree exponential in
//! the size of the document.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Maximum number of nested reference expansions along a single path.
pub const MAX_RESOLVE_DEPTH: usize = 64;

/// Maximum number of JSON nodes one `resolve` call may produce. Everything past the limit is
/// `null`.
pub const MAX_RESOLVED_NODES: usize = 250_000;

/// Resolve every reference reachable from `node` against `root`.
#[must_use]
pub fn resolve(node: &Value, root: &Value) -> Value {
    RefResolver::new(root).resolve(node)
}

#[derive(Debug, Clone, Copy)]
pub struct RefResolver<'a> {
    root: &'a Value,
    max_depth: usize,
    max_nodes: usize,
}

/// Per-call state.
struct Expansion {
    /// Pointers currently being expanded, outermost first.
    chain: Vec<String>,
    /// Finished expansions that never hit the cycle guard or a limit, with their node counts.
    cache: HashMap<String, (Value, usize)>,
    budget: usize,
    limit: usize,
    /// Bumped whenever a subtree is cut short; expansions that saw a bump are not cached.
    truncations: usize,
    exhausted: bool,
}

impl Expansion {
    fn new(limit: usize) -> Self {
        Self {
            chain: Vec::new(),
            cache: HashMap::new(),
            budget: limit,
            limit,
            truncations: 0,
            exhausted: false,
        }
    }

    fn charge(&mut self, nodes: usize) -> bool {
        if nodes <= self.budget {
            self.budget -= nodes;
            return true;
        }
        if !self.exhausted {
            tracing::warn!(
                limit = self.limit,
                "resolved $ref tree exceeds node limit; substituting null"
            );
            self.exhausted = true;
        }
        self.budget = 0;
        self.truncations += 1;
        false
    }
}

impl<'a> RefResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            max_depth: MAX_RESOLVE_DEPTH,
            max_nodes: MAX_RESOLVED_NODES,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Return an independent copy of `node` with all references inlined.
    #[must_use]
    pub fn resolve(&self, node: &Value) -> Value {
        let mut state = Expansion::new(self.max_nodes);
        self.resolve_node(node, &mut state)
    }

    fn resolve_node(&self, node: &Value, st: &mut Expansion) -> Value {
        if let Value::Object(obj) = node
            && let Some(pointer) = reference_pointer(obj)
        {
            return self.expand(pointer, st);
        }
        if !st.charge(1) {
            return Value::Null;
        }
        match node {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_node(item, st))
                    .collect(),
            ),
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_node(v, st)))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    fn expand(&self, pointer: &str, st: &mut Expansion) -> Value {
        if let Some(nodes) = st.cache.get(pointer).map(|(_, nodes)| *nodes) {
            if !st.charge(nodes) {
                return Value::Null;
            }
            return st
                .cache
                .get(pointer)
                .map_or(Value::Null, |(value, _)| value.clone());
        }

        if st.chain.iter().any(|p| p == pointer) {
            tracing::debug!(pointer, "cyclic $ref; substituting null");
            st.truncations += 1;
            return Value::Null;
        }
        if st.chain.len() >= self.max_depth {
            tracing::warn!(
                pointer,
                depth = st.chain.len(),
                "$ref nesting exceeds limit; substituting null"
            );
            st.truncations += 1;
            return Value::Null;
        }

        let Some(target) = lookup_pointer(self.root, pointer) else {
            tracing::debug!(pointer, "unresolved $ref; substituting null");
            return Value::Null;
        };

        let truncations = st.truncations;
        let budget = st.budget;
        st.chain.push(pointer.to_string());
        let resolved = self.resolve_node(target, st);
        st.chain.pop();

        // A clean expansion reaches no cycle, so it is the same wherever the pointer appears.
        if st.truncations == truncations {
            st.cache
                .insert(pointer.to_string(), (resolved.clone(), budget - st.budget));
        }
        resolved
    }
}

/// The pointer of a reference node, if `obj` is one.
///
/// Sibling keys next to `$ref` are ignored; a non-string `$ref` is an ordinary member.
#[must_use]
pub fn reference_pointer(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("$ref").and_then(Value::as_str)
}

/// Follow a `#/a/b/c` pointer into `root`.
///
/// Segments are unescaped (`~1` → `/`, `~0` → `~`). Arrays are indexed by decimal segment.
#[must_use]
pub fn lookup_pointer<'v>(root: &'v Value, pointer: &str) -> Option<&'v Value> {
    let path = pointer.strip_prefix("#/")?;

    let mut current = root;
    for raw in path.split('/') {
        let segment = unescape_segment(raw);
        current = match current {
            Value::Object(map) => map.get(segment.as_ref())?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn unescape_segment(raw: &str) -> Cow<'_, str> {
    if raw.contains('~') {
        Cow::Owned(raw.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Whether any reference node is reachable from `node`.
#[must_use]
pub fn contains_reference(node: &Value) -> bool {
    match node {
        Value::Array(items) => items.iter().any(contains_reference),
        Value::Object(obj) => {
            reference_pointer(obj).is_some() || obj.values().any(contains_reference)
        }
        _ => false,
    }
}
