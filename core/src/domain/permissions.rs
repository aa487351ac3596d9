//! Access-review queries and per-resource verdicts.

use serde::{Deserialize, Serialize};

/// Wildcard value accepted for `group` and `resource` in review attributes.
pub const WILDCARD: &str = "*";

/// A single access-review query shape, matching the `resourceAttributes`
/// of a SelfSubjectAccessReview.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionAttrs {
    /// Namespace to review against; `None` reviews cluster-wide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// API group, or `"*"` for any.
    pub group: String,
    /// Resource plural name, or `"*"` for any.
    pub resource: String,
    /// Verb being reviewed (e.g. "watch", "list", "delete").
    pub verb: String,
}

impl PermissionAttrs {
    /// Creates cluster-wide review attributes.
    pub fn new(group: &str, resource: &str, verb: &str) -> Self {
        Self {
            namespace: None,
            group: group.to_string(),
            resource: resource.to_string(),
            verb: verb.to_string(),
        }
    }

    /// Scopes the review to one namespace.
    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Wildcard attributes: "can I `verb` any resource of any group".
    pub fn wildcard(verb: &str) -> Self {
        Self::new(WILDCARD, WILDCARD, verb)
    }
}

/// One review query plus the concrete resource names its verdict applies to.
///
/// `on_deny_requests` nests narrower queries evaluated after this one; an
/// override's verdict replaces the parent's for exactly the resource names
/// the override lists. Overrides refine a verdict, they never broaden the
/// set of names the tree covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// The review query.
    pub attrs: PermissionAttrs,
    /// Concrete resource names this query's verdict is attributed to.
    pub resources: Vec<String>,
    /// Narrower override queries for subsets of `resources`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_deny_requests: Vec<PermissionRequest>,
}

impl PermissionRequest {
    /// Creates a request with no overrides.
    pub fn new(attrs: PermissionAttrs, resources: Vec<String>) -> Self {
        Self {
            attrs,
            resources,
            on_deny_requests: Vec::new(),
        }
    }

    /// Attaches override requests.
    pub fn with_on_deny_requests(mut self, overrides: Vec<PermissionRequest>) -> Self {
        self.on_deny_requests = overrides;
        self
    }
}

/// Status portion of a SelfSubjectAccessReview response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessReviewStatus {
    /// Whether the reviewed action is allowed.
    pub allowed: bool,
    /// Explicit denial; forces the final verdict to denied even when
    /// `allowed` is also set.
    #[serde(default)]
    pub denied: bool,
    /// Human-readable explanation from the reviewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessReviewStatus {
    /// An allowed status without a reason.
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            denied: false,
            reason: None,
        }
    }

    /// A denied status with the given reason.
    pub fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            denied: true,
            reason: Some(reason.to_string()),
        }
    }

    /// Final verdict: allowed and not explicitly denied.
    pub fn permitted(&self) -> bool {
        self.allowed && !self.denied
    }
}

/// Final, resolved verdict for exactly one resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResourcePermission {
    /// The attributes of the query that produced this verdict.
    pub attrs: PermissionAttrs,
    /// Whether the current identity may act on the resource.
    pub permitted: bool,
    /// Explanation, if the reviewer or an error supplied one.
    pub reason: Option<String>,
}

/// Emitted once per resolved request node (top-level and each override).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResult {
    /// Attributes of the resolved query.
    pub attrs: PermissionAttrs,
    /// Resource names the verdict was attributed to.
    pub resources: Vec<String>,
    /// The resolved verdict.
    pub permitted: bool,
    /// Explanation, if any.
    pub reason: Option<String>,
}
