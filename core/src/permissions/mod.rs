//! Per-context permission resolution.
//!
//! Bulk Kubernetes authorization reviews are wildcard-only ("can I watch any
//! resource of any group"), but callers need per-object answers: secrets in
//! one namespace may be denied while configmaps are allowed even though both
//! matched the same wildcard watch permission. The checker resolves one
//! coarse query plus a tree of narrower overrides into a flat verdict map,
//! one entry per concrete resource name.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::{
    ClusterContext, ContextResourcePermission, PermissionRequest, PermissionResult,
};
use crate::error::Result;
use crate::events::{EventEmitter, Subscription};
use crate::ports::AccessReviewClient;

/// Lifecycle of one checker run. There is no partial or cancelled state;
/// `start()` always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    Created,
    Running,
    Resolved,
}

/// Resolves an access-control query tree into per-resource verdicts for one
/// context, notifying subscribers as each node resolves.
pub struct ContextPermissionsChecker<A: AccessReviewClient> {
    context: ClusterContext,
    client: A,
    request: PermissionRequest,
    permissions: RwLock<HashMap<String, ContextResourcePermission>>,
    state: RwLock<CheckerState>,
    on_permission_result: EventEmitter<PermissionResult>,
}

impl<A: AccessReviewClient> ContextPermissionsChecker<A> {
    /// Creates a checker for the given request tree.
    pub fn new(context: ClusterContext, client: A, request: PermissionRequest) -> Self {
        Self {
            context,
            client,
            request,
            permissions: RwLock::new(HashMap::new()),
            state: RwLock::new(CheckerState::Created),
            on_permission_result: EventEmitter::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CheckerState {
        *self.state.read()
    }

    /// Resolves the whole request tree.
    ///
    /// Nodes are evaluated through an explicit work-list in breadth-first
    /// declaration order, so an arbitrarily deep override hierarchy cannot
    /// exhaust the call stack and overlapping overrides resolve
    /// deterministically (the later-declared one wins).
    ///
    /// A failed review call resolves its node fail-closed: every resource
    /// name in that node gets `permitted: false` with the error as the
    /// reason. "Couldn't ask" is never treated as "allowed".
    pub async fn start(&self) -> Result<()> {
        *self.state.write() = CheckerState::Running;

        let mut queue: VecDeque<PermissionRequest> = VecDeque::new();
        queue.push_back(self.request.clone());

        while let Some(node) = queue.pop_front() {
            let (permitted, reason) = match self
                .client
                .create_self_subject_access_review(&node.attrs)
                .await
            {
                Ok(status) => (status.permitted(), status.reason),
                Err(e) => {
                    warn!(
                        context = %self.context,
                        resource = %node.attrs.resource,
                        verb = %node.attrs.verb,
                        error = %e,
                        "access review failed, resolving as denied"
                    );
                    (false, Some(format!("access review failed: {e}")))
                }
            };

            debug!(
                context = %self.context,
                group = %node.attrs.group,
                resource = %node.attrs.resource,
                verb = %node.attrs.verb,
                permitted,
                names = node.resources.len(),
                "permission node resolved"
            );

            {
                let mut permissions = self.permissions.write();
                for name in &node.resources {
                    permissions.insert(
                        name.clone(),
                        ContextResourcePermission {
                            attrs: node.attrs.clone(),
                            permitted,
                            reason: reason.clone(),
                        },
                    );
                }
            }

            self.on_permission_result.emit(&PermissionResult {
                attrs: node.attrs.clone(),
                resources: node.resources.clone(),
                permitted,
                reason,
            });

            queue.extend(node.on_deny_requests.into_iter());
        }

        *self.state.write() = CheckerState::Resolved;
        Ok(())
    }

    /// Snapshot of the current verdict map. Empty before `start()`.
    pub fn get_permissions(&self) -> HashMap<String, ContextResourcePermission> {
        self.permissions.read().clone()
    }

    /// Subscribes to per-node resolution events. Subscribers see the coarse
    /// decision and each refinement as it becomes available, not only the
    /// final state.
    pub fn on_permission_result<F>(&self, listener: F) -> Subscription<PermissionResult>
    where
        F: Fn(&PermissionResult) + Send + Sync + 'static,
    {
        self.on_permission_result.subscribe(listener)
    }
}
