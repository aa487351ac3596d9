//! Access-review capability port (interface).

use crate::domain::{AccessReviewStatus, PermissionAttrs};
use crate::error::Result;

/// Port for SelfSubjectAccessReview calls against one context.
///
/// Review calls are idempotent and side-effect-free; callers may issue them
/// concurrently and repeat them freely.
pub trait AccessReviewClient: Send + Sync {
    /// Asks the cluster whether the current identity may perform the action
    /// described by `attrs`.
    fn create_self_subject_access_review(
        &self,
        attrs: &PermissionAttrs,
    ) -> impl std::future::Future<Output = Result<AccessReviewStatus>> + Send;
}
