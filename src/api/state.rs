//! API shared state

use std::sync::Arc;

use crate::repository::Repository;
use crate::signature::SignatureKey;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Metric repository backing every route
    pub repository: Arc<Repository>,

    /// Shared secret for request signatures; `None` disables the check
    pub key: Option<SignatureKey>,
}

impl ApiState {
    pub fn new(repository: Arc<Repository>, key: Option<SignatureKey>) -> Self {
        Self { repository, key }
    }
}
