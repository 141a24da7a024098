// The pending submission registry port.
//
// In-memory by default (see `infra::submissions`): a process restart drops
// in-flight moderation requests. That is accepted; anything persistent can
// be slotted in behind this trait without touching the workflows.

use super::submission_models::PendingSubmission;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The same origin was already submitted. Callers treat this as
    /// "already queued", not as a failure.
    #[error("Submission {0} is already awaiting review")]
    DuplicateKey(String),

    /// Nothing pending under that key. The expected, non-exceptional path
    /// when a reviewer double-taps or acts on a stale prompt.
    #[error("No pending submission under key {0}")]
    NotFound(String),
}

/// Map of outstanding moderation requests.
///
/// `register` and `resolve` on the same key must be atomic with respect to
/// each other: of two concurrent `resolve` calls exactly one may succeed.
#[async_trait]
pub trait SubmissionRegistry: Send + Sync {
    /// Add a submission under its key. Fails with `DuplicateKey` if one is
    /// already pending.
    async fn register(&self, submission: PendingSubmission) -> Result<(), RegistryError>;

    /// Remove and return the submission under `key`. Each key resolves at
    /// most once.
    async fn resolve(&self, key: &str) -> Result<PendingSubmission, RegistryError>;

    /// Number of submissions currently awaiting a decision.
    async fn pending_count(&self) -> usize;
}
