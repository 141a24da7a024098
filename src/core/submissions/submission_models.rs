// Submission domain models - pure data, no transport dependencies.

use crate::core::gateway::{MediaKind, MediaRef, MessageRef};

/// A media payload riding along with a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: MediaKind,
    pub media: MediaRef,
}

/// Inbound event: a user privately submitted content for moderation.
#[derive(Debug, Clone)]
pub struct PrivateSubmission {
    pub submitter_id: u64,
    /// Display name, if the transport knows one. Shown to the reviewer.
    pub submitter_name: Option<String>,
    /// The submitter's original message; keys the submission so resending
    /// the same message is idempotent.
    pub origin_message: MessageRef,
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
}

/// A submission awaiting exactly one terminal approve/reject decision.
/// Lives in the registry from ingestion until that decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub key: String,
    pub submitter_id: u64,
    pub submitter_name: Option<String>,
    /// Already truncated to the configured limit.
    pub text: String,
    pub attachment: Option<Attachment>,
    pub contains_profanity: bool,
}

/// Registry key for a submission: deterministic per (submitter, origin
/// message), so a duplicate of the same origin collides instead of queuing
/// twice.
pub fn submission_key(submitter_id: u64, origin_message: MessageRef) -> String {
    format!("{submitter_id}:{}", origin_message.0)
}

/// Inbound event: a reviewer pressed approve or reject on a prompt.
#[derive(Debug, Clone)]
pub struct Decision {
    pub reviewer_id: u64,
    pub key: String,
    pub action: DecisionAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    Approve,
    Reject,
}

/// Terminal state of an ingested submission. Replies have already been
/// delivered by the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Submitter is muted; nothing was queued.
    Muted { remaining_secs: i64 },
    /// Queued and the reviewer was prompted.
    Queued { key: String },
    /// Same origin message was already queued; ignored.
    AlreadyQueued { key: String },
    /// The reviewer prompt could not be delivered, so the entry was
    /// withdrawn again.
    Withdrawn { key: String },
}

/// Terminal state of a decision event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    NotAuthorized,
    Published { message: MessageRef },
    /// Decision stands (the entry is resolved) but the publish delivery
    /// failed. Not retried.
    PublishFailed,
    Rejected,
    /// No pending submission under that key - already processed or expired.
    Stale,
}
