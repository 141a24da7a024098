// The gateway port - how the core talks to the messaging backend.
//
// The core never imports a chat SDK. Everything it needs from the outside
// world is behind this trait: deliver a message, delete a message, restrict
// a member. The host binary implements it against the real backend; tests
// use the in-memory implementation in `infra::gateway`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A place a message can be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatRef {
    /// A group chat, by numeric id.
    Group(i64),
    /// A broadcast channel, by public handle (e.g. `@announcements`).
    Channel(String),
    /// A direct conversation with a single user.
    User(u64),
}

/// Opaque reference to a delivered message, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i64);

/// Opaque reference to a media payload held by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef(pub String);

/// The media kinds the publish path has to preserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// A remote call to the backend failed. Never retried by the core.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Extra delivery parameters for text messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryOptions {
    /// Thread the delivered message as a reply to this one.
    pub reply_to: Option<MessageRef>,
    /// Interactive control to attach to the delivered message.
    pub control: Option<MessageControl>,
}

impl DeliveryOptions {
    pub fn with_control(control: MessageControl) -> Self {
        Self {
            reply_to: None,
            control: Some(control),
        }
    }
}

/// Interactive controls the transport renders as buttons on a message.
///
/// The core only decides *which* control a message carries and what data it
/// embeds; rendering and event routing are transport concerns.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageControl {
    /// Approve/reject pair for a pending submission, keyed by its registry
    /// key. The profanity flag lets the transport mark the approve button.
    Moderation {
        key: String,
        contains_profanity: bool,
    },
    /// Retraction capability for an anonymously published message. The
    /// payload round-trips through the transport untouched and comes back
    /// inside a `RetractionRequest`.
    Retraction { payload: String },
}

/// Port to the messaging backend.
///
/// All calls are bounded-latency, fallible, and never retried here. Callers
/// must not hold any internal lock across these awaits.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Deliver a text message. Returns the backend's reference to it.
    async fn deliver_text(
        &self,
        recipient: &ChatRef,
        text: &str,
        options: DeliveryOptions,
    ) -> Result<MessageRef, DeliveryError>;

    /// Deliver a media payload with an optional caption.
    async fn deliver_media(
        &self,
        recipient: &ChatRef,
        kind: MediaKind,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<MessageRef, DeliveryError>;

    /// Delete a previously delivered message.
    async fn delete_message(&self, chat: &ChatRef, message: MessageRef)
        -> Result<(), DeliveryError>;

    /// Allow or revoke a member's ability to post in a group, optionally
    /// until a given time. Best-effort: callers swallow failures.
    async fn restrict_member(
        &self,
        group: &ChatRef,
        user_id: u64,
        can_post: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), DeliveryError>;
}
