// Anonymous group post workflow.
//
// Inline posts skip the approval queue: the mute and profanity gates run
// synchronously, the original request artifact is removed from the group,
// and an approved post is re-published anonymously carrying a retraction
// capability bound to the poster. Nothing about the poster is stored
// server-side; the capability in the delivered control is the only link
// back, and it is reconstructed from the inbound retraction event.

use crate::core::config::GatewayConfig;
use crate::core::gateway::{
    ChatRef, DeliveryOptions, MessageControl, MessageGateway, MessageRef,
};
use crate::core::mutes::{format_time_left, MuteError, MuteService, MuteStore};
use crate::core::profanity::ProfanityFilter;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

// ============================================================================
// CAPABILITY TOKEN
// ============================================================================

/// Permission to retract one anonymous post, bound to the poster identity.
///
/// Encoded as a plain `retract:<poster>:<ts>` payload. The transport carries
/// it opaquely; signing it (if the transport can be tampered with) is the
/// transport's concern, not this module's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetractionToken {
    pub poster_id: u64,
    pub issued_at: DateTime<Utc>,
}

impl RetractionToken {
    pub fn new(poster_id: u64) -> Self {
        Self {
            poster_id,
            issued_at: Utc::now(),
        }
    }

    pub fn payload(&self) -> String {
        format!("retract:{}:{}", self.poster_id, self.issued_at.timestamp())
    }

    /// Parse a payload previously produced by `payload`. Anything malformed
    /// is `None`; the transport drops such events.
    pub fn parse(payload: &str) -> Option<Self> {
        let rest = payload.strip_prefix("retract:")?;
        let (poster, issued) = rest.split_once(':')?;
        let poster_id = poster.parse::<u64>().ok()?;
        let issued_at = Utc
            .timestamp_opt(issued.parse::<i64>().ok()?, 0)
            .single()?;
        Some(Self {
            poster_id,
            issued_at,
        })
    }
}

// ============================================================================
// INBOUND EVENTS / OUTCOMES
// ============================================================================

/// Inbound event: a group member asked to post anonymously.
#[derive(Debug, Clone)]
pub struct GroupPostRequest {
    pub poster_id: u64,
    /// Display name, if known. Only ever shown to admins (profanity alert).
    pub poster_name: Option<String>,
    /// The member's own request message; always removed from the group.
    pub origin: MessageRef,
    pub text: String,
    /// Thread the anonymous post as a reply to this message.
    pub reply_to: Option<MessageRef>,
}

/// Inbound event: someone pressed the retraction control on a published
/// anonymous post.
#[derive(Debug, Clone)]
pub struct RetractionRequest {
    pub requester_id: u64,
    /// The published anonymous message to delete.
    pub target: MessageRef,
    /// The capability embedded in the control, as parsed by the transport.
    pub token: RetractionToken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnonPostOutcome {
    /// Nothing to publish; the transport answers with usage help.
    EmptyText,
    Muted { remaining_secs: i64 },
    /// Profanity: removed, admins alerted, generic group notice posted.
    RemovedProfanity,
    Published { message: MessageRef },
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetractionOutcome {
    Denied,
    Deleted,
    DeleteFailed,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct AnonPostService<S: MuteStore, G: MessageGateway> {
    mutes: Arc<MuteService<S>>,
    gateway: Arc<G>,
    filter: Arc<ProfanityFilter>,
    config: Arc<GatewayConfig>,
}

impl<S: MuteStore, G: MessageGateway> AnonPostService<S, G> {
    pub fn new(
        mutes: Arc<MuteService<S>>,
        gateway: Arc<G>,
        filter: Arc<ProfanityFilter>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            mutes,
            gateway,
            filter,
            config,
        }
    }

    pub async fn handle_post(
        &self,
        request: GroupPostRequest,
    ) -> Result<AnonPostOutcome, MuteError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Ok(AnonPostOutcome::EmptyText);
        }

        let remaining = self.mutes.remaining(request.poster_id).await?;
        if remaining > 0 {
            self.remove_origin(&request).await;
            // Generic notice: the group never learns who tried to post.
            self.announce(&format!(
                "⛔ User muted for {}.",
                format_time_left(remaining)
            ))
            .await;
            return Ok(AnonPostOutcome::Muted {
                remaining_secs: remaining,
            });
        }

        if self.filter.is_profane(text) {
            self.remove_origin(&request).await;
            let who = match &request.poster_name {
                Some(name) => format!("{name} ({})", request.poster_id),
                None => request.poster_id.to_string(),
            };
            let alert =
                format!("⚠️ Profanity detected and message deleted.\nFrom: {who}\nText: {text}");
            for &admin_id in &self.config.admin_ids {
                if let Err(e) = self
                    .gateway
                    .deliver_text(&ChatRef::User(admin_id), &alert, DeliveryOptions::default())
                    .await
                {
                    tracing::warn!(admin_id, "failed to alert admin: {e}");
                }
            }
            self.announce("🧹 Message removed by moderation.").await;
            return Ok(AnonPostOutcome::RemovedProfanity);
        }

        self.remove_origin(&request).await;

        let token = RetractionToken::new(request.poster_id);
        let options = DeliveryOptions {
            reply_to: request.reply_to,
            control: Some(MessageControl::Retraction {
                payload: token.payload(),
            }),
        };
        match self
            .gateway
            .deliver_text(&self.config.group, &format!("🕵️ Anonymous:\n{text}"), options)
            .await
        {
            Ok(message) => {
                tracing::info!(?message, "anonymous post published");
                Ok(AnonPostOutcome::Published { message })
            }
            Err(e) => {
                tracing::warn!("failed to publish anonymous post: {e}");
                self.notify(
                    request.poster_id,
                    "❌ Failed to publish your anonymous post.",
                )
                .await;
                Ok(AnonPostOutcome::PublishFailed)
            }
        }
    }

    /// Authorize and execute a retraction: only the original poster (via the
    /// embedded capability) or an admin may delete, and a denial is visible
    /// to the requester alone.
    pub async fn handle_retraction(&self, request: RetractionRequest) -> RetractionOutcome {
        let authorized = request.requester_id == request.token.poster_id
            || self.config.is_admin(request.requester_id);
        if !authorized {
            self.notify(
                request.requester_id,
                "❌ You are not allowed to delete this message.",
            )
            .await;
            return RetractionOutcome::Denied;
        }

        match self
            .gateway
            .delete_message(&self.config.group, request.target)
            .await
        {
            Ok(()) => {
                tracing::info!(target = ?request.target, "anonymous post retracted");
                RetractionOutcome::Deleted
            }
            Err(e) => {
                self.notify(request.requester_id, &format!("❌ Failed to delete: {e}"))
                    .await;
                RetractionOutcome::DeleteFailed
            }
        }
    }

    /// Remove the member's request artifact from the group. Best-effort;
    /// a failure leaves a stray command message behind, nothing worse.
    async fn remove_origin(&self, request: &GroupPostRequest) {
        if let Err(e) = self
            .gateway
            .delete_message(&self.config.group, request.origin)
            .await
        {
            tracing::warn!(origin = ?request.origin, "failed to remove request artifact: {e}");
        }
    }

    async fn announce(&self, text: &str) {
        if let Err(e) = self
            .gateway
            .deliver_text(&self.config.group, text, DeliveryOptions::default())
            .await
        {
            tracing::warn!("failed to deliver group notice: {e}");
        }
    }

    async fn notify(&self, user_id: u64, text: &str) {
        if let Err(e) = self
            .gateway
            .deliver_text(&ChatRef::User(user_id), text, DeliveryOptions::default())
            .await
        {
            tracing::warn!(user_id, "failed to notify user: {e}");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
