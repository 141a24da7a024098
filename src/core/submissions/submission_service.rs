// Submission workflow - the moderation state machine for private DMs.
//
// Received -> Classified -> AwaitingDecision -> {Published, Rejected}.
// AwaitingDecision is the only non-terminal resting state and is
// represented purely by registry membership. Approval publishes at most
// once: a delivery failure after the decision is reported, never retried,
// and never re-queues the submission.

use super::submission_models::{
    submission_key, Decision, DecisionAction, DecisionOutcome, PendingSubmission,
    PrivateSubmission, SubmissionOutcome,
};
use super::submission_registry::{RegistryError, SubmissionRegistry};
use crate::core::config::GatewayConfig;
use crate::core::gateway::{
    ChatRef, DeliveryOptions, MessageControl, MessageGateway, MessageRef,
};
use crate::core::mutes::{format_time_left, MuteError, MuteService, MuteStore};
use crate::core::profanity::ProfanityFilter;
use std::sync::Arc;

pub struct SubmissionService<S, R, G>
where
    S: MuteStore,
    R: SubmissionRegistry,
    G: MessageGateway,
{
    mutes: Arc<MuteService<S>>,
    registry: Arc<R>,
    gateway: Arc<G>,
    filter: Arc<ProfanityFilter>,
    config: Arc<GatewayConfig>,
}

impl<S, R, G> SubmissionService<S, R, G>
where
    S: MuteStore,
    R: SubmissionRegistry,
    G: MessageGateway,
{
    pub fn new(
        mutes: Arc<MuteService<S>>,
        registry: Arc<R>,
        gateway: Arc<G>,
        filter: Arc<ProfanityFilter>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            mutes,
            registry,
            gateway,
            filter,
            config,
        }
    }

    /// Ingest a private submission: mute gate, classify, queue, prompt the
    /// reviewer. All user-visible replies are delivered here.
    pub async fn handle_submission(
        &self,
        submission: PrivateSubmission,
    ) -> Result<SubmissionOutcome, MuteError> {
        let remaining = self.mutes.remaining(submission.submitter_id).await?;
        if remaining > 0 {
            self.reply(
                submission.submitter_id,
                &format!("⛔ You are muted. Time left: {}", format_time_left(remaining)),
            )
            .await;
            return Ok(SubmissionOutcome::Muted {
                remaining_secs: remaining,
            });
        }

        let text = truncate_chars(
            submission.text.as_deref().unwrap_or("").trim(),
            self.config.max_text_len,
        );
        let contains_profanity = self.filter.is_profane(&text);
        let key = submission_key(submission.submitter_id, submission.origin_message);

        let pending = PendingSubmission {
            key: key.clone(),
            submitter_id: submission.submitter_id,
            submitter_name: submission.submitter_name.clone(),
            text,
            attachment: submission.attachment,
            contains_profanity,
        };

        match self.registry.register(pending.clone()).await {
            Ok(()) => {}
            Err(RegistryError::DuplicateKey(_)) => {
                tracing::debug!(%key, "duplicate submission ignored");
                return Ok(SubmissionOutcome::AlreadyQueued { key });
            }
            Err(RegistryError::NotFound(_)) => unreachable!("register never reports NotFound"),
        }

        let prompt = moderation_prompt(&pending);
        let control = MessageControl::Moderation {
            key: key.clone(),
            contains_profanity,
        };
        let reviewer = ChatRef::User(self.config.primary_reviewer);
        if let Err(e) = self
            .gateway
            .deliver_text(&reviewer, &prompt, DeliveryOptions::with_control(control))
            .await
        {
            // Withdraw the entry: nobody will ever decide on a prompt that
            // was never seen.
            tracing::warn!(%key, "failed to deliver moderation prompt: {e}");
            let _ = self.registry.resolve(&key).await;
            self.reply(
                submission.submitter_id,
                "❌ Could not reach a reviewer. Please try again later.",
            )
            .await;
            return Ok(SubmissionOutcome::Withdrawn { key });
        }

        self.reply(
            submission.submitter_id,
            "✅ Sent for moderation. Please wait for admin review.",
        )
        .await;
        Ok(SubmissionOutcome::Queued { key })
    }

    /// Apply a reviewer's approve/reject decision.
    pub async fn handle_decision(&self, decision: Decision) -> DecisionOutcome {
        if !self.config.is_admin(decision.reviewer_id) {
            self.reply(decision.reviewer_id, "Admins only.").await;
            return DecisionOutcome::NotAuthorized;
        }

        // Resolving removes the entry first, so a concurrent double-tap
        // sees Stale and nothing publishes twice.
        let pending = match self.registry.resolve(&decision.key).await {
            Ok(pending) => pending,
            Err(_) => {
                self.reply(
                    decision.reviewer_id,
                    "⚠️ Request already processed or expired.",
                )
                .await;
                return DecisionOutcome::Stale;
            }
        };

        match decision.action {
            DecisionAction::Approve => self.publish(decision.reviewer_id, pending).await,
            DecisionAction::Reject => {
                tracing::info!(key = %decision.key, "submission rejected");
                self.reply(decision.reviewer_id, "🚫 Rejected.").await;
                DecisionOutcome::Rejected
            }
        }
    }

    async fn publish(&self, reviewer_id: u64, pending: PendingSubmission) -> DecisionOutcome {
        let caption = (!pending.text.is_empty()).then_some(pending.text.as_str());
        let delivered: Result<MessageRef, _> = match &pending.attachment {
            Some(attachment) => {
                self.gateway
                    .deliver_media(
                        &self.config.channel,
                        attachment.kind,
                        &attachment.media,
                        caption,
                    )
                    .await
            }
            None => {
                let body = caption.unwrap_or("(empty message)");
                self.gateway
                    .deliver_text(&self.config.channel, body, DeliveryOptions::default())
                    .await
            }
        };

        match delivered {
            Ok(message) => {
                tracing::info!(key = %pending.key, "submission published");
                self.reply(reviewer_id, "✅ Published to channel.").await;
                DecisionOutcome::Published { message }
            }
            Err(e) => {
                // At-most-once: the entry stays resolved, no retry.
                tracing::warn!(key = %pending.key, "publish failed: {e}");
                self.reply(reviewer_id, &format!("❌ Error publishing: {e}"))
                    .await;
                DecisionOutcome::PublishFailed
            }
        }
    }

    async fn reply(&self, user_id: u64, text: &str) {
        if let Err(e) = self
            .gateway
            .deliver_text(&ChatRef::User(user_id), text, DeliveryOptions::default())
            .await
        {
            tracing::warn!(user_id, "failed to deliver reply: {e}");
        }
    }
}

/// What the reviewer sees for a pending submission.
fn moderation_prompt(pending: &PendingSubmission) -> String {
    let mut header = format!("👤 From ID: {}", pending.submitter_id);
    if let Some(name) = &pending.submitter_name {
        header.push_str(&format!("\nName: {name}"));
    }
    let mut preview = if pending.text.is_empty() {
        "(no text)".to_string()
    } else {
        format!("Text:\n{}", pending.text)
    };
    if let Some(attachment) = &pending.attachment {
        preview.push_str(&format!("\n📎 With {} attached", attachment.kind));
    }
    format!("{header}\n\n{preview}")
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
