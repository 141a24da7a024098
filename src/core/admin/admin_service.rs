// Admin command surface - mute management driven by inbound admin events.
//
// Authorization fails closed: a non-admin issuer gets the same terse reply
// for every action, without learning which operations exist. The mute
// record is authoritative; the backend restriction call is best-effort and
// its failure never blocks the record from being written.

use crate::core::config::GatewayConfig;
use crate::core::gateway::{ChatRef, DeliveryOptions, MessageGateway};
use crate::core::mutes::{format_time_left, parse_duration, MuteService, MuteStore};
use std::sync::Arc;

// ============================================================================
// INBOUND EVENTS
// ============================================================================

/// An admin command event, as decoded by the transport.
#[derive(Debug, Clone)]
pub struct AdminCommand {
    pub issuer_id: u64,
    pub target_id: u64,
    pub action: AdminAction,
}

#[derive(Debug, Clone)]
pub enum AdminAction {
    /// Mute the target, e.g. `Mute { duration: "2h", reason: None }`.
    Mute {
        duration: String,
        reason: Option<String>,
    },
    Unmute,
    /// Report the target's current mute state.
    Stats,
}

/// What the command ended up doing. Replies have already been delivered;
/// this is for the transport's bookkeeping and for tests.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminOutcome {
    NotAuthorized,
    InvalidDuration,
    Muted { until: chrono::DateTime<chrono::Utc> },
    Unmuted,
    Stats { remaining_secs: i64 },
    /// The durable mute write failed; nothing was applied.
    StoreFailed,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct AdminService<S: MuteStore, G: MessageGateway> {
    mutes: Arc<MuteService<S>>,
    gateway: Arc<G>,
    config: Arc<GatewayConfig>,
}

impl<S: MuteStore, G: MessageGateway> AdminService<S, G> {
    pub fn new(mutes: Arc<MuteService<S>>, gateway: Arc<G>, config: Arc<GatewayConfig>) -> Self {
        Self {
            mutes,
            gateway,
            config,
        }
    }

    pub async fn handle_command(&self, cmd: AdminCommand) -> AdminOutcome {
        if !self.config.is_admin(cmd.issuer_id) {
            self.reply(cmd.issuer_id, "Admins only.").await;
            return AdminOutcome::NotAuthorized;
        }

        match cmd.action {
            AdminAction::Mute { duration, reason } => {
                self.handle_mute(cmd.issuer_id, cmd.target_id, &duration, reason)
                    .await
            }
            AdminAction::Unmute => self.handle_unmute(cmd.issuer_id, cmd.target_id).await,
            AdminAction::Stats => self.handle_stats(cmd.issuer_id, cmd.target_id).await,
        }
    }

    async fn handle_mute(
        &self,
        issuer_id: u64,
        target_id: u64,
        duration: &str,
        reason: Option<String>,
    ) -> AdminOutcome {
        let duration_secs = match parse_duration(duration) {
            Ok(secs) => secs,
            Err(_) => {
                self.reply(issuer_id, "Invalid duration. Examples: 10m, 2h, 1d, 1w")
                    .await;
                return AdminOutcome::InvalidDuration;
            }
        };

        let until = match self.mutes.mute_for(target_id, duration_secs).await {
            Ok(until) => until,
            Err(e) => {
                self.reply(issuer_id, &format!("❌ Failed to save mute state: {e}"))
                    .await;
                return AdminOutcome::StoreFailed;
            }
        };

        // Best-effort: the record above is what the workflows enforce.
        if let Err(e) = self
            .gateway
            .restrict_member(&self.config.group, target_id, false, Some(until))
            .await
        {
            tracing::warn!(target_id, "failed to restrict muted member: {e}");
        }

        let reason = reason.unwrap_or_else(|| "No reason given".to_string());
        self.reply(
            issuer_id,
            &format!(
                "✅ User {target_id} muted until {}. Reason: {reason}",
                until.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        )
        .await;
        AdminOutcome::Muted { until }
    }

    async fn handle_unmute(&self, issuer_id: u64, target_id: u64) -> AdminOutcome {
        if let Err(e) = self.mutes.unmute(target_id).await {
            self.reply(issuer_id, &format!("❌ Failed to save mute state: {e}"))
                .await;
            return AdminOutcome::StoreFailed;
        }

        if let Err(e) = self
            .gateway
            .restrict_member(&self.config.group, target_id, true, None)
            .await
        {
            tracing::warn!(target_id, "failed to unrestrict member: {e}");
        }

        self.reply(issuer_id, &format!("✅ User {target_id} unmuted."))
            .await;
        AdminOutcome::Unmuted
    }

    async fn handle_stats(&self, issuer_id: u64, target_id: u64) -> AdminOutcome {
        let remaining = match self.mutes.remaining(target_id).await {
            Ok(remaining) => remaining,
            Err(e) => {
                self.reply(issuer_id, &format!("❌ Failed to read mute state: {e}"))
                    .await;
                return AdminOutcome::StoreFailed;
            }
        };

        let state = if remaining > 0 {
            format!("yes, {}", format_time_left(remaining))
        } else {
            "no".to_string()
        };
        self.reply(issuer_id, &format!("User ID: {target_id}\nMuted: {state}"))
            .await;
        AdminOutcome::Stats {
            remaining_secs: remaining,
        }
    }

    async fn reply(&self, user_id: u64, text: &str) {
        if let Err(e) = self
            .gateway
            .deliver_text(&ChatRef::User(user_id), text, DeliveryOptions::default())
            .await
        {
            tracing::warn!(user_id, "failed to deliver admin reply: {e}");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::gateway::{GatewayEvent, InMemoryGateway};
    use crate::infra::mutes::InMemoryMuteStore;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn test_config() -> Arc<GatewayConfig> {
        Arc::new(GatewayConfig {
            admin_ids: HashSet::from([1, 2]),
            primary_reviewer: 1,
            channel: ChatRef::Channel("@channel".to_string()),
            group: ChatRef::Group(-100),
            max_text_len: 4000,
            mute_db_path: PathBuf::from("unused.json"),
            extra_bad_words: Vec::new(),
        })
    }

    fn build_service() -> (
        AdminService<InMemoryMuteStore, InMemoryGateway>,
        Arc<MuteService<InMemoryMuteStore>>,
        Arc<InMemoryGateway>,
    ) {
        let mutes = Arc::new(MuteService::new(InMemoryMuteStore::new()));
        let gateway = Arc::new(InMemoryGateway::new());
        let service = AdminService::new(Arc::clone(&mutes), Arc::clone(&gateway), test_config());
        (service, mutes, gateway)
    }

    fn mute_cmd(issuer_id: u64, target_id: u64, duration: &str) -> AdminCommand {
        AdminCommand {
            issuer_id,
            target_id,
            action: AdminAction::Mute {
                duration: duration.to_string(),
                reason: None,
            },
        }
    }

    #[tokio::test]
    async fn non_admin_gets_generic_refusal() {
        let (service, mutes, gateway) = build_service();

        let outcome = service.handle_command(mute_cmd(99, 7, "2h")).await;

        assert_eq!(outcome, AdminOutcome::NotAuthorized);
        assert_eq!(mutes.remaining(7).await.unwrap(), 0);
        assert_eq!(gateway.texts_to(&ChatRef::User(99)), vec!["Admins only."]);
    }

    #[tokio::test]
    async fn invalid_duration_changes_nothing() {
        let (service, mutes, gateway) = build_service();

        let outcome = service.handle_command(mute_cmd(1, 7, "2 fortnights")).await;

        assert_eq!(outcome, AdminOutcome::InvalidDuration);
        assert_eq!(mutes.remaining(7).await.unwrap(), 0);
        assert!(gateway.texts_to(&ChatRef::User(1))[0].contains("Invalid duration"));
    }

    #[tokio::test]
    async fn mute_writes_record_and_restricts() {
        let (service, mutes, gateway) = build_service();

        let outcome = service.handle_command(mute_cmd(1, 7, "2h")).await;

        let until = match outcome {
            AdminOutcome::Muted { until } => until,
            other => panic!("unexpected outcome: {other:?}"),
        };
        let remaining = mutes.remaining(7).await.unwrap();
        assert!((7195..=7200).contains(&remaining), "remaining = {remaining}");
        // Expired one second past the returned deadline.
        assert_eq!(
            mutes
                .remaining_at(7, until + chrono::Duration::seconds(1))
                .await
                .unwrap(),
            0
        );

        let restriction = gateway
            .events()
            .into_iter()
            .find_map(|e| match e {
                GatewayEvent::Restricted {
                    user_id,
                    can_post,
                    until,
                    ..
                } => Some((user_id, can_post, until)),
                _ => None,
            })
            .expect("no restriction requested");
        assert_eq!(restriction.0, 7);
        assert!(!restriction.1);
        assert_eq!(restriction.2, Some(until));
    }

    #[tokio::test]
    async fn restriction_failure_is_swallowed() {
        let (service, mutes, gateway) = build_service();
        gateway.fail_restrictions(true);

        let outcome = service.handle_command(mute_cmd(1, 7, "10m")).await;

        assert!(matches!(outcome, AdminOutcome::Muted { .. }));
        assert!(mutes.remaining(7).await.unwrap() > 0);
    }

    #[tokio::test]
    async fn unmute_clears_and_unrestricts() {
        let (service, mutes, gateway) = build_service();
        service.handle_command(mute_cmd(1, 7, "1d")).await;

        let outcome = service
            .handle_command(AdminCommand {
                issuer_id: 1,
                target_id: 7,
                action: AdminAction::Unmute,
            })
            .await;

        assert_eq!(outcome, AdminOutcome::Unmuted);
        assert_eq!(mutes.remaining(7).await.unwrap(), 0);
        let unrestricted = gateway.events().into_iter().any(|e| {
            matches!(
                e,
                GatewayEvent::Restricted {
                    user_id: 7,
                    can_post: true,
                    ..
                }
            )
        });
        assert!(unrestricted);
    }

    #[tokio::test]
    async fn stats_reports_remaining_time() {
        let (service, _, gateway) = build_service();
        service.handle_command(mute_cmd(1, 7, "2h")).await;

        let outcome = service
            .handle_command(AdminCommand {
                issuer_id: 2,
                target_id: 7,
                action: AdminAction::Stats,
            })
            .await;

        match outcome {
            AdminOutcome::Stats { remaining_secs } => assert!(remaining_secs > 0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let reply = gateway.texts_to(&ChatRef::User(2)).pop().unwrap();
        assert!(reply.contains("Muted: yes"), "reply = {reply}");
    }
}
