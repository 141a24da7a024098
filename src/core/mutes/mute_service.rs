// Mute subsystem - time-boxed revocation of a user's posting privilege.
//
// No transport code here. A mute is nothing but an expiry timestamp per
// user; absence or a past timestamp means "not muted". The store persists
// write-through so mutes survive restarts, and a failed durable write means
// the mutation did not happen.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum MuteError {
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Mute store write failed: {0}")]
    Persistence(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting mute expiries.
///
/// Implementations must persist synchronously on every mutation (write
/// through, no write-behind): when `set_muted_until` returns `Ok`, the
/// record is durable; when it returns `Err`, in-memory state must not have
/// changed either. Mutations on the same user must be atomic with respect
/// to each other.
#[async_trait]
pub trait MuteStore: Send + Sync {
    /// The stored expiry for a user, if any. May still be in the past;
    /// callers interpret that as "not muted".
    async fn muted_until(&self, user_id: u64) -> Result<Option<DateTime<Utc>>, MuteError>;

    /// Set (or overwrite) a user's mute expiry.
    async fn set_muted_until(&self, user_id: u64, until: DateTime<Utc>) -> Result<(), MuteError>;

    /// Remove a user's mute record. No-op if absent.
    async fn clear(&self, user_id: u64) -> Result<(), MuteError>;
}

// ============================================================================
// DURATION POLICY
// ============================================================================

/// Parse an admin-supplied duration like `10m`, `2h`, `1d`, `1w`.
///
/// A numeric magnitude followed by one unit letter, case-insensitive,
/// optional whitespace in between. Anything else is `InvalidDuration`.
pub fn parse_duration(raw: &str) -> Result<i64, MuteError> {
    let invalid = || MuteError::InvalidDuration(raw.to_string());

    let s = raw.trim();
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit())
        .filter(|&end| end > 0)
        .ok_or_else(invalid)?;
    let (magnitude, unit) = s.split_at(digits_end);

    let magnitude: i64 = magnitude.parse().map_err(|_| invalid())?;
    let multiplier = match unit.trim_start().to_ascii_lowercase().as_str() {
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        "w" => 604800,
        _ => return Err(invalid()),
    };

    magnitude.checked_mul(multiplier).ok_or_else(invalid)
}

/// Humanize a remaining-seconds count as `"2d 3h 5m"`, `"42s"` under a
/// minute, `"0s"` when nothing is left.
pub fn format_time_left(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }

    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }

    if parts.is_empty() {
        format!("{seconds}s")
    } else {
        parts.join(" ")
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Mute bookkeeping on top of a `MuteStore`.
pub struct MuteService<S: MuteStore> {
    store: S,
}

impl<S: MuteStore> MuteService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Seconds of mute remaining for a user; 0 when not muted.
    pub async fn remaining(&self, user_id: u64) -> Result<i64, MuteError> {
        self.remaining_at(user_id, Utc::now()).await
    }

    /// Like `remaining`, with an explicit clock for deterministic callers.
    pub async fn remaining_at(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<i64, MuteError> {
        let until = match self.store.muted_until(user_id).await? {
            Some(until) => until,
            None => return Ok(0),
        };
        Ok((until - now).num_seconds().max(0))
    }

    /// Mute a user for `duration_secs` from now. Overwrites any existing
    /// mute; there is no stacking. Returns the effective expiry.
    pub async fn mute_for(
        &self,
        user_id: u64,
        duration_secs: i64,
    ) -> Result<DateTime<Utc>, MuteError> {
        let until = Utc::now() + Duration::seconds(duration_secs);
        self.store.set_muted_until(user_id, until).await?;
        tracing::info!(user_id, %until, "user muted");
        Ok(until)
    }

    /// Lift a user's mute. No-op if they weren't muted.
    pub async fn unmute(&self, user_id: u64) -> Result<(), MuteError> {
        self.store.clear(user_id).await?;
        tracing::info!(user_id, "user unmuted");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing
    struct MockMuteStore {
        entries: DashMap<u64, DateTime<Utc>>,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl MockMuteStore {
        fn new() -> Self {
            Self {
                entries: DashMap::new(),
                fail_writes: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn failing(&self) -> bool {
            self.fail_writes.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MuteStore for MockMuteStore {
        async fn muted_until(&self, user_id: u64) -> Result<Option<DateTime<Utc>>, MuteError> {
            Ok(self.entries.get(&user_id).map(|e| *e))
        }

        async fn set_muted_until(
            &self,
            user_id: u64,
            until: DateTime<Utc>,
        ) -> Result<(), MuteError> {
            if self.failing() {
                return Err(MuteError::Persistence("disk full".to_string()));
            }
            self.entries.insert(user_id, until);
            Ok(())
        }

        async fn clear(&self, user_id: u64) -> Result<(), MuteError> {
            if self.failing() {
                return Err(MuteError::Persistence("disk full".to_string()));
            }
            self.entries.remove(&user_id);
            Ok(())
        }
    }

    #[test]
    fn duration_units_map_exactly() {
        assert_eq!(parse_duration("10m").unwrap(), 600);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("1d").unwrap(), 86400);
        assert_eq!(parse_duration("1w").unwrap(), 604800);
        assert_eq!(parse_duration("3W").unwrap(), 3 * 604800);
        assert_eq!(parse_duration("  2 H ").unwrap(), 7200);
    }

    #[test]
    fn malformed_durations_are_rejected() {
        for bad in ["", "h", "10", "10x", "x10m", "10mm", "-5m", "10m later", "1.5h"] {
            assert!(
                matches!(parse_duration(bad), Err(MuteError::InvalidDuration(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn time_left_formatting() {
        assert_eq!(format_time_left(0), "0s");
        assert_eq!(format_time_left(-5), "0s");
        assert_eq!(format_time_left(42), "42s");
        assert_eq!(format_time_left(7200), "2h");
        assert_eq!(format_time_left(90061), "1d 1h 1m");
    }

    #[tokio::test]
    async fn unmuted_user_has_zero_remaining() {
        let service = MuteService::new(MockMuteStore::new());
        assert_eq!(service.remaining(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mute_counts_down_and_expires() {
        let service = MuteService::new(MockMuteStore::new());

        let until = service.mute_for(7, 7200).await.unwrap();

        // Deterministic clocks derived from the returned expiry.
        let start = until - Duration::seconds(7200);
        assert_eq!(service.remaining_at(7, start).await.unwrap(), 7200);
        assert_eq!(
            service
                .remaining_at(7, until - Duration::seconds(10))
                .await
                .unwrap(),
            10
        );
        assert_eq!(service.remaining_at(7, until).await.unwrap(), 0);
        assert_eq!(
            service
                .remaining_at(7, until + Duration::seconds(1))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn remute_overwrites_instead_of_stacking() {
        let service = MuteService::new(MockMuteStore::new());

        service.mute_for(7, 3600).await.unwrap();
        let until = service.mute_for(7, 7200).await.unwrap();

        // The second mute replaced the first: exactly 7200s from its start.
        let start = until - Duration::seconds(7200);
        assert_eq!(service.remaining_at(7, start).await.unwrap(), 7200);
    }

    #[tokio::test]
    async fn unmute_clears_immediately() {
        let service = MuteService::new(MockMuteStore::new());
        service.mute_for(7, 3600).await.unwrap();
        service.unmute(7).await.unwrap();
        assert_eq!(service.remaining(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_write_surfaces_persistence_error() {
        let store = MockMuteStore::new();
        store
            .fail_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let service = MuteService::new(store);

        let err = service.mute_for(7, 3600).await.unwrap_err();
        assert!(matches!(err, MuteError::Persistence(_)));
        assert_eq!(service.remaining(7).await.unwrap(), 0);
    }
}
