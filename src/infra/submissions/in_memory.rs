// In-memory pending submission registry.
//
// This is the production default: in-flight moderation requests simply die
// with the process. DashMap gives the per-key atomicity the contract asks
// for - of two concurrent resolves on one key, exactly one wins the remove.
//
// An optional TTL evicts entries no reviewer ever acted on; eviction is
// lazy (checked at access time), so an expired entry behaves exactly like
// an already-resolved one.

use crate::core::submissions::{PendingSubmission, RegistryError, SubmissionRegistry};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct StoredEntry {
    submission: PendingSubmission,
    registered_at: Instant,
}

#[derive(Default)]
pub struct InMemorySubmissionRegistry {
    entries: DashMap<String, StoredEntry>,
    ttl: Option<Duration>,
}

impl InMemorySubmissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose entries expire `ttl` after registration.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    fn expired(&self, entry: &StoredEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.registered_at.elapsed() >= ttl,
            None => false,
        }
    }
}

#[async_trait]
impl SubmissionRegistry for InMemorySubmissionRegistry {
    async fn register(&self, submission: PendingSubmission) -> Result<(), RegistryError> {
        let stored = StoredEntry {
            submission,
            registered_at: Instant::now(),
        };
        match self.entries.entry(stored.submission.key.clone()) {
            Entry::Occupied(mut occupied) => {
                if self.expired(occupied.get()) {
                    occupied.insert(stored);
                    Ok(())
                } else {
                    Err(RegistryError::DuplicateKey(occupied.key().clone()))
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(stored);
                Ok(())
            }
        }
    }

    async fn resolve(&self, key: &str) -> Result<PendingSubmission, RegistryError> {
        match self.entries.remove(key) {
            Some((_, entry)) if !self.expired(&entry) => Ok(entry.submission),
            // An expired entry is gone either way; dropping it here is the
            // lazy eviction.
            Some(_) | None => Err(RegistryError::NotFound(key.to_string())),
        }
    }

    async fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !self.expired(entry.value()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn submission(key: &str, text: &str) -> PendingSubmission {
        PendingSubmission {
            key: key.to_string(),
            submitter_id: 42,
            submitter_name: None,
            text: text.to_string(),
            attachment: None,
            contains_profanity: false,
        }
    }

    #[tokio::test]
    async fn register_then_resolve_returns_the_submission() {
        let registry = InMemorySubmissionRegistry::new();
        registry.register(submission("42:1", "hello")).await.unwrap();

        let resolved = registry.resolve("42:1").await.unwrap();
        assert_eq!(resolved.text, "hello");

        assert_eq!(
            registry.resolve("42:1").await.unwrap_err(),
            RegistryError::NotFound("42:1".to_string())
        );
    }

    #[tokio::test]
    async fn duplicate_register_keeps_the_first() {
        let registry = InMemorySubmissionRegistry::new();
        registry.register(submission("42:1", "first")).await.unwrap();

        assert_eq!(
            registry.register(submission("42:1", "second")).await,
            Err(RegistryError::DuplicateKey("42:1".to_string()))
        );
        assert_eq!(registry.resolve("42:1").await.unwrap().text, "first");
    }

    #[tokio::test]
    async fn concurrent_resolves_yield_exactly_one_winner() {
        let registry = Arc::new(InMemorySubmissionRegistry::new());
        registry.register(submission("42:1", "hello")).await.unwrap();

        let a = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.resolve("42:1").await })
        };
        let b = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.resolve("42:1").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "results = {results:?}");
        assert_eq!(registry.pending_count().await, 0);
    }

    #[tokio::test]
    async fn ttl_evicts_stale_entries() {
        let registry = InMemorySubmissionRegistry::with_ttl(Duration::from_millis(10));
        registry.register(submission("42:1", "hello")).await.unwrap();
        assert_eq!(registry.pending_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(registry.pending_count().await, 0);
        assert_eq!(
            registry.resolve("42:1").await.unwrap_err(),
            RegistryError::NotFound("42:1".to_string())
        );

        // The slot is free again after expiry.
        registry.register(submission("42:1", "again")).await.unwrap();
        assert_eq!(registry.resolve("42:1").await.unwrap().text, "again");
    }
}
