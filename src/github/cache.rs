//! Short-lived cache of aggregated pull request listings.
//!
//! Entries are keyed by a SHA-256 digest of the credential, the organization
//! scope and the repository scope, so the token itself is never held as a
//! map key. The cache is an injected value rather than process state; share
//! it between aggregators with an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::debug;

use super::error::FetchError;
use super::models::PullRequest;
use super::scope::{OrganizationScope, PersonalAccessToken, RepositoryScope};

/// Time-to-live applied when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Deterministic cache key for one credential and scope combination.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for `repositories` under the given credential and
    /// organization scope.
    #[must_use]
    pub fn derive(
        token: &PersonalAccessToken,
        organizations: &OrganizationScope,
        repositories: &RepositoryScope,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.value().as_bytes());
        hasher.update([0]);
        hasher.update(organizations.normalised().as_bytes());
        hasher.update([0]);
        hasher.update(repositories.normalised().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Key of the "all repositories" listing for the same credential and
    /// organizations.
    #[must_use]
    pub fn all_repositories(token: &PersonalAccessToken, organizations: &OrganizationScope) -> Self {
        Self::derive(token, organizations, &RepositoryScope::all())
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("CacheKey")
            .field(&self.0.get(..12).unwrap_or(&self.0))
            .finish()
    }
}

struct CachedListing {
    pull_requests: Vec<PullRequest>,
    stored_at: Instant,
}

type Slot = Arc<AsyncMutex<Option<CachedListing>>>;

/// TTL cache of pull request listings with per-key single-flight loading.
pub struct PullRequestCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl Default for PullRequestCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl PullRequestCache {
    /// Creates an empty cache whose entries expire `ttl` after being written.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the slot for `key`, creating it when absent.
    ///
    /// Creating a slot first drops every slot that holds no fresh listing and
    /// is not in use, so the map only grows with live entries.
    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        let before = slots.len();
        slots.retain(|_, slot| !self.is_reclaimable(slot));
        let pruned = before.saturating_sub(slots.len());
        if pruned > 0 {
            debug!(pruned, "pruned stale cache slots");
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn existing_slot(&self, key: &CacheKey) -> Option<Slot> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// A slot may be dropped when only the map references it and it holds
    /// nothing fresh.
    fn is_reclaimable(&self, slot: &Slot) -> bool {
        Arc::strong_count(slot) == 1
            && slot
                .try_lock()
                .is_ok_and(|entry| self.fresh(entry.as_ref()).is_none())
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn fresh<'a>(&self, entry: Option<&'a CachedListing>) -> Option<&'a CachedListing> {
        entry.filter(|listing| listing.stored_at.elapsed() < self.ttl)
    }

    /// Returns the unexpired listing stored under `key`.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<PullRequest>> {
        let slot = self.existing_slot(key)?;
        let entry = slot.lock().await;
        self.fresh(entry.as_ref())
            .map(|listing| listing.pull_requests.clone())
    }

    /// Stores `pull_requests` under `key`, replacing any previous entry.
    pub async fn put(&self, key: &CacheKey, pull_requests: Vec<PullRequest>) {
        let slot = self.slot(key);
        *slot.lock().await = Some(CachedListing {
            pull_requests,
            stored_at: Instant::now(),
        });
    }

    /// Drops the entry stored under `key`.
    ///
    /// A load already in flight for the key completes for its own callers
    /// but is not visible to later lookups.
    pub fn invalidate(&self, key: &CacheKey) {
        let removed = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        debug!(key = ?key, removed = removed.is_some(), "cache entry invalidated");
    }

    /// Invalidates the listing for `repositories` and the "all repositories"
    /// listing of the same credential and organization scope.
    pub fn invalidate_scope(
        &self,
        token: &PersonalAccessToken,
        organizations: &OrganizationScope,
        repositories: &RepositoryScope,
    ) {
        self.invalidate(&CacheKey::derive(token, organizations, repositories));
        if !repositories.is_all() {
            self.invalidate(&CacheKey::all_repositories(token, organizations));
        }
    }

    /// Returns the cached listing for `key` or loads it with `fetch`.
    ///
    /// Concurrent callers for the same key wait for a single `fetch`. Failed
    /// loads are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`.
    pub async fn remember<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<Vec<PullRequest>, FetchError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<PullRequest>, FetchError>> + Send,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(listing) = self.fresh(entry.as_ref()) {
            debug!(key = ?key, "cache hit");
            return Ok(listing.pull_requests.clone());
        }

        debug!(key = ?key, "cache miss");
        let pull_requests = fetch().await?;
        *entry = Some(CachedListing {
            pull_requests: pull_requests.clone(),
            stored_at: Instant::now(),
        });
        Ok(pull_requests)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::{CacheKey, PullRequestCache};
    use crate::github::error::FetchError;
    use crate::github::models::PullRequest;
    use crate::github::models::test_support::pull_request;
    use crate::github::scope::{OrganizationScope, PersonalAccessToken, RepositoryScope};

    #[fixture]
    fn token() -> PersonalAccessToken {
        PersonalAccessToken::new("ghp_cache").expect("token should be valid")
    }

    fn listing() -> Vec<PullRequest> {
        vec![pull_request("https://github.com/acme/api/pull/1")]
    }

    fn scoped(raw: &str) -> RepositoryScope {
        RepositoryScope::parse_list(raw).expect("scope should parse")
    }

    #[rstest]
    fn keys_differ_by_credential_and_scope(token: PersonalAccessToken) {
        let orgs = OrganizationScope::parse("acme");
        let other_token = PersonalAccessToken::new("ghp_other").expect("token should be valid");
        let base = CacheKey::derive(&token, &orgs, &RepositoryScope::all());

        assert_ne!(base, CacheKey::derive(&other_token, &orgs, &RepositoryScope::all()));
        assert_ne!(
            base,
            CacheKey::derive(&token, &OrganizationScope::parse("globex"), &RepositoryScope::all())
        );
        assert_ne!(base, CacheKey::derive(&token, &orgs, &scoped("acme/api")));
        assert_eq!(base, CacheKey::all_repositories(&token, &orgs));
    }

    #[rstest]
    fn key_ignores_repository_order(token: PersonalAccessToken) {
        let orgs = OrganizationScope::default();
        assert_eq!(
            CacheKey::derive(&token, &orgs, &scoped("a/one,b/two")),
            CacheKey::derive(&token, &orgs, &scoped("b/two,a/one"))
        );
    }

    #[rstest]
    fn debug_output_hides_token(token: PersonalAccessToken) {
        let key = CacheKey::all_repositories(&token, &OrganizationScope::default());
        assert!(!format!("{key:?}").contains("ghp_cache"));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl(token: PersonalAccessToken) {
        let cache = PullRequestCache::new(Duration::from_secs(60));
        let key = CacheKey::all_repositories(&token, &OrganizationScope::default());
        cache.put(&key, listing()).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&key).await, Some(listing()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn remember_fetches_once_within_ttl(token: PersonalAccessToken) {
        let cache = PullRequestCache::default();
        let key = CacheKey::all_repositories(&token, &OrganizationScope::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .remember(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(listing())
                })
                .await
                .expect("load should succeed");
            assert_eq!(result, listing());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn concurrent_remember_is_single_flight(token: PersonalAccessToken) {
        let cache = Arc::new(PullRequestCache::default());
        let key = CacheKey::all_repositories(&token, &OrganizationScope::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let task_cache = Arc::clone(&cache);
                let task_key = key.clone();
                let task_calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    task_cache
                        .remember(&task_key, || async move {
                            task_calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(listing())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let result = task.await.expect("task should join");
            assert_eq!(result, Ok(listing()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_loads_are_not_cached(token: PersonalAccessToken) {
        let cache = PullRequestCache::default();
        let key = CacheKey::all_repositories(&token, &OrganizationScope::default());
        let failure = FetchError::Network {
            message: "reset".to_owned(),
        };

        let first = cache.remember(&key, || async { Err(failure.clone()) }).await;
        let second = cache.remember(&key, || async { Ok(listing()) }).await;

        assert_eq!(first, Err(failure));
        assert_eq!(second, Ok(listing()));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn stale_and_missed_keys_do_not_accumulate_slots(token: PersonalAccessToken) {
        let cache = PullRequestCache::new(Duration::from_secs(60));
        let orgs = OrganizationScope::default();
        for index in 0..200 {
            let loaded = CacheKey::derive(&token, &orgs, &scoped(&format!("acme/repo-{index}")));
            cache
                .remember(&loaded, || async { Ok(listing()) })
                .await
                .expect("load should succeed");
            let missing = CacheKey::derive(&token, &orgs, &scoped(&format!("acme/gone-{index}")));
            assert_eq!(cache.get(&missing).await, None);
        }
        assert_eq!(cache.slot_count(), 200, "lookups should not create slots");

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache
            .put(&CacheKey::all_repositories(&token, &orgs), listing())
            .await;

        assert_eq!(cache.slot_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_load_slots_are_reclaimed(token: PersonalAccessToken) {
        let cache = PullRequestCache::default();
        let orgs = OrganizationScope::default();
        for index in 0..50 {
            let key = CacheKey::derive(&token, &orgs, &scoped(&format!("acme/repo-{index}")));
            let result = cache
                .remember(&key, || async {
                    Err(FetchError::Network {
                        message: "reset".to_owned(),
                    })
                })
                .await;
            assert!(result.is_err());
        }

        cache
            .put(&CacheKey::all_repositories(&token, &orgs), listing())
            .await;

        assert_eq!(cache.slot_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn invalidating_a_repository_scope_also_drops_all_listing(token: PersonalAccessToken) {
        let cache = PullRequestCache::default();
        let orgs = OrganizationScope::parse("acme");
        let repositories = scoped("acme/api");
        let scoped_key = CacheKey::derive(&token, &orgs, &repositories);
        let all_key = CacheKey::all_repositories(&token, &orgs);
        let unrelated_key = CacheKey::derive(&token, &orgs, &scoped("acme/web"));
        for key in [&scoped_key, &all_key, &unrelated_key] {
            cache.put(key, listing()).await;
        }

        cache.invalidate_scope(&token, &orgs, &repositories);

        assert_eq!(cache.get(&scoped_key).await, None);
        assert_eq!(cache.get(&all_key).await, None);
        assert_eq!(cache.get(&unrelated_key).await, Some(listing()));
    }
}
