//! Aggregation of open pull requests across the configured scope.
//!
//! [`PullRequestAggregator`] picks a fetch strategy for each request:
//!
//! - a repository scope runs batched `repo:` searches in sequence;
//! - no organizations runs the viewer's `author:@me` and
//!   `review-requested:@me` searches;
//! - one organization runs a single `org:` search;
//! - several organizations run one concurrent search per organization, and
//!   an organization that fails contributes nothing instead of failing the
//!   whole listing.
//!
//! Results are merged, de-duplicated by URL, sorted and cached per scope.
//! Author and reviewer filters are applied to the cached listing, so every
//! filter over the same scope shares one upstream fetch.

mod directory;
mod enrichment;

pub use enrichment::EnrichmentFailurePolicy;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::cache::{CacheKey, PullRequestCache};
use super::error::FetchError;
use super::gateway::GraphqlTransport;
use super::models::PullRequest;
use super::normalizer::normalize_pull_request;
use super::ordering::{dedup_and_sort, merge_unique};
use super::pagination::PageWalker;
use super::query::{SEARCH_CONNECTION, SearchQuery, repository_search_batches, search_request};
use super::scope::{OrganizationScope, PersonalAccessToken, RepositoryScope};

/// Filter value standing for the authenticated user.
pub const VIEWER_ALIAS: &str = "@me";

/// Fetches, merges and caches pull request listings for one credential and
/// organization scope.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use prdash::github::{
///     OctocrabGraphqlTransport, OrganizationScope, PersonalAccessToken, PullRequestAggregator,
///     PullRequestCache, RepositoryScope,
/// };
///
/// # async fn demo() -> Result<(), prdash::github::FetchError> {
/// let token = PersonalAccessToken::new("ghp_example")?;
/// let transport =
///     OctocrabGraphqlTransport::for_token(&token, "https://api.github.com", Duration::from_secs(30))?;
/// let aggregator = PullRequestAggregator::new(
///     Arc::new(transport),
///     Arc::new(PullRequestCache::default()),
///     token,
///     OrganizationScope::parse("acme,globex"),
/// );
/// let mine = aggregator
///     .list_by_authors(&["@me".to_owned()], &RepositoryScope::all())
///     .await?;
/// # let _ = mine;
/// # Ok(())
/// # }
/// ```
pub struct PullRequestAggregator<T: ?Sized = dyn GraphqlTransport> {
    transport: Arc<T>,
    cache: Arc<PullRequestCache>,
    token: PersonalAccessToken,
    organizations: OrganizationScope,
    enrichment_policy: EnrichmentFailurePolicy,
    viewer_login: OnceCell<String>,
}

impl<T: GraphqlTransport + ?Sized + 'static> PullRequestAggregator<T> {
    /// Creates an aggregator. `token` identifies the credential in cache
    /// keys; `cache` may be shared with other aggregators.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        cache: Arc<PullRequestCache>,
        token: PersonalAccessToken,
        organizations: OrganizationScope,
    ) -> Self {
        Self {
            transport,
            cache,
            token,
            organizations,
            enrichment_policy: EnrichmentFailurePolicy::default(),
            viewer_login: OnceCell::new(),
        }
    }

    /// Sets how per-PR detail failures are handled by
    /// [`enrich_details`](Self::enrich_details).
    #[must_use]
    pub fn with_enrichment_policy(mut self, policy: EnrichmentFailurePolicy) -> Self {
        self.enrichment_policy = policy;
        self
    }

    /// Organization scope this aggregator covers.
    #[must_use]
    pub const fn organizations(&self) -> &OrganizationScope {
        &self.organizations
    }

    /// Open pull requests authored by any of `authors`.
    ///
    /// An empty `authors` list returns every open pull request in scope.
    /// `@me` matches the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the fetch error of a fatal strategy (repository scope, viewer
    /// or single organization). Multi-organization failures are tolerated.
    pub async fn list_by_authors(
        &self,
        authors: &[String],
        repositories: &RepositoryScope,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let listing = self.open_pull_requests(repositories).await?;
        if authors.is_empty() {
            return Ok(listing);
        }

        let logins = self.resolve_logins(authors).await;
        Ok(listing
            .into_iter()
            .filter(|pr| logins.contains(&pr.author))
            .collect())
    }

    /// Open pull requests with a pending review request for any of
    /// `reviewers`.
    ///
    /// An empty `reviewers` list returns every open pull request in scope.
    /// `@me` matches the authenticated user.
    ///
    /// # Errors
    ///
    /// As for [`list_by_authors`](Self::list_by_authors).
    pub async fn list_by_reviewers(
        &self,
        reviewers: &[String],
        repositories: &RepositoryScope,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let listing = self.open_pull_requests(repositories).await?;
        if reviewers.is_empty() {
            return Ok(listing);
        }

        let logins = self.resolve_logins(reviewers).await;
        Ok(listing
            .into_iter()
            .filter(|pr| logins.iter().any(|login| pr.is_review_requested_from(login)))
            .collect())
    }

    /// Drops the cached listing for `repositories` together with the
    /// "all repositories" listing of the same scope.
    pub fn invalidate_cache(&self, repositories: &RepositoryScope) {
        self.cache
            .invalidate_scope(&self.token, &self.organizations, repositories);
    }

    async fn open_pull_requests(
        &self,
        repositories: &RepositoryScope,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let key = CacheKey::derive(&self.token, &self.organizations, repositories);
        self.cache
            .remember(&key, || self.fetch_open_pull_requests(repositories))
            .await
    }

    async fn fetch_open_pull_requests(
        &self,
        repositories: &RepositoryScope,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let collected = if repositories.is_all() {
            match self.organizations.logins() {
                [] => self.fetch_viewer_pull_requests().await?,
                [organization] => {
                    debug!(organization = %organization, "searching single organization");
                    let query = SearchQuery::open_pull_requests().organization(organization);
                    search_all(self.transport.as_ref(), &query).await?
                }
                _ => self.fetch_organization_pull_requests().await,
            }
        } else {
            self.fetch_repository_pull_requests(repositories).await?
        };

        Ok(dedup_and_sort(collected))
    }

    async fn fetch_repository_pull_requests(
        &self,
        repositories: &RepositoryScope,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let batches = repository_search_batches(repositories.repositories());
        debug!(
            repositories = repositories.repositories().len(),
            batches = batches.len(),
            "searching repository scope"
        );

        let mut collected = Vec::new();
        for query in &batches {
            collected.extend(search_all(self.transport.as_ref(), query).await?);
        }
        Ok(collected)
    }

    async fn fetch_viewer_pull_requests(&self) -> Result<Vec<PullRequest>, FetchError> {
        debug!("searching viewer pull requests");
        let authored = SearchQuery::open_pull_requests().author(VIEWER_ALIAS);
        let requested = SearchQuery::open_pull_requests().review_requested(VIEWER_ALIAS);
        let (mine, reviewing) = tokio::try_join!(
            search_all(self.transport.as_ref(), &authored),
            search_all(self.transport.as_ref(), &requested),
        )?;
        Ok(merge_unique([mine.as_slice(), reviewing.as_slice()]))
    }

    async fn fetch_organization_pull_requests(&self) -> Vec<PullRequest> {
        let results = self
            .per_organization(|transport, organization| async move {
                let query = SearchQuery::open_pull_requests().organization(&organization);
                search_all(transport.as_ref(), &query).await
            })
            .await;

        let listings: Vec<Vec<PullRequest>> = results
            .into_iter()
            .filter_map(|(organization, result)| match result {
                Ok(listing) => Some(listing),
                Err(error) => {
                    warn!(%organization, %error, "organization fetch failed; treating it as empty");
                    None
                }
            })
            .collect();
        merge_unique(listings.iter().map(Vec::as_slice))
    }

    /// Runs `fetch` once per configured organization, concurrently.
    ///
    /// Waits for every task and returns results in configuration order. A
    /// task that panicked yields `FetchError::TaskFailed`.
    async fn per_organization<R, F, Fut>(&self, fetch: F) -> Vec<(String, Result<R, FetchError>)>
    where
        R: Send + 'static,
        F: Fn(Arc<T>, String) -> Fut,
        Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
    {
        let logins = self.organizations.logins();
        let mut tasks = JoinSet::new();
        for (index, login) in logins.iter().enumerate() {
            let task = fetch(Arc::clone(&self.transport), login.clone());
            tasks.spawn(async move { (index, task.await) });
        }

        let mut slots: Vec<Option<Result<R, FetchError>>> = logins.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(error) => warn!(%error, "organization task did not complete"),
            }
        }

        logins
            .iter()
            .cloned()
            .zip(slots)
            .map(|(login, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(FetchError::TaskFailed {
                        message: format!("task for organization {login} did not complete"),
                    })
                });
                (login, result)
            })
            .collect()
    }

    /// Replaces `@me` with the viewer login. When the viewer cannot be
    /// determined the alias is kept and matches nobody.
    async fn resolve_logins(&self, logins: &[String]) -> Vec<String> {
        let viewer = if logins.iter().any(|login| login == VIEWER_ALIAS) {
            self.current_user().await
        } else {
            None
        };

        logins
            .iter()
            .map(|login| match &viewer {
                Some(resolved) if login == VIEWER_ALIAS => resolved.clone(),
                _ => login.clone(),
            })
            .collect()
    }
}

/// Walks every page of one search and normalises its pull requests.
async fn search_all<T: GraphqlTransport + ?Sized>(
    transport: &T,
    query: &SearchQuery,
) -> Result<Vec<PullRequest>, FetchError> {
    let nodes = PageWalker::new(transport, search_request(query), SEARCH_CONNECTION)
        .collect_nodes()
        .await?;
    debug!(query = %query, nodes = nodes.len(), "search complete");
    Ok(nodes
        .iter()
        .filter_map(|node| normalize_pull_request(node, None))
        .collect())
}
