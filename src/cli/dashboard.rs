//! Dashboard listing operation.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::Utc;
use prdash::config::ListingMode;
use prdash::{
    DEFAULT_API_BASE, FetchError, GhCliTransport, GraphqlTransport, OctocrabGraphqlTransport,
    PersonalAccessToken, PrdashConfig, PullRequest, PullRequestAggregator, PullRequestCache,
    VIEWER_ALIAS,
};
use tracing::{debug, warn};

use super::output::{write_dashboard, write_refresh_failure};

/// Cache identity used when `gh` supplies the credential itself.
const GH_CLI_IDENTITY: &str = "gh-cli";

/// Loads and prints the dashboard, once or repeatedly in watch mode.
///
/// # Errors
///
/// Returns [`FetchError::MissingCredential`] when no token is configured for
/// HTTP mode, or the first fetch error outside watch mode.
pub async fn run(config: &PrdashConfig) -> Result<(), FetchError> {
    let token = resolve_identity(config)?;
    let transport = build_transport(config, &token)?;
    let aggregator = PullRequestAggregator::new(
        transport,
        Arc::new(PullRequestCache::new(config.cache_ttl())),
        token,
        config.organization_scope(),
    )
    .with_enrichment_policy(config.enrichment_policy());

    let mut stdout = io::stdout();
    if config.watch {
        watch(config, &aggregator, &mut stdout, None).await
    } else {
        let listing = load_listing(config, &aggregator).await?;
        write_dashboard(&mut stdout, &listing, Utc::now())
    }
}

/// Resolves the credential, falling back to a fixed identity when `gh`
/// authenticates requests.
fn resolve_identity(config: &PrdashConfig) -> Result<PersonalAccessToken, FetchError> {
    match config.resolve_token() {
        Err(FetchError::MissingCredential) if config.use_gh_cli => {
            PersonalAccessToken::new(GH_CLI_IDENTITY)
        }
        other => other,
    }
}

/// Builds the configured transport.
///
/// # Errors
///
/// Returns [`FetchError::Configuration`] for an invalid API base.
pub fn build_transport(
    config: &PrdashConfig,
    token: &PersonalAccessToken,
) -> Result<Arc<dyn GraphqlTransport>, FetchError> {
    let api_base = config.api_base_url()?;
    if config.use_gh_cli {
        let base_transport = GhCliTransport::new().with_timeout(config.request_timeout());
        let enterprise_host = api_base
            .host_str()
            .filter(|_| config.api_base.trim_end_matches('/') != DEFAULT_API_BASE);
        debug!(host = ?enterprise_host, "using gh CLI transport");
        let transport = match enterprise_host {
            Some(host) => base_transport.with_hostname(host),
            None => base_transport,
        };
        return Ok(Arc::new(transport));
    }

    debug!(api_base = %api_base, "using HTTP transport");
    let transport =
        OctocrabGraphqlTransport::for_token(token, api_base.as_str(), config.request_timeout())?;
    Ok(Arc::new(transport))
}

/// Loads the listing selected by `config`.
///
/// Reviewing mode with no reviewers configured lists requests for `@me`.
///
/// # Errors
///
/// Returns the aggregator's fetch error, or
/// [`FetchError::InvalidRepository`] for a malformed repository scope.
pub async fn load_listing<T>(
    config: &PrdashConfig,
    aggregator: &PullRequestAggregator<T>,
) -> Result<Vec<PullRequest>, FetchError>
where
    T: GraphqlTransport + ?Sized + 'static,
{
    let repositories = config.repository_scope()?;
    if config.refresh {
        aggregator.invalidate_cache(&repositories);
    }

    let listing = match config.listing_mode() {
        ListingMode::Authored => {
            aggregator
                .list_by_authors(&config.author_filter(), &repositories)
                .await?
        }
        ListingMode::Reviewing => {
            let configured = config.reviewer_filter();
            let reviewers = if configured.is_empty() {
                vec![VIEWER_ALIAS.to_owned()]
            } else {
                configured
            };
            aggregator
                .list_by_reviewers(&reviewers, &repositories)
                .await?
        }
    };

    if config.enrich_details {
        aggregator.enrich_details(listing).await
    } else {
        Ok(listing)
    }
}

/// Reloads and prints the listing every poll interval.
///
/// A failed refresh is reported and the previous listing shown again.
/// `rounds` bounds the number of loads; `None` polls until the process
/// exits.
///
/// # Errors
///
/// Returns [`FetchError::Io`] when the output cannot be written.
pub async fn watch<T, W>(
    config: &PrdashConfig,
    aggregator: &PullRequestAggregator<T>,
    writer: &mut W,
    rounds: Option<u32>,
) -> Result<(), FetchError>
where
    T: GraphqlTransport + ?Sized + 'static,
    W: Write,
{
    let mut previous: Option<Vec<PullRequest>> = None;
    let mut completed: u32 = 0;

    loop {
        match load_listing(config, aggregator).await {
            Ok(listing) => {
                write_dashboard(writer, &listing, Utc::now())?;
                previous = Some(listing);
            }
            Err(error) => {
                warn!(%error, "refresh failed; keeping previous listing");
                write_refresh_failure(writer, &error, previous.as_deref(), Utc::now())?;
            }
        }

        completed = completed.saturating_add(1);
        if rounds.is_some_and(|limit| completed >= limit) {
            return Ok(());
        }
        tokio::time::sleep(config.poll_interval()).await;
    }
}
