//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prdash.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRDASH_*`, with `GITHUB_TOKEN` as a
//!    fallback for the token
//! 4. **Command-line arguments** – `--organizations`/`-o`, `--token`/`-t`, …
//!
//! # Configuration File
//!
//! ```toml
//! token = "ghp_example"
//! organizations = "acme, globex"
//! repositories = "acme/api, globex/web"
//! authors = "@me"
//! cache_ttl_seconds = 60
//! poll_interval_seconds = 180
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::github::{
    DEFAULT_API_BASE, EnrichmentFailurePolicy, FetchError, OrganizationScope,
    PersonalAccessToken, RepositoryScope, parse_api_base,
};

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 180;

/// Which listing the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Pull requests filtered by author.
    Authored,
    /// Pull requests awaiting review from the configured reviewers.
    Reviewing,
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRDASH_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `PRDASH_ORGANIZATIONS` or `--organizations`: Comma-separated organizations
/// - `PRDASH_REPOSITORIES` or `--repositories`: Comma-separated `owner/name`
/// - `PRDASH_API_BASE` or `--api-base`: GitHub API host
///
/// # Example
///
/// ```no_run
/// use prdash::PrdashConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = PrdashConfig::load().expect("failed to load configuration");
/// let token = config.resolve_token().expect("token required");
/// let organizations = config.organization_scope();
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRDASH",
    discovery(
        dotfile_name = ".prdash.toml",
        config_file_name = "prdash.toml",
        app_name = "prdash"
    )
)]
pub struct PrdashConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRDASH_TOKEN` or `GITHUB_TOKEN` (fallback)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Comma-separated organization logins. Empty means the viewer's own
    /// pull requests.
    #[ortho_config(cli_short = 'o')]
    pub organizations: Option<String>,

    /// Comma-separated `owner/name` repositories to restrict listings to.
    #[ortho_config(cli_short = 'r')]
    pub repositories: Option<String>,

    /// Comma-separated author logins; `@me` is the authenticated user.
    #[ortho_config(cli_short = 'a')]
    pub authors: Option<String>,

    /// Comma-separated reviewer logins; `@me` is the authenticated user.
    #[ortho_config(cli_short = 'v')]
    pub reviewers: Option<String>,

    /// Lists pull requests awaiting review instead of authored ones.
    ///
    /// Note: `ortho_config` does not load boolean values from the
    /// environment; use the CLI flag or the configuration file.
    #[ortho_config(cli_short = 'R')]
    pub reviewing: bool,

    /// GitHub API base URL; GraphQL requests go to `<api_base>/graphql`.
    #[ortho_config(cli_short = 'b')]
    pub api_base: String,

    /// Per-request transport timeout, in seconds.
    #[ortho_config(cli_short = 'T')]
    pub request_timeout_seconds: u64,

    /// How long aggregated listings stay cached, in seconds.
    #[ortho_config()]
    pub cache_ttl_seconds: u64,

    /// Delay between refreshes in watch mode, in seconds.
    #[ortho_config()]
    pub poll_interval_seconds: u64,

    /// Keeps polling and re-printing the listing.
    #[ortho_config(cli_short = 'w')]
    pub watch: bool,

    /// Drops the cached listing for the configured scope before loading.
    #[ortho_config(cli_short = 'f')]
    pub refresh: bool,

    /// Sends requests through `gh api graphql` instead of HTTP.
    #[ortho_config()]
    pub use_gh_cli: bool,

    /// Re-reads review state per pull request after listing.
    #[ortho_config()]
    pub enrich_details: bool,

    /// Keeps pull requests whose detail lookup failed instead of failing the
    /// whole listing.
    #[ortho_config(cli_short = 'k')]
    pub tolerate_enrichment_failures: bool,
}

impl Default for PrdashConfig {
    fn default() -> Self {
        Self {
            token: None,
            organizations: None,
            repositories: None,
            authors: None,
            reviewers: None,
            reviewing: false,
            api_base: DEFAULT_API_BASE.to_owned(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            watch: false,
            refresh: false,
            use_gh_cli: false,
            enrich_details: false,
            tolerate_enrichment_failures: false,
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

impl PrdashConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingCredential`] when no source provides a
    /// non-blank value.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, FetchError> {
        let raw = self
            .token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(FetchError::MissingCredential)?;
        PersonalAccessToken::new(raw)
    }

    /// Configured organizations, trimmed, with blank entries dropped.
    #[must_use]
    pub fn organization_scope(&self) -> OrganizationScope {
        OrganizationScope::parse(self.organizations.as_deref().unwrap_or_default())
    }

    /// Configured repository scope; empty means all repositories.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRepository`] for an entry that is not in
    /// `owner/name` form.
    pub fn repository_scope(&self) -> Result<RepositoryScope, FetchError> {
        RepositoryScope::parse_list(self.repositories.as_deref().unwrap_or_default())
    }

    /// Author logins to filter by.
    #[must_use]
    pub fn author_filter(&self) -> Vec<String> {
        split_list(self.authors.as_deref())
    }

    /// Reviewer logins to filter by.
    #[must_use]
    pub fn reviewer_filter(&self) -> Vec<String> {
        split_list(self.reviewers.as_deref())
    }

    /// Validated API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] for a non-HTTP(S) value.
    pub fn api_base_url(&self) -> Result<Url, FetchError> {
        parse_api_base(&self.api_base)
    }

    /// Per-request transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Cache time-to-live.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Delay between watch-mode refreshes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Failure policy for detail enrichment.
    #[must_use]
    pub const fn enrichment_policy(&self) -> EnrichmentFailurePolicy {
        if self.tolerate_enrichment_failures {
            EnrichmentFailurePolicy::KeepUnenriched
        } else {
            EnrichmentFailurePolicy::FailBatch
        }
    }

    /// Listing selected by the `reviewing` flag.
    #[must_use]
    pub const fn listing_mode(&self) -> ListingMode {
        if self.reviewing {
            ListingMode::Reviewing
        } else {
            ListingMode::Authored
        }
    }

    /// Validates values that cannot be checked by type alone.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] for a zero timeout, a zero poll
    /// interval in watch mode, or an invalid API base, and
    /// [`FetchError::InvalidRepository`] for a malformed repository entry.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.request_timeout_seconds == 0 {
            return Err(FetchError::Configuration {
                message: "request_timeout_seconds must be greater than zero".to_owned(),
            });
        }
        if self.watch && self.poll_interval_seconds == 0 {
            return Err(FetchError::Configuration {
                message: "poll_interval_seconds must be greater than zero in watch mode"
                    .to_owned(),
            });
        }
        self.api_base_url()?;
        self.repository_scope()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
