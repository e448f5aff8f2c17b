//! prdash library crate aggregating open GitHub pull requests.
//!
//! The library queries GitHub's GraphQL API through a pluggable transport
//! (Octocrab over HTTP or the `gh` CLI), merges listings across a user or
//! several organizations, orders them for review triage, and caches results
//! per credential and scope. Configuration is layered from CLI flags,
//! environment variables, and configuration files.

pub mod config;
pub mod github;

pub use config::{ListingMode, PrdashConfig};
pub use github::{
    DEFAULT_API_BASE, EnrichmentFailurePolicy, FetchError, GhCliTransport, GraphqlTransport,
    OctocrabGraphqlTransport, OrgMember, OrganizationScope, PersonalAccessToken, PullRequest,
    PullRequestAggregator, PullRequestCache, RepositoryScope, RepositorySlug, ReviewDecision,
    VIEWER_ALIAS,
};
