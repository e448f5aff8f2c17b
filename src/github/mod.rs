//! GitHub pull request aggregation.
//!
//! This module queries GitHub's GraphQL API for open pull requests across a
//! user, one organization or several organizations, normalises each node
//! into a [`PullRequest`], merges and sorts the results, and caches them per
//! credential and scope. Transport failures are mapped into [`FetchError`]
//! variants so callers can tell network, upstream and payload errors apart.

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod models;
pub mod normalizer;
pub mod ordering;
pub mod pagination;
pub mod query;
pub mod scope;

pub use aggregator::{EnrichmentFailurePolicy, PullRequestAggregator, VIEWER_ALIAS};
pub use cache::{CacheKey, DEFAULT_CACHE_TTL, PullRequestCache};
pub use error::FetchError;
pub use gateway::{GhCliTransport, GraphqlTransport, OctocrabGraphqlTransport};
pub use models::{
    Label, MergeableState, OrgMember, PullRequest, Repository, RequestedReviewer, ReviewDecision,
    ReviewState, ReviewStatus,
};
pub use pagination::{ConnectionPath, PageInfo, PageWalker};
pub use scope::{
    DEFAULT_API_BASE, OrganizationScope, PersonalAccessToken, RepositoryName, RepositoryOwner,
    RepositoryScope, RepositorySlug, parse_api_base,
};

#[cfg(test)]
pub use gateway::MockGraphqlTransport;

#[cfg(test)]
mod tests;
