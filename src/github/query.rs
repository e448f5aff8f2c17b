//! Search strings and GraphQL documents for every fetch mode.
//!
//! Search queries are assembled from qualifiers (`is:pr is:open org:acme`).
//! Repository-scoped searches are split into batches so each query string
//! stays within GitHub's search length limit.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::pagination::ConnectionPath;
use super::scope::RepositorySlug;

/// Maximum search string length accepted by GitHub.
pub const MAX_SEARCH_QUERY_LEN: usize = 256;

/// Page size requested from every paged connection.
pub const PAGE_SIZE: u32 = 100;

/// A GraphQL document plus its variables, serialised as `{query, variables}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    query: String,
    variables: Map<String, Value>,
}

impl GraphqlRequest {
    /// Creates a request with no variables.
    #[must_use]
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            query: document.into(),
            variables: Map::new(),
        }
    }

    /// Sets (or replaces) one variable.
    #[must_use]
    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_owned(), value.into());
        self
    }

    /// The GraphQL document.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.query
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// Search string for open pull requests, built from qualifiers.
///
/// # Example
///
/// ```
/// use prdash::github::query::SearchQuery;
///
/// let query = SearchQuery::open_pull_requests().organization("acme");
/// assert_eq!(query.as_str(), "is:pr is:open org:acme");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Base query matching every open pull request.
    #[must_use]
    pub fn open_pull_requests() -> Self {
        Self("is:pr is:open".to_owned())
    }

    /// Restricts to pull requests authored by `login` (`@me` allowed).
    #[must_use]
    pub fn author(self, login: &str) -> Self {
        self.qualifier("author", login)
    }

    /// Restricts to pull requests awaiting review from `login`.
    #[must_use]
    pub fn review_requested(self, login: &str) -> Self {
        self.qualifier("review-requested", login)
    }

    /// Restricts to pull requests in organization `login`.
    #[must_use]
    pub fn organization(self, login: &str) -> Self {
        self.qualifier("org", login)
    }

    /// Adds a repository qualifier. Several qualifiers are OR-ed by GitHub.
    #[must_use]
    pub fn repository(self, slug: &RepositorySlug) -> Self {
        self.qualifier("repo", &slug.to_string())
    }

    /// The rendered search string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the rendered search string in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a search string carries at least the base qualifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn qualifier(mut self, name: &str, value: &str) -> Self {
        self.0.push(' ');
        self.0.push_str(name);
        self.0.push(':');
        self.0.push_str(value);
        self
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Splits a repository scope into search queries no longer than
/// [`MAX_SEARCH_QUERY_LEN`].
///
/// Repositories keep their order. A single qualifier that is longer than the
/// limit on its own still gets a query of its own.
#[must_use]
pub fn repository_search_batches(repositories: &[RepositorySlug]) -> Vec<SearchQuery> {
    let mut batches = Vec::new();
    let mut current: Option<SearchQuery> = None;

    for slug in repositories {
        let candidate = current
            .clone()
            .unwrap_or_else(SearchQuery::open_pull_requests)
            .repository(slug);

        current = match current {
            Some(full) if candidate.len() > MAX_SEARCH_QUERY_LEN => {
                batches.push(full);
                Some(SearchQuery::open_pull_requests().repository(slug))
            }
            _ => Some(candidate),
        };
    }

    batches.extend(current);
    batches
}

/// Builds the paged search request for one search string.
#[must_use]
pub fn search_request(query: &SearchQuery) -> GraphqlRequest {
    GraphqlRequest::new(SEARCH_PULL_REQUESTS).with_variable("searchQuery", query.as_str())
}

/// Connection walked by [`SEARCH_PULL_REQUESTS`].
pub const SEARCH_CONNECTION: ConnectionPath = ConnectionPath::new("/search");
/// Connection walked by [`VIEWER_REPOSITORIES`].
pub const VIEWER_REPOSITORIES_CONNECTION: ConnectionPath =
    ConnectionPath::new("/viewer/repositories");
/// Connection walked by [`ORGANIZATION_REPOSITORIES`].
pub const ORGANIZATION_REPOSITORIES_CONNECTION: ConnectionPath =
    ConnectionPath::new("/organization/repositories");
/// Connection walked by [`ORGANIZATION_MEMBERS`].
pub const ORGANIZATION_MEMBERS_CONNECTION: ConnectionPath =
    ConnectionPath::new("/organization/membersWithRole");

macro_rules! pull_request_fields {
    () => {
        r"
fragment PullRequestFields on PullRequest {
  number
  title
  url
  createdAt
  updatedAt
  isDraft
  headRefName
  baseRefName
  mergeable
  reviewDecision
  author { login avatarUrl(size: 32) }
  repository { name nameWithOwner owner { login } }
  labels(first: 10) { nodes { name color } }
  commits(last: 1) { nodes { commit { statusCheckRollup { state } } } }
  reviews(last: 20) { nodes { author { login avatarUrl(size: 32) } state submittedAt } }
  reviewRequests(first: 20) {
    nodes {
      requestedReviewer {
        ... on User { login avatarUrl(size: 32) }
        ... on Team { name }
      }
    }
  }
  reviewThreads(first: 100) { nodes { isResolved } }
}
"
    };
}

/// Paged search over open pull requests.
pub const SEARCH_PULL_REQUESTS: &str = concat!(
    r"
query SearchPullRequests($searchQuery: String!, $cursor: String) {
  search(query: $searchQuery, type: ISSUE, first: 100, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes { ...PullRequestFields }
  }
}
",
    pull_request_fields!()
);

/// Single pull request lookup used for detail enrichment.
pub const PULL_REQUEST_DETAILS: &str = concat!(
    r"
query PullRequestDetails($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) { ...PullRequestFields }
  }
}
",
    pull_request_fields!()
);

/// Repositories the viewer owns, belongs to through an organization, or
/// collaborates on.
pub const VIEWER_REPOSITORIES: &str = r"
query ViewerRepositories($cursor: String) {
  viewer {
    repositories(
      first: 100
      after: $cursor
      ownerAffiliations: [OWNER, ORGANIZATION_MEMBER, COLLABORATOR]
      orderBy: { field: NAME, direction: ASC }
    ) {
      pageInfo { hasNextPage endCursor }
      nodes { name nameWithOwner owner { login } }
    }
  }
}
";

/// Repositories of one organization.
pub const ORGANIZATION_REPOSITORIES: &str = r"
query OrganizationRepositories($login: String!, $cursor: String) {
  organization(login: $login) {
    repositories(first: 100, after: $cursor, orderBy: { field: NAME, direction: ASC }) {
      pageInfo { hasNextPage endCursor }
      nodes { name nameWithOwner owner { login } }
    }
  }
}
";

/// Members of one organization.
pub const ORGANIZATION_MEMBERS: &str = r"
query OrganizationMembers($login: String!, $cursor: String) {
  organization(login: $login) {
    membersWithRole(first: 100, after: $cursor) {
      pageInfo { hasNextPage endCursor }
      nodes { login avatarUrl(size: 32) }
    }
  }
}
";

/// Login of the authenticated user.
pub const VIEWER_LOGIN: &str = "query ViewerLogin { viewer { login } }";
