//! Test helpers for constructing `PullRequest` fixtures.
//!
//! # Examples
//!
//! ```
//! use prdash::github::models::test_support::{pull_request, with_review_state};
//!
//! let pr = with_review_state(pull_request("https://github.com/acme/api/pull/1"), true, 3);
//! assert!(pr.is_approved);
//! assert_eq!(pr.unresolved_count, 3);
//! ```

use super::{PullRequest, Repository, ReviewDecision};

/// Constructs a minimal `PullRequest` identified by `url`.
///
/// The number is taken from the final path segment when it parses, and the
/// repository from the `owner/name` segments of a `github.com` URL.
#[must_use]
pub fn pull_request(url: &str) -> PullRequest {
    let mut segments = url
        .trim_start_matches("https://github.com/")
        .split('/')
        .map(ToOwned::to_owned);
    let owner = segments.next().unwrap_or_default();
    let name = segments.next().unwrap_or_default();
    let number = url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .unwrap_or(1);

    PullRequest {
        number,
        title: format!("Pull request {number}"),
        url: url.to_owned(),
        repository: Repository {
            name_with_owner: format!("{owner}/{name}"),
            name,
            owner,
        },
        author: "octocat".to_owned(),
        created_at: "2024-01-01T00:00:00Z".to_owned(),
        updated_at: "2024-01-01T00:00:00Z".to_owned(),
        ..Default::default()
    }
}

/// Sets approval and unresolved-thread count on a fixture.
#[must_use]
pub fn with_review_state(pr: PullRequest, approved: bool, unresolved_count: u32) -> PullRequest {
    PullRequest {
        is_approved: approved,
        review_decision: approved.then_some(ReviewDecision::Approved),
        unresolved_count,
        ..pr
    }
}

/// Sets the `updated_at` timestamp on a fixture.
#[must_use]
pub fn updated_at(pr: PullRequest, timestamp: &str) -> PullRequest {
    PullRequest {
        updated_at: timestamp.to_owned(),
        ..pr
    }
}

/// Sets the author login on a fixture.
#[must_use]
pub fn authored_by(pr: PullRequest, login: &str) -> PullRequest {
    PullRequest {
        author: login.to_owned(),
        ..pr
    }
}
