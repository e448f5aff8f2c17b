//! Merging, de-duplication and dashboard ordering of pull requests.
//!
//! Pull requests are de-duplicated by URL (first occurrence wins) and then
//! sorted so that work needing attention comes first:
//! unapproved before approved, more unresolved threads first, and most
//! recently updated first.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::models::PullRequest;

/// Concatenates result sets and removes duplicate URLs, keeping the first.
///
/// Inputs are not modified; a new list is returned.
#[must_use]
pub fn merge_unique<'a, I>(sources: I) -> Vec<PullRequest>
where
    I: IntoIterator<Item = &'a [PullRequest]>,
{
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .flatten()
        .filter(|pr| seen.insert(pr.url.as_str()))
        .cloned()
        .collect()
}

/// Removes duplicate URLs from an owned list, keeping first occurrences.
#[must_use]
pub fn dedup_by_url(pull_requests: Vec<PullRequest>) -> Vec<PullRequest> {
    let mut seen = HashSet::new();
    pull_requests
        .into_iter()
        .filter(|pr| seen.insert(pr.url.clone()))
        .collect()
}

/// Sorts pull requests in dashboard order. The sort is stable.
pub fn sort_for_dashboard(pull_requests: &mut [PullRequest]) {
    pull_requests.sort_by(compare_for_dashboard);
}

/// De-duplicates and sorts in one step.
#[must_use]
pub fn dedup_and_sort(pull_requests: Vec<PullRequest>) -> Vec<PullRequest> {
    let mut unique = dedup_by_url(pull_requests);
    sort_for_dashboard(&mut unique);
    unique
}

fn compare_for_dashboard(a: &PullRequest, b: &PullRequest) -> Ordering {
    a.is_approved
        .cmp(&b.is_approved)
        .then_with(|| b.unresolved_count.cmp(&a.unresolved_count))
        // ISO 8601 UTC timestamps order lexicographically.
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}
