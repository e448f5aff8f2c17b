//! Conversion of raw GraphQL nodes into canonical records.
//!
//! All leniency lives here: every optional path defaults to an empty or null
//! value, and a nested value of the wrong type reads as absent, so the rest
//! of the crate only handles [`PullRequest`], [`Repository`] and
//! [`OrgMember`]. A node is skipped only when it is null, an empty object
//! (non-PR search hits), or not an object at all.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::models::{
    ApiConnection, ApiMember, ApiPullRequest, ApiRepository, ApiReview, ApiReviewRequest,
    ApiReviewThread, Label, MergeableState, OrgMember, PullRequest, Repository, RequestedReviewer,
    ReviewDecision, ReviewState, ReviewStatus,
};

const UNKNOWN_AUTHOR: &str = "unknown";

fn parse_node<T: DeserializeOwned>(node: &Value, kind: &str) -> Option<T> {
    match node {
        Value::Object(fields) if !fields.is_empty() => {
            match serde_json::from_value(node.clone()) {
                Ok(parsed) => Some(parsed),
                Err(error) => {
                    warn!(kind, %error, "skipping unreadable node");
                    None
                }
            }
        }
        _ => None,
    }
}

/// Normalises one raw pull request node.
///
/// `repository` replaces the node's own repository reference when given.
/// Returns `None` only for absent nodes.
#[must_use]
pub fn normalize_pull_request(node: &Value, repository: Option<&Repository>) -> Option<PullRequest> {
    let raw: ApiPullRequest = parse_node(node, "pull request")?;
    Some(build_pull_request(raw, repository))
}

fn build_pull_request(raw: ApiPullRequest, repository: Option<&Repository>) -> PullRequest {
    let reviews = raw.reviews.unwrap_or_default();
    let requests: Vec<ApiReviewRequest> = raw.review_requests.unwrap_or_default().present().collect();

    let submitted = latest_review_per_reviewer(reviews);
    let pending = pending_reviewers(&requests, &submitted);
    let review_decision = raw
        .review_decision
        .as_deref()
        .and_then(ReviewDecision::from_graphql);

    PullRequest {
        number: raw.number.unwrap_or_default(),
        title: raw.title.unwrap_or_default(),
        url: raw.url.unwrap_or_default(),
        repository: repository
            .cloned()
            .unwrap_or_else(|| raw.repository.map(repository_reference).unwrap_or_default()),
        author: raw
            .author
            .and_then(|author| author.login)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
        is_draft: raw.is_draft.unwrap_or_default(),
        created_at: raw.created_at.unwrap_or_default(),
        updated_at: raw.updated_at.unwrap_or_default(),
        head_ref_name: raw.head_ref_name,
        base_ref_name: raw.base_ref_name,
        mergeable: raw.mergeable.as_deref().and_then(MergeableState::from_graphql),
        is_approved: review_decision == Some(ReviewDecision::Approved),
        review_decision,
        ci_status: raw
            .commits
            .unwrap_or_default()
            .present()
            .last()
            .and_then(|node| node.commit)
            .and_then(|commit| commit.status_check_rollup)
            .and_then(|rollup| rollup.state),
        unresolved_count: unresolved_threads(raw.review_threads.unwrap_or_default()),
        labels: raw
            .labels
            .unwrap_or_default()
            .present()
            .filter_map(|label| {
                Some(Label {
                    name: label.name.filter(|name| !name.is_empty())?,
                    color: label.color.unwrap_or_default(),
                })
            })
            .collect(),
        reviews: submitted.into_iter().chain(pending).collect(),
        review_requests: requests
            .iter()
            .filter_map(requested_reviewer)
            .collect(),
    }
}

/// Keeps the latest submission per reviewer, in first-appearance order.
///
/// Timestamps compare as strings; a missing timestamp is treated as the
/// empty string and so loses against any real one. Ties keep the earlier
/// entry.
fn latest_review_per_reviewer(reviews: ApiConnection<ApiReview>) -> Vec<ReviewState> {
    let mut latest: Vec<ReviewState> = Vec::new();

    for review in reviews.present() {
        let (login, avatar_url) = review.author.map_or_else(
            || (UNKNOWN_AUTHOR.to_owned(), None),
            |author| {
                (
                    author.login.unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
                    author.avatar_url,
                )
            },
        );
        let candidate = ReviewState {
            login,
            avatar_url,
            state: review
                .state
                .as_deref()
                .map_or(ReviewStatus::Commented, ReviewStatus::from_graphql),
            submitted_at: review.submitted_at,
        };

        match latest.iter_mut().find(|kept| kept.login == candidate.login) {
            Some(kept) if submitted_key(&candidate) > submitted_key(kept) => *kept = candidate,
            Some(_) => {}
            None => latest.push(candidate),
        }
    }

    latest
}

fn submitted_key(review: &ReviewState) -> &str {
    review.submitted_at.as_deref().unwrap_or_default()
}

fn requested_reviewer(request: &ApiReviewRequest) -> Option<RequestedReviewer> {
    let reviewer = request.requested_reviewer.as_ref()?;
    let login = reviewer
        .login
        .as_ref()
        .or(reviewer.name.as_ref())
        .filter(|login| !login.is_empty())?;

    Some(RequestedReviewer {
        login: login.clone(),
        avatar_url: reviewer.avatar_url.clone(),
    })
}

/// Requested reviewers who have not submitted a review, each listed once.
fn pending_reviewers(requests: &[ApiReviewRequest], submitted: &[ReviewState]) -> Vec<ReviewState> {
    let mut listed: HashSet<String> = submitted.iter().map(|review| review.login.clone()).collect();

    requests
        .iter()
        .filter_map(requested_reviewer)
        .filter(|reviewer| listed.insert(reviewer.login.clone()))
        .map(|reviewer| ReviewState {
            login: reviewer.login,
            avatar_url: reviewer.avatar_url,
            state: ReviewStatus::Pending,
            submitted_at: None,
        })
        .collect()
}

// Threads without `isResolved` count as resolved.
fn unresolved_threads(threads: ApiConnection<ApiReviewThread>) -> u32 {
    let count = threads
        .present()
        .filter(|thread| thread.is_resolved == Some(false))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn repository_reference(raw: ApiRepository) -> Repository {
    let name = raw.name.unwrap_or_default();
    let owner = raw
        .owner
        .and_then(|owner| owner.login)
        .or_else(|| {
            raw.name_with_owner
                .as_deref()
                .and_then(|full| full.split_once('/'))
                .map(|(owner, _)| owner.to_owned())
        })
        .unwrap_or_default();
    let name_with_owner = raw
        .name_with_owner
        .unwrap_or_else(|| format!("{owner}/{name}"));

    Repository {
        name,
        name_with_owner,
        owner,
    }
}

/// Normalises one raw repository node; nodes without a name are skipped.
#[must_use]
pub fn normalize_repository(node: &Value) -> Option<Repository> {
    let raw: ApiRepository = parse_node(node, "repository")?;
    raw.name.as_ref().filter(|name| !name.is_empty())?;
    Some(repository_reference(raw))
}

/// Normalises one raw member node; nodes without a login are skipped.
#[must_use]
pub fn normalize_member(node: &Value) -> Option<OrgMember> {
    let raw: ApiMember = parse_node(node, "member")?;
    let login = raw.login.filter(|login| !login.is_empty())?;
    Some(OrgMember {
        login,
        avatar_url: raw.avatar_url.unwrap_or_default(),
    })
}
