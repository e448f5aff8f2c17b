//! Canonical pull request records and the raw GraphQL shapes they come from.
//!
//! Public types are the normalised domain model handed to callers. Types
//! prefixed with `Api` are internal deserialisation targets; every field on
//! them is optional so that partial or malformed upstream payloads never fail
//! to parse. Conversion happens in [`crate::github::normalizer`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Aggregate reviewer verdict reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    /// The pull request has the required approvals.
    Approved,
    /// A reviewer requested changes.
    ChangesRequested,
    /// A review is required before merging.
    ReviewRequired,
}

impl ReviewDecision {
    /// Parses the GraphQL enum value, returning `None` for anything unknown.
    #[must_use]
    pub fn from_graphql(value: &str) -> Option<Self> {
        match value {
            "APPROVED" => Some(Self::Approved),
            "CHANGES_REQUESTED" => Some(Self::ChangesRequested),
            "REVIEW_REQUIRED" => Some(Self::ReviewRequired),
            _ => None,
        }
    }
}

/// Whether the pull request can be merged cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeableState {
    /// The pull request can be merged.
    Mergeable,
    /// The pull request has conflicts.
    Conflicting,
    /// GitHub has not computed mergeability yet.
    Unknown,
}

impl MergeableState {
    /// Parses the GraphQL enum value, returning `None` for anything unknown.
    #[must_use]
    pub fn from_graphql(value: &str) -> Option<Self> {
        match value {
            "MERGEABLE" => Some(Self::Mergeable),
            "CONFLICTING" => Some(Self::Conflicting),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// State of one reviewer's participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// The reviewer approved.
    Approved,
    /// The reviewer requested changes.
    ChangesRequested,
    /// The reviewer left comments only.
    Commented,
    /// The review was dismissed.
    Dismissed,
    /// The reviewer was requested but has not submitted.
    Pending,
}

impl ReviewStatus {
    /// Parses the GraphQL review state.
    ///
    /// Unrecognised states fall back to [`ReviewStatus::Commented`], the
    /// least assertive verdict.
    #[must_use]
    pub fn from_graphql(value: &str) -> Self {
        match value {
            "APPROVED" => Self::Approved,
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "DISMISSED" => Self::Dismissed,
            "PENDING" => Self::Pending,
            _ => Self::Commented,
        }
    }
}

/// One reviewer's latest state on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Reviewer login (team name for team requests).
    pub login: String,
    /// Avatar URL when GitHub returned one.
    pub avatar_url: Option<String>,
    /// Review verdict.
    pub state: ReviewStatus,
    /// Submission timestamp; `None` for pending requests.
    pub submitted_at: Option<String>,
}

/// A reviewer (user or team) whose review has been requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedReviewer {
    /// User login or team name.
    pub login: String,
    /// Avatar URL for users; teams have none.
    pub avatar_url: Option<String>,
}

/// Pull request label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Hex colour without the leading `#`.
    pub color: String,
}

/// Repository reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Short repository name.
    pub name: String,
    /// Fully qualified `owner/name`.
    pub name_with_owner: String,
    /// Owner login.
    pub owner: String,
}

/// Organization member shown in reviewer/author pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMember {
    /// Member login.
    pub login: String,
    /// Avatar URL.
    pub avatar_url: String,
}

/// Canonical, normalised pull request record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Pull request number, unique within its repository.
    pub number: u64,
    /// Title of the pull request.
    pub title: String,
    /// HTML URL; globally unique and used for de-duplication.
    pub url: String,
    /// Repository the pull request belongs to.
    pub repository: Repository,
    /// Author login (`unknown` when GitHub omitted the author).
    pub author: String,
    /// Whether the pull request is a draft.
    pub is_draft: bool,
    /// Creation timestamp (ISO 8601, UTC).
    pub created_at: String,
    /// Last update timestamp (ISO 8601, UTC).
    pub updated_at: String,
    /// Source branch.
    pub head_ref_name: Option<String>,
    /// Target branch.
    pub base_ref_name: Option<String>,
    /// Mergeability.
    pub mergeable: Option<MergeableState>,
    /// Aggregate review decision.
    pub review_decision: Option<ReviewDecision>,
    /// Status-check rollup state of the latest commit.
    pub ci_status: Option<String>,
    /// Number of review threads not marked resolved.
    pub unresolved_count: u32,
    /// True iff `review_decision` is [`ReviewDecision::Approved`].
    pub is_approved: bool,
    /// Labels in GitHub order.
    pub labels: Vec<Label>,
    /// Latest submitted review per reviewer, followed by pending requests.
    pub reviews: Vec<ReviewState>,
    /// Every requested reviewer, in request order.
    pub review_requests: Vec<RequestedReviewer>,
}

impl PullRequest {
    /// Returns true when `login` is among the requested reviewers.
    #[must_use]
    pub fn is_review_requested_from(&self, login: &str) -> bool {
        self.review_requests
            .iter()
            .any(|reviewer| reviewer.login == login)
    }
}

/// Generic GraphQL connection with a `nodes` list.
///
/// Nodes that are null or of the wrong shape are kept as `None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub(crate) struct ApiConnection<T> {
    #[serde(default = "Vec::new", deserialize_with = "lenient_nodes")]
    pub(crate) nodes: Vec<Option<T>>,
}

impl<T> Default for ApiConnection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> ApiConnection<T> {
    /// Iterates over the non-null nodes.
    pub(crate) fn present(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

fn lenient_nodes<'de, D, T>(deserializer: D) -> Result<Vec<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let nodes = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(nodes)
}

/// Reads an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiActor {
    #[serde(deserialize_with = "lenient")]
    pub(crate) login: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) avatar_url: Option<String>,
    /// Team requests expose a name instead of a login.
    #[serde(deserialize_with = "lenient")]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiRepositoryOwner {
    #[serde(deserialize_with = "lenient")]
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiRepository {
    #[serde(deserialize_with = "lenient")]
    pub(crate) name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) name_with_owner: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) owner: Option<ApiRepositoryOwner>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiLabel {
    #[serde(deserialize_with = "lenient")]
    pub(crate) name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiStatusCheckRollup {
    #[serde(deserialize_with = "lenient")]
    pub(crate) state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiCommit {
    #[serde(deserialize_with = "lenient")]
    pub(crate) status_check_rollup: Option<ApiStatusCheckRollup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiCommitNode {
    #[serde(deserialize_with = "lenient")]
    pub(crate) commit: Option<ApiCommit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiReview {
    #[serde(deserialize_with = "lenient")]
    pub(crate) author: Option<ApiActor>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) state: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiReviewRequest {
    #[serde(deserialize_with = "lenient")]
    pub(crate) requested_reviewer: Option<ApiActor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiReviewThread {
    #[serde(deserialize_with = "lenient")]
    pub(crate) is_resolved: Option<bool>,
}

/// Raw pull request node as returned by search and detail queries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiPullRequest {
    #[serde(deserialize_with = "lenient")]
    pub(crate) number: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) created_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) updated_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) is_draft: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) head_ref_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) base_ref_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) mergeable: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) review_decision: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) author: Option<ApiActor>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) repository: Option<ApiRepository>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) labels: Option<ApiConnection<ApiLabel>>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) commits: Option<ApiConnection<ApiCommitNode>>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) reviews: Option<ApiConnection<ApiReview>>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) review_requests: Option<ApiConnection<ApiReviewRequest>>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) review_threads: Option<ApiConnection<ApiReviewThread>>,
}

/// Raw organization member node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ApiMember {
    #[serde(deserialize_with = "lenient")]
    pub(crate) login: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub(crate) avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{
        ApiConnection, ApiPullRequest, ApiReview, MergeableState, PullRequest, RequestedReviewer,
        ReviewDecision, ReviewStatus,
    };

    #[test]
    fn api_pull_request_deserialises_from_partial_json() {
        let value = json!({
            "number": 7,
            "title": "Add cache",
            "reviews": null,
            "labels": { "nodes": null },
            "reviewThreads": { "nodes": [null, { "isResolved": false }] }
        });

        let api: ApiPullRequest =
            serde_json::from_value(value).expect("ApiPullRequest should deserialise");
        assert_eq!(api.number, Some(7));
        assert_eq!(api.title.as_deref(), Some("Add cache"));
        assert!(api.reviews.is_none());
        assert_eq!(api.labels.map(|labels| labels.present().count()), Some(0));
        assert_eq!(
            api.review_threads
                .map(|threads| threads.present().count())
                .unwrap_or_default(),
            1
        );
    }

    #[test]
    fn api_connection_defaults_missing_nodes() {
        let connection: ApiConnection<ApiReview> =
            serde_json::from_value(json!({})).expect("connection should deserialise");
        assert_eq!(connection.present().count(), 0);
    }

    #[rstest]
    #[case("APPROVED", Some(ReviewDecision::Approved))]
    #[case("CHANGES_REQUESTED", Some(ReviewDecision::ChangesRequested))]
    #[case("REVIEW_REQUIRED", Some(ReviewDecision::ReviewRequired))]
    #[case("SOMETHING_NEW", None)]
    fn review_decision_parsing(#[case] raw: &str, #[case] expected: Option<ReviewDecision>) {
        assert_eq!(ReviewDecision::from_graphql(raw), expected);
    }

    #[rstest]
    #[case("MERGEABLE", Some(MergeableState::Mergeable))]
    #[case("CONFLICTING", Some(MergeableState::Conflicting))]
    #[case("UNKNOWN", Some(MergeableState::Unknown))]
    #[case("", None)]
    fn mergeable_parsing(#[case] raw: &str, #[case] expected: Option<MergeableState>) {
        assert_eq!(MergeableState::from_graphql(raw), expected);
    }

    #[test]
    fn unknown_review_states_degrade_to_commented() {
        assert_eq!(ReviewStatus::from_graphql("NEW_STATE"), ReviewStatus::Commented);
    }

    #[test]
    fn pull_request_serialises_with_camel_case_keys() {
        let pr = PullRequest {
            number: 1,
            url: "https://github.com/acme/api/pull/1".to_owned(),
            is_approved: true,
            review_decision: Some(ReviewDecision::Approved),
            review_requests: vec![RequestedReviewer {
                login: "alice".to_owned(),
                avatar_url: None,
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&pr).expect("pull request should serialise");
        assert_eq!(value["isApproved"], json!(true));
        assert_eq!(value["reviewDecision"], json!("APPROVED"));
        assert_eq!(value["reviewRequests"][0]["login"], json!("alice"));
        assert!(pr.is_review_requested_from("alice"));
        assert!(!pr.is_review_requested_from("bob"));
    }
}
