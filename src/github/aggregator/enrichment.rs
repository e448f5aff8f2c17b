//! Per pull request detail enrichment.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::PullRequestAggregator;
use crate::github::error::FetchError;
use crate::github::gateway::GraphqlTransport;
use crate::github::models::PullRequest;
use crate::github::normalizer::normalize_pull_request;
use crate::github::ordering::sort_for_dashboard;
use crate::github::query::{GraphqlRequest, PULL_REQUEST_DETAILS};

/// What [`PullRequestAggregator::enrich_details`] does when one detail
/// lookup fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrichmentFailurePolicy {
    /// Any failed lookup fails the whole batch.
    #[default]
    FailBatch,
    /// Failed lookups leave their pull request as it was.
    KeepUnenriched,
}

impl<T: GraphqlTransport + ?Sized + 'static> PullRequestAggregator<T> {
    /// Re-reads review and merge state for each pull request, concurrently.
    ///
    /// Every lookup runs to completion before results are combined. The
    /// enriched list is returned in dashboard order.
    ///
    /// # Errors
    ///
    /// With [`EnrichmentFailurePolicy::FailBatch`], returns the error of the
    /// first pull request (in input order) whose lookup failed.
    pub async fn enrich_details(
        &self,
        pull_requests: Vec<PullRequest>,
    ) -> Result<Vec<PullRequest>, FetchError> {
        debug!(count = pull_requests.len(), "enriching pull request details");

        let mut tasks = JoinSet::new();
        for (index, pr) in pull_requests.iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let request = detail_request(pr);
            let label = format!("{}#{}", pr.repository.name_with_owner, pr.number);
            tasks.spawn(async move {
                let result = fetch_details(transport.as_ref(), &request, &label).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<PullRequest, FetchError>>> =
            pull_requests.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(error) => warn!(%error, "detail task did not complete"),
            }
        }

        let mut enriched = Vec::with_capacity(pull_requests.len());
        for (pr, slot) in pull_requests.into_iter().zip(slots) {
            let outcome = slot.unwrap_or_else(|| {
                Err(FetchError::TaskFailed {
                    message: format!("detail task for {} did not complete", pr.url),
                })
            });
            match (outcome, self.enrichment_policy) {
                (Ok(details), _) => enriched.push(apply_details(pr, details)),
                (Err(error), EnrichmentFailurePolicy::FailBatch) => return Err(error),
                (Err(error), EnrichmentFailurePolicy::KeepUnenriched) => {
                    warn!(url = %pr.url, %error, "keeping pull request without details");
                    enriched.push(pr);
                }
            }
        }

        sort_for_dashboard(&mut enriched);
        Ok(enriched)
    }
}

fn detail_request(pr: &PullRequest) -> GraphqlRequest {
    GraphqlRequest::new(PULL_REQUEST_DETAILS)
        .with_variable("owner", pr.repository.owner.as_str())
        .with_variable("name", pr.repository.name.as_str())
        .with_variable("number", pr.number)
}

async fn fetch_details<T: GraphqlTransport + ?Sized>(
    transport: &T,
    request: &GraphqlRequest,
    label: &str,
) -> Result<PullRequest, FetchError> {
    let data = transport.execute(request).await?;
    data.pointer("/repository/pullRequest")
        .and_then(|node| normalize_pull_request(node, None))
        .ok_or_else(|| FetchError::MalformedResponse {
            message: format!("pull request {label} not found"),
        })
}

/// Overlays review and merge state from `details` onto `base`.
fn apply_details(base: PullRequest, details: PullRequest) -> PullRequest {
    PullRequest {
        head_ref_name: details.head_ref_name,
        base_ref_name: details.base_ref_name,
        mergeable: details.mergeable,
        review_decision: details.review_decision,
        is_approved: details.is_approved,
        ci_status: details.ci_status,
        unresolved_count: details.unresolved_count,
        reviews: details.reviews,
        review_requests: details.review_requests,
        ..base
    }
}
