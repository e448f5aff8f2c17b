//! Auxiliary lookups: the viewer, accessible repositories and members.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::PullRequestAggregator;
use crate::github::error::FetchError;
use crate::github::gateway::GraphqlTransport;
use crate::github::models::{OrgMember, Repository};
use crate::github::normalizer::{normalize_member, normalize_repository};
use crate::github::pagination::PageWalker;
use crate::github::query::{
    GraphqlRequest, ORGANIZATION_MEMBERS, ORGANIZATION_MEMBERS_CONNECTION,
    ORGANIZATION_REPOSITORIES, ORGANIZATION_REPOSITORIES_CONNECTION, VIEWER_LOGIN,
    VIEWER_REPOSITORIES, VIEWER_REPOSITORIES_CONNECTION,
};

/// Avatar used for the viewer when no organization is configured.
fn viewer_avatar_url(login: &str) -> String {
    format!("https://github.com/{login}.png?size=32")
}

impl<T: GraphqlTransport + ?Sized + 'static> PullRequestAggregator<T> {
    /// Login of the authenticated user, or `None` when it cannot be fetched.
    ///
    /// A successful lookup is remembered for the aggregator's lifetime.
    pub async fn current_user(&self) -> Option<String> {
        match self
            .viewer_login
            .get_or_try_init(|| self.fetch_viewer_login())
            .await
        {
            Ok(login) => Some(login.clone()),
            Err(error) => {
                warn!(%error, "could not determine the current user");
                None
            }
        }
    }

    async fn fetch_viewer_login(&self) -> Result<String, FetchError> {
        let data = self
            .transport
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .await?;
        data.pointer("/viewer/login")
            .and_then(serde_json::Value::as_str)
            .filter(|login| !login.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| FetchError::MalformedResponse {
                message: "viewer login missing from response".to_owned(),
            })
    }

    /// Repositories visible to the dashboard, grouped by owner login.
    ///
    /// Without organizations this lists the viewer's owned, member and
    /// collaborator repositories. Otherwise each organization's repositories
    /// are listed; organizations without repositories are omitted. With
    /// several organizations a failing one is skipped.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the viewer listing or the only
    /// configured organization fails.
    pub async fn list_accessible_repositories(
        &self,
    ) -> Result<BTreeMap<String, Vec<Repository>>, FetchError> {
        let repositories = if self.organizations.is_empty() {
            let nodes = PageWalker::new(
                self.transport.as_ref(),
                GraphqlRequest::new(VIEWER_REPOSITORIES),
                VIEWER_REPOSITORIES_CONNECTION,
            )
            .collect_nodes()
            .await?;
            nodes.iter().filter_map(normalize_repository).collect()
        } else {
            self.organization_repositories().await?
        };

        let mut grouped: BTreeMap<String, Vec<Repository>> = BTreeMap::new();
        for repository in repositories {
            grouped
                .entry(repository.owner.clone())
                .or_default()
                .push(repository);
        }
        Ok(grouped)
    }

    async fn organization_repositories(&self) -> Result<Vec<Repository>, FetchError> {
        let tolerate_failures = self.organizations.logins().len() > 1;
        let results = self
            .per_organization(|transport, organization| async move {
                let request =
                    GraphqlRequest::new(ORGANIZATION_REPOSITORIES).with_variable("login", organization);
                let nodes = PageWalker::new(
                    transport.as_ref(),
                    request,
                    ORGANIZATION_REPOSITORIES_CONNECTION,
                )
                .collect_nodes()
                .await?;
                Ok(nodes
                    .iter()
                    .filter_map(normalize_repository)
                    .collect::<Vec<_>>())
            })
            .await;

        let mut repositories = Vec::new();
        for (organization, result) in results {
            match result {
                Ok(listing) => repositories.extend(listing),
                Err(error) if tolerate_failures => {
                    warn!(%organization, %error, "repository listing failed; skipping organization");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(repositories)
    }

    /// Members of every configured organization, unique by login and sorted
    /// by login.
    ///
    /// Without organizations this is the current user alone. Failures never
    /// propagate: a page that fails ends that organization's walk but keeps
    /// the members already collected.
    pub async fn list_organization_members(&self) -> Vec<OrgMember> {
        if self.organizations.is_empty() {
            return self
                .current_user()
                .await
                .map(|login| OrgMember {
                    avatar_url: viewer_avatar_url(&login),
                    login,
                })
                .into_iter()
                .collect();
        }

        let results = self
            .per_organization(|transport, organization| async move {
                let request =
                    GraphqlRequest::new(ORGANIZATION_MEMBERS).with_variable("login", organization.clone());
                let (nodes, failure) =
                    PageWalker::new(transport.as_ref(), request, ORGANIZATION_MEMBERS_CONNECTION)
                        .collect_partial()
                        .await;
                if let Some(error) = failure {
                    warn!(
                        %organization,
                        %error,
                        kept = nodes.len(),
                        "member listing stopped early"
                    );
                }
                Ok::<_, FetchError>(nodes.iter().filter_map(normalize_member).collect::<Vec<_>>())
            })
            .await;

        let mut members: BTreeMap<String, OrgMember> = BTreeMap::new();
        for (organization, result) in results {
            match result {
                Ok(listing) => {
                    for member in listing {
                        members.entry(member.login.clone()).or_insert(member);
                    }
                }
                Err(error) => warn!(%organization, %error, "member listing failed"),
            }
        }
        debug!(members = members.len(), "organization members collected");
        members.into_values().collect()
    }
}
