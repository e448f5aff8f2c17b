//! Transports that execute GraphQL documents against GitHub.
//!
//! Every fetch in the crate goes through [`GraphqlTransport`]: one
//! authenticated request in, the parsed `data` member out. The HTTP variant
//! talks to the API through Octocrab; the CLI variant shells out to
//! `gh api graphql`. Both surface network failures, non-success statuses and
//! payload-level `errors` as distinct [`FetchError`] variants.

mod client;
mod error_mapping;
mod gh_cli;
mod graphql;
mod payload;
#[cfg(any(test, feature = "test-support"))]
mod scripted;

pub use gh_cli::GhCliTransport;
pub use graphql::OctocrabGraphqlTransport;
#[cfg(any(test, feature = "test-support"))]
pub use scripted::{ScriptedTransport, document_contains, variable_equals};

use async_trait::async_trait;
use serde_json::Value;

use crate::github::error::FetchError;
use crate::github::query::GraphqlRequest;

/// Executes a single authenticated GraphQL request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Sends `request` and returns the response's `data` member.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` for connection failures,
    /// `FetchError::UpstreamRejected` for non-success statuses,
    /// `FetchError::Graph` when the payload carries `errors`, and
    /// `FetchError::MalformedResponse` when no usable `data` is present.
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, FetchError>;
}
