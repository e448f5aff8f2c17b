//! Octocrab-backed GraphQL transport.

use std::time::Duration;

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;
use serde_json::Value;
use tracing::debug;

use super::GraphqlTransport;
use super::client::build_octocrab_client;
use super::error_mapping::{map_http_error, map_octocrab_error};
use super::payload::decode_graphql_body;
use crate::github::error::FetchError;
use crate::github::query::GraphqlRequest;
use crate::github::scope::PersonalAccessToken;

const OPERATION: &str = "graphql request";

/// Transport posting GraphQL documents to `<api_base>/graphql`.
pub struct OctocrabGraphqlTransport {
    client: Octocrab,
    endpoint: Uri,
}

impl OctocrabGraphqlTransport {
    /// Creates a transport from an existing client and endpoint.
    #[must_use]
    pub const fn new(client: Octocrab, endpoint: Uri) -> Self {
        Self { client, endpoint }
    }

    /// Builds an authenticated transport for `api_base`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Configuration` when `api_base` is not a valid
    /// URI, or a mapped Octocrab error when the client cannot be built.
    pub fn for_token(
        token: &PersonalAccessToken,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base = api_base.trim_end_matches('/');
        let endpoint: Uri =
            format!("{base}/graphql")
                .parse()
                .map_err(|error| FetchError::Configuration {
                    message: format!("invalid API base `{api_base}`: {error}"),
                })?;
        let client = build_octocrab_client(token, base, timeout)?;
        Ok(Self::new(client, endpoint))
    }
}

#[async_trait]
impl GraphqlTransport for OctocrabGraphqlTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, FetchError> {
        debug!(endpoint = %self.endpoint, "posting GraphQL request");

        let response = self
            .client
            ._post(self.endpoint.clone(), Some(request))
            .await
            .map_err(|error| map_octocrab_error(OPERATION, &error))?;

        let status = response.status();
        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error(OPERATION, &error))?;

        if !status.is_success() {
            return Err(map_http_error(OPERATION, status, &body));
        }

        decode_graphql_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};
    use serde_json::json;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::OctocrabGraphqlTransport;
    use crate::github::error::FetchError;
    use crate::github::gateway::GraphqlTransport;
    use crate::github::query::{GraphqlRequest, VIEWER_LOGIN};
    use crate::github::scope::PersonalAccessToken;

    struct TransportTestContext {
        runtime: Runtime,
        server: MockServer,
    }

    impl TransportTestContext {
        fn transport(&self) -> OctocrabGraphqlTransport {
            let token = PersonalAccessToken::new("ghp_example").expect("token should be valid");
            let _guard = self.runtime.enter();
            OctocrabGraphqlTransport::for_token(&token, &self.server.uri(), Duration::from_secs(5))
                .expect("transport should build")
        }

        fn mount(&self, response: ResponseTemplate) {
            self.runtime.block_on(
                Mock::given(method("POST"))
                    .and(path("/graphql"))
                    .respond_with(response)
                    .mount(&self.server),
            );
        }

        fn execute(&self, request: &GraphqlRequest) -> Result<serde_json::Value, FetchError> {
            let transport = self.transport();
            self.runtime.block_on(transport.execute(request))
        }
    }

    #[fixture]
    fn context() -> TransportTestContext {
        let runtime = Runtime::new().expect("runtime should start");
        let server = runtime.block_on(MockServer::start());
        TransportTestContext { runtime, server }
    }

    #[rstest]
    fn sends_headers_and_body_and_returns_data(context: TransportTestContext) {
        context.runtime.block_on(
            Mock::given(method("POST"))
                .and(path("/graphql"))
                .and(header("authorization", "Bearer ghp_example"))
                .and(header("x-github-api-version", "2022-11-28"))
                .and(body_partial_json(json!({"variables": {"login": "acme"}})))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"data": {"viewer": {"login": "octocat"}}})),
                )
                .expect(1)
                .mount(&context.server),
        );

        let request = GraphqlRequest::new(VIEWER_LOGIN).with_variable("login", "acme");
        let data = context.execute(&request).expect("request should succeed");

        assert_eq!(data, json!({"viewer": {"login": "octocat"}}));
    }

    #[rstest]
    fn non_success_status_is_upstream_rejection_with_body(context: TransportTestContext) {
        context.mount(ResponseTemplate::new(502).set_body_string("bad gateway"));

        let error = context
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .expect_err("request should fail");

        assert_eq!(
            error,
            FetchError::UpstreamRejected {
                status: Some(502),
                message: "graphql request failed: bad gateway".to_owned(),
            }
        );
    }

    #[rstest]
    fn payload_errors_are_graph_failures(context: TransportTestContext) {
        context.mount(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Could not resolve to an Organization"}, {"message": "rate limited"}]
        })));

        let error = context
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .expect_err("request should fail");

        assert_eq!(
            error,
            FetchError::Graph {
                message: "Could not resolve to an Organization, rate limited".to_owned(),
            }
        );
    }

    #[test]
    fn unreachable_host_is_network_failure() {
        let runtime = Runtime::new().expect("runtime should start");
        let token = PersonalAccessToken::new("ghp_example").expect("token should be valid");
        let transport = {
            let _guard = runtime.enter();
            OctocrabGraphqlTransport::for_token(&token, "http://127.0.0.1:9", Duration::from_secs(2))
                .expect("transport should build")
        };

        let error = runtime
            .block_on(transport.execute(&GraphqlRequest::new(VIEWER_LOGIN)))
            .expect_err("request should fail");

        assert!(
            matches!(error, FetchError::Network { .. }),
            "expected Network, got {error:?}"
        );
    }
}
