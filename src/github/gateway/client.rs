//! Octocrab client construction for the GraphQL transport.

use std::time::Duration;

use http::Uri;
use http::header::{ACCEPT, HeaderName};
use octocrab::Octocrab;

use crate::github::error::FetchError;
use crate::github::scope::PersonalAccessToken;

use super::error_mapping::map_octocrab_error;

const GITHUB_JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Builds an authenticated Octocrab client for the given API base.
///
/// Every request carries the GitHub JSON media type and pinned API version
/// headers, and is bounded by `timeout` for connecting, reading and writing.
///
/// # Errors
///
/// Returns `FetchError::Configuration` when the base URI cannot be parsed
/// and a mapped Octocrab error when the client cannot be constructed.
pub(super) fn build_octocrab_client(
    token: &PersonalAccessToken,
    api_base: &str,
    timeout: Duration,
) -> Result<Octocrab, FetchError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| FetchError::Configuration {
            message: format!("invalid API base `{api_base}`: {error}"),
        })?;

    Octocrab::builder()
        .personal_token(token.value())
        .base_uri(base_uri)
        .map_err(|error| FetchError::Configuration {
            message: format!("build client failed: {error}"),
        })?
        .add_header(ACCEPT, GITHUB_JSON_MEDIA_TYPE.to_owned())
        .add_header(
            HeaderName::from_static("x-github-api-version"),
            GITHUB_API_VERSION.to_owned(),
        )
        .set_connect_timeout(Some(timeout))
        .set_read_timeout(Some(timeout))
        .set_write_timeout(Some(timeout))
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}
