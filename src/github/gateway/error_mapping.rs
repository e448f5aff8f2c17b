//! Error mapping helpers for the GitHub transports.

use http::StatusCode;

use crate::github::error::FetchError;

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> FetchError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return FetchError::UpstreamRejected {
            status: Some(source.status_code.as_u16()),
            message: format!("{operation} failed: {message}", message = source.message),
        };
    }

    if is_network_error(error) {
        return FetchError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    FetchError::MalformedResponse {
        message: format!("{operation} failed: {error}"),
    }
}

/// Maps a non-success HTTP status to `UpstreamRejected`, keeping the body
/// for diagnostics.
pub(super) fn map_http_error(operation: &str, status: StatusCode, body: &str) -> FetchError {
    let trimmed = body.trim();
    let detail = if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_owned()
    } else {
        trimmed.to_owned()
    };

    FetchError::UpstreamRejected {
        status: Some(status.as_u16()),
        message: format!("{operation} failed: {detail}"),
    }
}
