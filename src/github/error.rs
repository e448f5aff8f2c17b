//! Error types exposed by the GitHub aggregation layer.

use thiserror::Error;

/// Errors surfaced while configuring the dashboard or talking to GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// No credential was configured.
    #[error(
        "GitHub token not configured: pass --token, or set PRDASH_TOKEN or GITHUB_TOKEN"
    )]
    MissingCredential,

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// GitHub (or the `gh` CLI) answered with a non-success status.
    #[error("GitHub API request failed{}: {message}", status_suffix(*.status))]
    UpstreamRejected {
        /// HTTP status code or process exit code, when known.
        status: Option<u16>,
        /// Response body or stderr describing the failure.
        message: String,
    },

    /// The GraphQL payload carried an `errors` array.
    #[error("GraphQL error: {message}")]
    Graph {
        /// All error messages, joined with `", "`.
        message: String,
    },

    /// The upstream answered but the payload could not be interpreted.
    #[error("malformed GitHub response: {message}")]
    MalformedResponse {
        /// Details about what was missing or unparsable.
        message: String,
    },

    /// A repository scope entry was not in `owner/name` form.
    #[error("repository must be in owner/name form, got `{value}`")]
    InvalidRepository {
        /// The rejected input.
        value: String,
    },

    /// A spawned fan-out task panicked or was cancelled.
    #[error("fetch task failed: {message}")]
    TaskFailed {
        /// Join error detail.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}

fn status_suffix(status: Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" with status {code}"))
}
