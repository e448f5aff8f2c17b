//! GraphQL transport that shells out to the GitHub CLI.
//!
//! The request is written as JSON to `gh api graphql --input -`, so the
//! CLI's own authentication is used instead of a configured token.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::GraphqlTransport;
use super::payload::decode_graphql_body;
use crate::github::error::FetchError;
use crate::github::query::GraphqlRequest;

const DEFAULT_PROGRAM: &str = "gh";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport running `gh api graphql` once per request.
#[derive(Debug, Clone)]
pub struct GhCliTransport {
    program: OsString,
    leading_args: Vec<OsString>,
    hostname: Option<String>,
    timeout: Duration,
}

impl Default for GhCliTransport {
    fn default() -> Self {
        Self {
            program: OsString::from(DEFAULT_PROGRAM),
            leading_args: Vec::new(),
            hostname: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GhCliTransport {
    /// Uses `gh` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `program` with `leading_args` in place of `gh`, e.g. a wrapper.
    #[must_use]
    pub fn with_command<I, S>(mut self, program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.program = program.into();
        self.leading_args = leading_args.into_iter().map(Into::into).collect();
        self
    }

    /// Targets a GitHub Enterprise host via `--hostname`.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Bounds each invocation; the child is killed when it elapses.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(["api", "graphql", "--input", "-"]);
        if let Some(hostname) = &self.hostname {
            command.args(["--hostname", hostname]);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

#[async_trait]
impl GraphqlTransport for GhCliTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, FetchError> {
        let input = serde_json::to_vec(request).map_err(|error| FetchError::MalformedResponse {
            message: format!("encode GraphQL request: {error}"),
        })?;

        debug!(program = %self.program_name(), "running GraphQL request through CLI");
        let mut child = self.command().spawn().map_err(|error| FetchError::Network {
            message: format!("failed to run `{}`: {error}", self.program_name()),
        })?;

        let stdin = child.stdin.take();
        let run = async {
            if let Some(mut pipe) = stdin {
                pipe.write_all(&input)
                    .await
                    .map_err(|error| FetchError::Network {
                        message: format!("write request to `{}`: {error}", self.program_name()),
                    })?;
            }
            child
                .wait_with_output()
                .await
                .map_err(|error| FetchError::Network {
                    message: format!("wait for `{}`: {error}", self.program_name()),
                })
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| FetchError::Network {
                message: format!(
                    "`{}` did not finish within {:?}",
                    self.program_name(),
                    self.timeout
                ),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            return decode_graphql_body(&stdout);
        }

        // gh exits non-zero for payload errors too; keep those distinguishable.
        if let Err(graph_error @ FetchError::Graph { .. }) = decode_graphql_body(&stdout) {
            return Err(graph_error);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_owned()
        } else {
            stderr.trim().to_owned()
        };
        Err(FetchError::UpstreamRejected {
            status: output
                .status
                .code()
                .and_then(|code| u16::try_from(code).ok()),
            message: detail,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use serde_json::json;

    use super::GhCliTransport;
    use crate::github::error::FetchError;
    use crate::github::gateway::GraphqlTransport;
    use crate::github::query::{GraphqlRequest, VIEWER_LOGIN};

    fn scripted_shell(script: &str) -> GhCliTransport {
        GhCliTransport::new().with_command("sh", ["-c", script, "gh"])
    }

    #[tokio::test]
    async fn returns_data_from_stdout() {
        let transport = scripted_shell(
            r#"cat >/dev/null; printf '%s' '{"data":{"viewer":{"login":"octocat"}}}'"#,
        );

        let data = transport
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .await
            .expect("request should succeed");

        assert_eq!(data, json!({"viewer": {"login": "octocat"}}));
    }

    #[tokio::test]
    async fn forwards_request_on_stdin() {
        // Echo stdin back wrapped as the `data` member.
        let transport = scripted_shell(r#"printf '{"data":'; cat; printf '}'"#);
        let request = GraphqlRequest::new(VIEWER_LOGIN).with_variable("login", "acme");

        let data = transport
            .execute(&request)
            .await
            .expect("request should succeed");

        assert_eq!(data.pointer("/variables/login"), Some(&json!("acme")));
        assert_eq!(data.pointer("/query"), Some(&json!(VIEWER_LOGIN)));
    }

    #[rstest]
    #[case::stderr_detail("cat >/dev/null; echo 'HTTP 401: Bad credentials' >&2; exit 1", "HTTP 401: Bad credentials")]
    #[case::stdout_fallback("cat >/dev/null; echo 'gone'; exit 4", "gone")]
    #[tokio::test]
    async fn non_zero_exit_is_upstream_rejection(#[case] script: &str, #[case] expected: &str) {
        let error = scripted_shell(script)
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .await
            .expect_err("request should fail");

        assert!(
            matches!(&error, FetchError::UpstreamRejected { message, .. } if message == expected),
            "unexpected error: {error:?}"
        );
    }

    #[tokio::test]
    async fn payload_errors_survive_non_zero_exit() {
        let transport = scripted_shell(
            r#"cat >/dev/null; printf '%s' '{"errors":[{"message":"boom"}]}'; exit 1"#,
        );

        let error = transport
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .await
            .expect_err("request should fail");

        assert_eq!(
            error,
            FetchError::Graph {
                message: "boom".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn timeout_covers_a_child_that_never_reads_stdin() {
        let transport = scripted_shell("sleep 30").with_timeout(Duration::from_millis(300));
        let request =
            GraphqlRequest::new(VIEWER_LOGIN).with_variable("padding", "x".repeat(1024 * 1024));

        let outcome = tokio::time::timeout(Duration::from_secs(10), transport.execute(&request))
            .await
            .expect("execute should respect its own timeout");

        assert!(
            matches!(
                &outcome,
                Err(FetchError::Network { message }) if message.contains("did not finish")
            ),
            "expected a timeout failure, got {outcome:?}"
        );
    }

    #[tokio::test]
    async fn missing_program_is_network_failure() {
        let transport =
            GhCliTransport::new().with_command("prdash-definitely-missing-binary", Vec::<String>::new());

        let error = transport
            .execute(&GraphqlRequest::new(VIEWER_LOGIN))
            .await
            .expect_err("request should fail");

        assert!(
            matches!(error, FetchError::Network { .. }),
            "expected Network, got {error:?}"
        );
    }
}
