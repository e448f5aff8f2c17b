//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use prdash::{FetchError, PullRequest, ReviewDecision};

/// Writes the dashboard listing to the given writer.
///
/// `now` anchors the relative "updated" ages.
pub fn write_dashboard<W: Write>(
    writer: &mut W,
    pull_requests: &[PullRequest],
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    if pull_requests.is_empty() {
        return writeln!(writer, "No open pull requests.").map_err(|e| io_error(&e));
    }

    writeln!(writer, "Open pull requests ({}):", pull_requests.len())
        .map_err(|e| io_error(&e))?;
    writeln!(writer).map_err(|e| io_error(&e))?;

    for pr in pull_requests {
        let mut details = vec![
            format!("@{}", pr.author),
            format!("updated {}", relative_age(&pr.updated_at, now)),
        ];
        if pr.unresolved_count > 0 {
            details.push(format!("{} unresolved", pr.unresolved_count));
        }
        if let Some(ci) = &pr.ci_status {
            details.push(format!("CI {}", ci.to_lowercase()));
        }

        writeln!(
            writer,
            "  [{}] {}#{} {} ({})",
            status_tag(pr),
            pr.repository.name_with_owner,
            pr.number,
            pr.title,
            details.join(", ")
        )
        .map_err(|e| io_error(&e))?;
        writeln!(writer, "      {}", pr.url).map_err(|e| io_error(&e))?;
    }

    Ok(())
}

/// Writes a refresh failure notice; the previous listing is re-rendered
/// underneath when one exists.
pub fn write_refresh_failure<W: Write>(
    writer: &mut W,
    error: &FetchError,
    previous: Option<&[PullRequest]>,
    now: DateTime<Utc>,
) -> Result<(), FetchError> {
    writeln!(writer, "Refresh failed: {error}").map_err(|e| io_error(&e))?;
    match previous {
        Some(listing) => {
            writeln!(writer, "Showing previous listing.").map_err(|e| io_error(&e))?;
            write_dashboard(writer, listing, now)
        }
        None => Ok(()),
    }
}

const fn status_tag(pr: &PullRequest) -> &'static str {
    if pr.is_draft {
        return "draft";
    }
    if pr.is_approved {
        return "approved";
    }
    match pr.review_decision {
        Some(ReviewDecision::ChangesRequested) => "changes",
        _ => "open",
    }
}

/// Renders an RFC 3339 timestamp as a coarse age such as `3h ago`.
///
/// Unparseable timestamps are returned unchanged; future ones read as
/// `just now`.
#[must_use]
pub fn relative_age(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_owned();
    };

    let elapsed = now.signed_duration_since(parsed.with_timezone(&Utc));
    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "just now".to_owned()
    }
}

/// Converts an I/O error to a [`FetchError::Io`].
pub(crate) fn io_error(error: &io::Error) -> FetchError {
    FetchError::Io {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use prdash::github::models::test_support::{pull_request, with_review_state};
    use prdash::{FetchError, PullRequest, ReviewDecision};
    use rstest::rstest;

    use super::{relative_age, write_dashboard, write_refresh_failure};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-02T12:00:00Z")
            .expect("fixed timestamp should parse")
            .with_timezone(&Utc)
    }

    fn render(pull_requests: &[PullRequest]) -> String {
        let mut buffer = Vec::new();
        write_dashboard(&mut buffer, pull_requests, now()).expect("should write dashboard");
        String::from_utf8(buffer).expect("output should be valid UTF-8")
    }

    #[rstest]
    #[case::days("2023-12-30T12:00:00Z", "3d ago")]
    #[case::hours("2024-01-02T09:30:00Z", "2h ago")]
    #[case::minutes("2024-01-02T11:45:00Z", "15m ago")]
    #[case::seconds("2024-01-02T11:59:30Z", "just now")]
    #[case::future("2024-01-03T00:00:00Z", "just now")]
    #[case::unparseable("yesterday", "yesterday")]
    fn relative_age_is_coarse(#[case] timestamp: &str, #[case] expected: &str) {
        assert_eq!(relative_age(timestamp, now()), expected);
    }

    #[test]
    fn write_dashboard_lists_each_pull_request() {
        let pr = PullRequest {
            updated_at: "2024-01-02T10:00:00Z".to_owned(),
            ci_status: Some("SUCCESS".to_owned()),
            ..with_review_state(pull_request("https://github.com/acme/api/pull/7"), true, 2)
        };

        let output = render(&[pr]);

        assert!(
            output.contains("Open pull requests (1):"),
            "missing header: {output}"
        );
        assert!(
            output.contains(
                "[approved] acme/api#7 Pull request 7 (@octocat, updated 2h ago, 2 unresolved, CI success)"
            ),
            "missing PR line: {output}"
        );
        assert!(
            output.contains("https://github.com/acme/api/pull/7"),
            "missing URL: {output}"
        );
    }

    #[rstest]
    #[case::draft(PullRequest { is_draft: true, ..pull_request("https://github.com/acme/api/pull/1") }, "[draft]")]
    #[case::changes_requested(
        PullRequest {
            review_decision: Some(ReviewDecision::ChangesRequested),
            ..pull_request("https://github.com/acme/api/pull/1")
        },
        "[changes]"
    )]
    #[case::plain(pull_request("https://github.com/acme/api/pull/1"), "[open]")]
    fn write_dashboard_tags_review_status(#[case] pr: PullRequest, #[case] tag: &str) {
        let output = render(&[pr]);
        assert!(output.contains(tag), "expected {tag} in: {output}");
    }

    #[test]
    fn write_dashboard_reports_empty_listing() {
        assert_eq!(render(&[]), "No open pull requests.\n");
    }

    #[test]
    fn refresh_failure_reprints_previous_listing() {
        let error = FetchError::Network {
            message: "connection reset".to_owned(),
        };
        let previous = vec![pull_request("https://github.com/acme/api/pull/3")];

        let mut buffer = Vec::new();
        write_refresh_failure(&mut buffer, &error, Some(&previous), now())
            .expect("should write failure notice");

        let output = String::from_utf8(buffer).expect("output should be valid UTF-8");
        assert!(
            output.contains("Refresh failed: network error talking to GitHub: connection reset"),
            "missing failure line: {output}"
        );
        assert!(output.contains("acme/api#3"), "missing previous PR: {output}");
    }
}
