//! Decoding of GraphQL response envelopes shared by all transports.

use serde::Deserialize;
use serde_json::Value;

use crate::github::error::FetchError;

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

/// Parses a raw `{data, errors?}` body and returns the `data` member.
///
/// # Errors
///
/// Returns `FetchError::MalformedResponse` when the body is not JSON or has
/// no `data`, and `FetchError::Graph` when a non-empty `errors` array is
/// present. Payload errors take precedence over partial data.
pub(super) fn decode_graphql_body(body: &str) -> Result<Value, FetchError> {
    let envelope: GraphqlEnvelope =
        serde_json::from_str(body).map_err(|error| FetchError::MalformedResponse {
            message: format!("GraphQL response is not valid JSON: {error}"),
        })?;

    if let Some(errors) = envelope.errors
        && !errors.is_empty()
    {
        let message = errors
            .into_iter()
            .map(|entry| entry.message.unwrap_or_else(|| "unknown error".to_owned()))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(FetchError::Graph { message });
    }

    match envelope.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(FetchError::MalformedResponse {
            message: "GraphQL response has no data".to_owned(),
        }),
    }
}
