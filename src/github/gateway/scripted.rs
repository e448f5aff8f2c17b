//! In-memory transport answering from a script, for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::GraphqlTransport;
use crate::github::error::FetchError;
use crate::github::query::GraphqlRequest;

type Matcher = Box<dyn Fn(&GraphqlRequest) -> bool + Send + Sync>;

struct Rule {
    matcher: Matcher,
    responses: VecDeque<Result<Value, FetchError>>,
}

/// Transport that records requests and replies from scripted rules.
///
/// Rules are checked in registration order. Each rule replays its responses
/// in sequence and keeps repeating the last one. An unmatched request fails
/// with `FetchError::MalformedResponse`.
#[derive(Default)]
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<GraphqlRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers matching requests with `response`.
    #[must_use]
    pub fn on(
        self,
        matcher: impl Fn(&GraphqlRequest) -> bool + Send + Sync + 'static,
        response: Result<Value, FetchError>,
    ) -> Self {
        self.on_sequence(matcher, vec![response])
    }

    /// Answers matching requests with `responses` in order.
    #[must_use]
    pub fn on_sequence(
        self,
        matcher: impl Fn(&GraphqlRequest) -> bool + Send + Sync + 'static,
        responses: Vec<Result<Value, FetchError>>,
    ) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Rule {
                matcher: Box::new(matcher),
                responses: responses.into(),
            });
        self
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        let rule = rules
            .iter_mut()
            .find(|rule| (rule.matcher)(request))
            .ok_or_else(|| FetchError::MalformedResponse {
                message: format!("no scripted response for {:?}", request.document()),
            })?;

        let response = if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        };
        response.unwrap_or_else(|| {
            Err(FetchError::MalformedResponse {
                message: "scripted rule has no responses".to_owned(),
            })
        })
    }
}

/// Matches requests whose document contains `fragment`.
pub fn document_contains(
    fragment: &'static str,
) -> impl Fn(&GraphqlRequest) -> bool + Send + Sync + 'static {
    move |request| request.document().contains(fragment)
}

/// Matches requests whose variable `name` equals `value`.
pub fn variable_equals(
    name: &'static str,
    value: impl Into<Value>,
) -> impl Fn(&GraphqlRequest) -> bool + Send + Sync + 'static {
    let expected = value.into();
    move |request| request.variable(name) == Some(&expected)
}
