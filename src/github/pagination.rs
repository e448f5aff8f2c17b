//! Cursor pagination over GraphQL connections.
//!
//! A [`PageWalker`] drives one paged connection (search results, repository
//! lists, member lists) by re-issuing its request with the previous page's
//! `endCursor` until the server reports no further pages.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::FetchError;
use super::gateway::GraphqlTransport;
use super::query::GraphqlRequest;

/// `pageInfo` block of a GraphQL connection.
///
/// # Example
///
/// ```
/// use prdash::github::pagination::PageInfo;
///
/// let info = PageInfo::new(true, Some("Y3Vyc29yOjE=".to_owned()));
/// assert_eq!(info.next_cursor(), Some("Y3Vyc29yOjE="));
/// assert!(PageInfo::new(true, Some(String::new())).is_last_page());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl PageInfo {
    /// Creates page info from its two fields.
    #[must_use]
    pub const fn new(has_next_page: bool, end_cursor: Option<String>) -> Self {
        Self {
            has_next_page,
            end_cursor,
        }
    }

    /// Whether the server claims more pages exist.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Raw end cursor, if any.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    /// Cursor for the following page.
    ///
    /// `None` when there is no next page or the cursor is null or empty.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.end_cursor()
            .filter(|cursor| self.has_next_page && !cursor.is_empty())
    }

    /// Returns true when walking should stop after this page.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.next_cursor().is_none()
    }
}

/// JSON pointer to a connection inside a GraphQL `data` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPath(&'static str);

impl ConnectionPath {
    /// Wraps a JSON pointer such as `/organization/repositories`.
    #[must_use]
    pub const fn new(pointer: &'static str) -> Self {
        Self(pointer)
    }

    /// The JSON pointer.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawConnection {
    page_info: PageInfo,
    nodes: Vec<Value>,
}

fn extract_connection(data: &Value, path: ConnectionPath) -> Result<RawConnection, FetchError> {
    match data.pointer(path.as_str()) {
        None | Some(Value::Null) => {
            debug!(path = path.as_str(), "connection absent from response");
            Ok(RawConnection::default())
        }
        Some(connection) => serde_json::from_value(connection.clone()).map_err(|error| {
            FetchError::MalformedResponse {
                message: format!("connection at {}: {error}", path.as_str()),
            }
        }),
    }
}

/// Lazy, finite walk over one paged connection.
///
/// Each call to [`PageWalker::next_page`] issues at most one request. The
/// walk ends when the server reports no next page, returns a null or empty
/// cursor, or repeats a cursor already followed. A walker cannot be
/// restarted; after it ends, or after a failed request, it yields `None`.
pub struct PageWalker<'a, T: GraphqlTransport + ?Sized> {
    transport: &'a T,
    request: GraphqlRequest,
    path: ConnectionPath,
    cursor: Option<String>,
    followed: HashSet<String>,
    finished: bool,
}

impl<'a, T: GraphqlTransport + ?Sized> PageWalker<'a, T> {
    /// Starts a walk from the first page. The request's `cursor` variable is
    /// managed by the walker.
    #[must_use]
    pub fn new(transport: &'a T, request: GraphqlRequest, path: ConnectionPath) -> Self {
        Self {
            transport,
            request,
            path,
            cursor: None,
            followed: HashSet::new(),
            finished: false,
        }
    }

    /// Fetches the next page of raw nodes, or `None` once the walk ended.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and returns
    /// `FetchError::MalformedResponse` when the connection cannot be read.
    /// The walk ends after any error.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>, FetchError> {
        if self.finished {
            return Ok(None);
        }

        let request = self
            .request
            .clone()
            .with_variable("cursor", self.cursor.clone());
        let page = self
            .transport
            .execute(&request)
            .await
            .and_then(|data| extract_connection(&data, self.path));

        let connection = match page {
            Ok(connection) => connection,
            Err(error) => {
                self.finished = true;
                return Err(error);
            }
        };

        self.advance(&connection.page_info);
        Ok(Some(connection.nodes))
    }

    /// Walks every page and returns all nodes in page order.
    ///
    /// # Errors
    ///
    /// Fails atomically: nodes from earlier pages are discarded when any
    /// page fails.
    pub async fn collect_nodes(mut self) -> Result<Vec<Value>, FetchError> {
        let mut nodes = Vec::new();
        while let Some(page) = self.next_page().await? {
            nodes.extend(page);
        }
        Ok(nodes)
    }

    /// Walks every page, keeping nodes gathered before a failure.
    ///
    /// Returns the accumulated nodes together with the error that ended the
    /// walk early, if any.
    pub async fn collect_partial(mut self) -> (Vec<Value>, Option<FetchError>) {
        let mut nodes = Vec::new();
        loop {
            match self.next_page().await {
                Ok(Some(page)) => nodes.extend(page),
                Ok(None) => return (nodes, None),
                Err(error) => return (nodes, Some(error)),
            }
        }
    }

    fn advance(&mut self, page_info: &PageInfo) {
        let Some(cursor) = page_info.next_cursor() else {
            self.finished = true;
            return;
        };

        if !self.followed.insert(cursor.to_owned()) {
            warn!(
                path = self.path.as_str(),
                cursor, "server repeated a cursor; ending walk"
            );
            self.finished = true;
            return;
        }

        self.cursor = Some(cursor.to_owned());
    }
}
