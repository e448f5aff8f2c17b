//! Credential and scope value types used to address GitHub queries.
//!
//! The dashboard works against an organization scope (zero or more logins)
//! and an optional repository scope (`owner/name` slugs). Both are parsed
//! from loosely formatted configuration strings here so the rest of the
//! crate only sees validated values.

use std::fmt;

use url::Url;

use super::error::FetchError;

/// Default GitHub API host used when no override is configured.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MissingCredential` when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, FetchError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FetchError::MissingCredential);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A fully qualified `owner/name` repository reference.
///
/// # Example
///
/// ```
/// use prdash::github::RepositorySlug;
///
/// let slug = RepositorySlug::parse("octo/hello").expect("slug should parse");
/// assert_eq!(slug.owner().as_str(), "octo");
/// assert_eq!(slug.name().as_str(), "hello");
/// assert_eq!(slug.to_string(), "octo/hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositorySlug {
    owner: RepositoryOwner,
    name: RepositoryName,
}

impl RepositorySlug {
    /// Parses an `owner/name` string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidRepository` unless the input has exactly
    /// two non-empty segments.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let trimmed = input.trim();
        let invalid = || FetchError::InvalidRepository {
            value: trimmed.to_owned(),
        };

        let (owner, name) = trimmed.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            owner: RepositoryOwner(owner.to_owned()),
            name: RepositoryName(name.to_owned()),
        })
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn name(&self) -> &RepositoryName {
        &self.name
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.owner.as_str(), self.name.as_str())
    }
}

/// Organizations whose pull requests are aggregated, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationScope(Vec<String>);

impl OrganizationScope {
    /// Parses a comma-separated organization list. Entries are trimmed and
    /// blank entries dropped; order is preserved.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }

    /// Builds a scope from already separated logins.
    #[must_use]
    pub fn from_logins<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = logins
            .into_iter()
            .map(|login| login.as_ref().to_owned())
            .collect();
        Self::parse(&joined.join(","))
    }

    /// Configured organization logins.
    #[must_use]
    pub fn logins(&self) -> &[String] {
        &self.0
    }

    /// Returns true when no organization is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable textual form used when deriving cache keys.
    #[must_use]
    pub fn normalised(&self) -> String {
        self.0.join(",")
    }
}

/// Repositories a listing is restricted to; empty means "all repositories".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryScope(Vec<RepositorySlug>);

impl RepositoryScope {
    /// Scope covering every repository visible to the organization scope.
    #[must_use]
    pub const fn all() -> Self {
        Self(Vec::new())
    }

    /// Parses a list of `owner/name` strings, ignoring blank entries.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidRepository` for the first malformed entry.
    pub fn parse<I, S>(entries: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        entries
            .into_iter()
            .filter(|entry| !entry.as_ref().trim().is_empty())
            .map(|entry| RepositorySlug::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parses a comma-separated `owner/name` list.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidRepository` for the first malformed entry.
    pub fn parse_list(input: &str) -> Result<Self, FetchError> {
        Self::parse(input.split(','))
    }

    /// Repositories in the scope, in the order supplied.
    #[must_use]
    pub fn repositories(&self) -> &[RepositorySlug] {
        &self.0
    }

    /// Returns true when the scope covers all repositories.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable textual form used when deriving cache keys.
    ///
    /// Slugs are sorted and de-duplicated so that the same selection in a
    /// different order maps to the same key. The empty scope is `all`.
    #[must_use]
    pub fn normalised(&self) -> String {
        if self.is_all() {
            return "all".to_owned();
        }

        let mut slugs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        slugs.sort();
        slugs.dedup();
        slugs.join(",")
    }
}

/// Parses and validates the configured API base URL.
///
/// # Errors
///
/// Returns `FetchError::Configuration` when the value is not an absolute
/// HTTP(S) URL.
pub fn parse_api_base(input: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(input.trim()).map_err(|error| FetchError::Configuration {
        message: format!("invalid API base `{input}`: {error}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::Configuration {
            message: format!("API base must use http or https, got `{input}`"),
        });
    }

    Ok(parsed)
}
