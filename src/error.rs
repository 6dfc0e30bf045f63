//! Domain error taxonomy for link resolution and chat transport.
//!
//! Every variant carries enough structured context to render an actionable
//! message: the offending URL, configured vs actual host, the issue key, or
//! the rejected query text.

use thiserror::Error;

/// Errors produced by the tracker link pipeline and the chat transport.
#[derive(Debug, Error)]
pub enum Error {
    /// The pasted link points at a different tracker site than the one this
    /// instance is configured for.
    #[error("configured for {configured}, but the link is for {actual}: {url}")]
    HostMismatch {
        configured: String,
        actual: String,
        url: String,
    },

    /// None of the resolution strategies matched the link. Terminal for the
    /// caller — never a silent empty result.
    #[error("could not infer what to fetch from the link: {url}")]
    NoResolutionStrategy { url: String },

    /// The tracker has no issue under this key.
    #[error("issue {key} not found on the tracker")]
    IssueNotFound { key: String },

    /// The tracker rejected the query syntax.
    #[error("tracker rejected query `{jql}`: {reason}")]
    QueryRejected { jql: String, reason: String },

    /// Connect, reconnect, or request transport failure. Recoverable — the
    /// caller may retry. A tracker query timeout lands here, never in
    /// `IssueNotFound`.
    #[error("transport unavailable: {detail}")]
    TransportUnavailable { detail: String },

    /// The caller cancelled an in-flight operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn transport(detail: impl Into<String>) -> Self {
        Error::TransportUnavailable {
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
