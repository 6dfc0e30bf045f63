//! Issue-tracker link resolution: parse a pasted URL into an intent, then
//! resolve it into normalized work items through the tracker query
//! capability.

pub mod jira;
pub mod link;
pub mod resolver;
pub mod types;

pub use jira::JiraClient;
pub use resolver::{TrackerQuery, MAX_SEARCH_RESULTS};
pub use types::{IssueRecord, Resolution, ResolutionIntent, WorkItem};

use crate::error::Result;
use tokio_util::sync::CancellationToken;

/// The composed link-resolution entry point: LinkParser → IssueResolver.
///
/// Host mismatch fails before any network call is attempted. Resolved items
/// carry the pasted link as their `url_link`.
pub async fn resolve_link(
    url: &str,
    configured_base: &str,
    tracker: &dyn TrackerQuery,
    cancel: &CancellationToken,
) -> Result<Resolution> {
    let intent = link::parse(url, configured_base)?;
    let mut resolution = resolver::resolve(intent, url, tracker, cancel).await?;
    for item in &mut resolution.items {
        item.url_link = Some(url.to_string());
    }
    Ok(resolution)
}
