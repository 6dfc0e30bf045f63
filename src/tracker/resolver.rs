//! Turns a resolution intent into normalized work items through the
//! tracker query capability.

use super::types::{IssueRecord, Resolution, ResolutionIntent, WorkItem};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Hard cap on search results. Larger result sets are truncated, not paged;
/// truncation is observable via [`Resolution::truncated`].
pub const MAX_SEARCH_RESULTS: usize = 100;

/// The tracker query capability. Authentication and transport are treated as
/// already established by the implementation.
#[async_trait]
pub trait TrackerQuery: Send + Sync {
    /// Fetch a single issue by key. `Ok(None)` means the tracker reported
    /// "not found" — transport failures are errors, never `None`.
    async fn query_issue(&self, key: &str) -> Result<Option<IssueRecord>>;

    /// Run a JQL search bounded to `max_results`. The boolean reports
    /// whether the tracker had more matches than were returned.
    async fn search_issues(&self, jql: &str, max_results: usize)
        -> Result<(Vec<IssueRecord>, bool)>;

    /// Display name of the tracker site (becomes `WorkItem::site_source`).
    fn site_name(&self) -> &str;
}

/// Resolve an intent into work items.
///
/// `source_url` is carried only for error context. Cancellation via the
/// token aborts the in-flight tracker call and returns [`Error::Cancelled`]
/// without committing any partial item list.
pub async fn resolve(
    intent: ResolutionIntent,
    source_url: &str,
    tracker: &dyn TrackerQuery,
    cancel: &CancellationToken,
) -> Result<Resolution> {
    match intent {
        ResolutionIntent::SingleIssue(key) => {
            let record = cancellable(cancel, tracker.query_issue(&key))
                .await?
                .ok_or(Error::IssueNotFound { key: key.clone() })?;
            Ok(Resolution {
                items: vec![WorkItem::from_record(record, tracker.site_name())],
                truncated: false,
            })
        }
        ResolutionIntent::JqlQuery(jql) => search(&jql, tracker, cancel).await,
        ResolutionIntent::ProjectListing(project) => {
            let jql = format!("project = {} ORDER BY updated DESC", project);
            search(&jql, tracker, cancel).await
        }
        ResolutionIntent::Unresolved => Err(Error::NoResolutionStrategy {
            url: source_url.to_string(),
        }),
    }
}

async fn search(
    jql: &str,
    tracker: &dyn TrackerQuery,
    cancel: &CancellationToken,
) -> Result<Resolution> {
    let (records, truncated) =
        cancellable(cancel, tracker.search_issues(jql, MAX_SEARCH_RESULTS)).await?;
    debug!(jql = %jql, count = records.len(), truncated, "tracker search resolved");
    let items = records
        .into_iter()
        .map(|r| WorkItem::from_record(r, tracker.site_name()))
        .collect();
    Ok(Resolution { items, truncated })
}

/// Race a tracker call against caller-supplied cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted tracker double: serves a fixed batch of issues and counts
    /// calls.
    struct FakeTracker {
        issues: Vec<IssueRecord>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeTracker {
        fn with_issues(count: usize) -> Self {
            let issues = (1..=count)
                .map(|i| IssueRecord {
                    key: format!("KAN-{i}"),
                    summary: format!("Issue {i}"),
                    description: None,
                    assignee: None,
                    status: Some("To Do".into()),
                    due_date: None,
                    start_date_raw: None,
                })
                .collect();
            Self {
                issues,
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl TrackerQuery for FakeTracker {
        async fn query_issue(&self, key: &str) -> Result<Option<IssueRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.issues.iter().find(|i| i.key == key).cloned())
        }

        async fn search_issues(
            &self,
            _jql: &str,
            max_results: usize,
        ) -> Result<(Vec<IssueRecord>, bool)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let truncated = self.issues.len() > max_results;
            Ok((
                self.issues.iter().take(max_results).cloned().collect(),
                truncated,
            ))
        }

        fn site_name(&self) -> &str {
            "Jira"
        }
    }

    #[tokio::test]
    async fn test_single_issue_resolves_one_item() {
        let tracker = FakeTracker::with_issues(3);
        let res = resolve(
            ResolutionIntent::SingleIssue("KAN-2".into()),
            "",
            &tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(res.items.len(), 1);
        assert_eq!(res.items[0].key, "KAN-2");
        assert!(!res.truncated);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_issue_is_issue_not_found() {
        let tracker = FakeTracker::with_issues(1);
        let err = resolve(
            ResolutionIntent::SingleIssue("KAN-99".into()),
            "",
            &tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::IssueNotFound { key } if key == "KAN-99"));
    }

    #[tokio::test]
    async fn test_search_truncates_at_cap() {
        let tracker = FakeTracker::with_issues(150);
        let res = resolve(
            ResolutionIntent::JqlQuery("project = KAN".into()),
            "",
            &tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(res.items.len(), MAX_SEARCH_RESULTS);
        assert!(res.truncated);
    }

    #[tokio::test]
    async fn test_project_listing_synthesizes_ordered_query() {
        let tracker = FakeTracker::with_issues(2);
        let res = resolve(
            ResolutionIntent::ProjectListing("KAN".into()),
            "",
            &tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(res.items.len(), 2);
        assert!(!res.truncated);
    }

    #[tokio::test]
    async fn test_unresolved_is_terminal_failure() {
        let tracker = FakeTracker::with_issues(0);
        let err = resolve(
            ResolutionIntent::Unresolved,
            "https://acme.atlassian.net/whatever",
            &tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(
            matches!(err, Error::NoResolutionStrategy { url } if url.contains("whatever"))
        );
        // Unresolved never reaches the tracker.
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_query() {
        let mut tracker = FakeTracker::with_issues(1);
        tracker.delay = Some(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolve(
            ResolutionIntent::SingleIssue("KAN-1".into()),
            "",
            &tracker,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
