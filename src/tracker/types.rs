//! Tracker data model: raw issue records and normalized work items.

use serde::{Deserialize, Serialize};

/// A raw issue as returned by the tracker query capability.
///
/// Everything except the key and summary is optional on the tracker side;
/// the mapping into [`WorkItem`] must stay total over missing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Due date as epoch seconds, when the tracker provides one.
    #[serde(default)]
    pub due_date: Option<i64>,
    /// The "Start date" custom field, raw string form. Parsed leniently —
    /// a malformed value is dropped, never an error.
    #[serde(default)]
    pub start_date_raw: Option<String>,
}

/// A normalized, immutable record of an externally tracked issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque tracker key, e.g. `PROJ-123`.
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub status: String,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    /// Which tracker site this came from (e.g. "Jira").
    pub site_source: String,
    /// The pasted link that produced this item, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_link: Option<String>,
}

impl WorkItem {
    /// Total mapping from a raw tracker issue. Missing optional fields map to
    /// absent values — never fabricated defaults. A malformed start date is
    /// treated as absent.
    pub fn from_record(record: IssueRecord, site_source: &str) -> Self {
        let start_date = record
            .start_date_raw
            .as_deref()
            .and_then(parse_start_date_epoch);

        Self {
            key: record.key,
            title: record.summary,
            description: record.description,
            assignee: record.assignee.filter(|a| !a.is_empty()),
            status: record.status.unwrap_or_default(),
            start_date,
            due_date: record.due_date,
            site_source: site_source.to_string(),
            url_link: None,
        }
    }

    pub fn with_url_link(mut self, url: impl Into<String>) -> Self {
        self.url_link = Some(url.into());
        self
    }
}

/// Lenient parse of the tracker's "Start date" custom field into epoch
/// seconds. Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
fn parse_start_date_epoch(raw: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    None
}

/// The classified strategy chosen from a pasted tracker link.
///
/// Exactly one variant is active per parsed URL; the precedence order lives
/// in [`crate::tracker::link::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionIntent {
    /// A single issue key to fetch directly.
    SingleIssue(String),
    /// An explicit JQL query from the link.
    JqlQuery(String),
    /// A `/projects/{KEY}` listing — all issues in the project.
    ProjectListing(String),
    /// No strategy matched. The resolver turns this into a terminal error.
    Unresolved,
}

/// The outcome of resolving a link: zero or more items, plus whether a
/// larger result set was cut at the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub items: Vec<WorkItem>,
    pub truncated: bool,
}
