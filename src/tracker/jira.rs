//! Jira REST implementation of the tracker query capability.
//!
//! Auth is HTTP basic (account email + API token); transport errors and
//! timeouts surface as `TransportUnavailable`, never as `IssueNotFound`.

use super::resolver::TrackerQuery;
use super::types::IssueRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Fields requested from the search endpoint. The start-date custom field is
/// appended at request time since its id is per-site configuration.
const BASE_FIELDS: &str = "summary,description,assignee,status,duedate";

/// Jira REST client (API v2).
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
    /// Custom field id carrying the issue start date (site-dependent;
    /// `customfield_10015` on most Jira Cloud sites).
    start_date_field: String,
}

impl JiraClient {
    pub fn new(
        base_url: &str,
        email: &str,
        api_token: &str,
        request_timeout: Duration,
        start_date_field: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
            start_date_field: start_date_field.to_string(),
        })
    }

    fn fields_param(&self) -> String {
        format!("{},{}", BASE_FIELDS, self.start_date_field)
    }

    fn to_record(&self, issue: JiraIssue) -> IssueRecord {
        let fields = issue.fields;
        let start_date_raw = fields
            .custom
            .get(&self.start_date_field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        IssueRecord {
            key: issue.key,
            summary: fields.summary.unwrap_or_default(),
            description: fields.description,
            assignee: fields.assignee.and_then(|a| a.display_name.or(a.name)),
            status: fields.status.map(|s| s.name),
            due_date: fields.duedate.as_deref().and_then(date_to_epoch),
            start_date_raw,
        }
    }
}

/// `YYYY-MM-DD` (Jira's duedate format) → epoch seconds at midnight UTC.
fn date_to_epoch(raw: &str) -> Option<i64> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::transport(format!("tracker request timed out: {e}"))
    } else {
        Error::transport(format!("tracker request failed: {e}"))
    }
}

#[async_trait]
impl TrackerQuery for JiraClient {
    async fn query_issue(&self, key: &str) -> Result<Option<IssueRecord>> {
        let url = format!("{}/rest/api/2/issue/{}", self.base_url, key);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[("fields", self.fields_param())])
            .send()
            .await
            .map_err(send_error)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "tracker returned {} for issue {}",
                resp.status(),
                key
            )));
        }

        let issue: JiraIssue = resp
            .json()
            .await
            .map_err(|e| Error::transport(format!("malformed issue response: {e}")))?;
        debug!(key = %issue.key, "fetched tracker issue");
        Ok(Some(self.to_record(issue)))
    }

    async fn search_issues(
        &self,
        jql: &str,
        max_results: usize,
    ) -> Result<(Vec<IssueRecord>, bool)> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[
                ("jql", jql.to_string()),
                ("maxResults", max_results.to_string()),
                ("fields", self.fields_param()),
            ])
            .send()
            .await
            .map_err(send_error)?;

        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let reason = resp
                .json::<JiraErrorBody>()
                .await
                .map(|b| b.error_messages.join("; "))
                .unwrap_or_else(|_| "bad request".to_string());
            return Err(Error::QueryRejected {
                jql: jql.to_string(),
                reason,
            });
        }
        if !resp.status().is_success() {
            return Err(Error::transport(format!(
                "tracker search returned {}",
                resp.status()
            )));
        }

        let body: JiraSearchBody = resp
            .json()
            .await
            .map_err(|e| Error::transport(format!("malformed search response: {e}")))?;
        let truncated = body.total as usize > body.issues.len();
        let records = body.issues.into_iter().map(|i| self.to_record(i)).collect();
        Ok((records, truncated))
    }

    fn site_name(&self) -> &str {
        "Jira"
    }
}

// ============================================================================
// Jira REST wire shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    #[serde(default)]
    fields: JiraFields,
}

#[derive(Debug, Default, Deserialize)]
struct JiraFields {
    summary: Option<String>,
    description: Option<String>,
    assignee: Option<JiraUser>,
    status: Option<JiraStatus>,
    duedate: Option<String>,
    /// Bucket for custom fields (the start-date field id varies per site).
    #[serde(flatten)]
    custom: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JiraUser {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JiraSearchBody {
    #[serde(default)]
    issues: Vec<JiraIssue>,
    #[serde(default)]
    total: i64,
}

#[derive(Debug, Deserialize)]
struct JiraErrorBody {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<String>,
}
