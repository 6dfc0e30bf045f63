//! Classifies a pasted tracker URL into a resolution intent.
//!
//! Pure and stateless: no I/O, fully deterministic, unit-testable with
//! literal URL strings. The precedence cascade is fixed:
//!
//! 1. `selectedIssue` query parameter
//! 2. `jql` query parameter
//! 3. a bounded issue-key pattern anywhere in path, fragment, or query
//! 4. a `/projects/{KEY}` path segment pair
//! 5. `Unresolved`

use super::types::ResolutionIntent;
use crate::error::Error;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Issue-key pattern: one uppercase letter, one-or-more uppercase/digits, a
/// hyphen, one-or-more digits — with no adjacent uppercase/digit/hyphen on
/// either side, so `KAN-12` never matches inside `KAN-12-extra` or
/// `XKAN-12`. The regex crate has no lookarounds, so the boundaries are
/// expressed as explicit character-class alternations around the capture.
static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9-])([A-Z][A-Z0-9]+-[0-9]+)(?:$|[^A-Z0-9-])")
        .expect("issue key regex is valid")
});

/// Classify a tracker URL. `configured_base` is the tracker site base, e.g.
/// `https://acme.atlassian.net` (a trailing slash is tolerated).
///
/// Fails with [`Error::HostMismatch`] when the link points at a different
/// site, and [`Error::NoResolutionStrategy`] when the input is not an
/// absolute URL at all. A well-formed same-site URL always yields an intent
/// (possibly [`ResolutionIntent::Unresolved`]).
pub fn parse(raw_url: &str, configured_base: &str) -> crate::error::Result<ResolutionIntent> {
    let url = Url::parse(raw_url).map_err(|_| Error::NoResolutionStrategy {
        url: raw_url.to_string(),
    })?;

    let actual_base = site_base(&url);
    let configured = configured_base.trim_end_matches('/');
    if !actual_base.eq_ignore_ascii_case(configured) {
        return Err(Error::HostMismatch {
            configured: configured.to_string(),
            actual: actual_base,
            url: raw_url.to_string(),
        });
    }

    // 1. selectedIssue query parameter
    if let Some(key) = query_param(&url, "selectedIssue") {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(ResolutionIntent::SingleIssue(key.to_string()));
        }
    }

    // 2. explicit JQL query parameter
    if let Some(jql) = query_param(&url, "jql") {
        if !jql.trim().is_empty() {
            return Ok(ResolutionIntent::JqlQuery(jql));
        }
    }

    // 3. issue key anywhere in path, fragment, or query (some tracker UIs
    // echo the key in the hash)
    let haystack = format!(
        "{} {} {}",
        url.path(),
        url.fragment().unwrap_or(""),
        url.query().unwrap_or("")
    );
    if let Some(key) = find_issue_key(&haystack) {
        return Ok(ResolutionIntent::SingleIssue(key));
    }

    // 4. /projects/{KEY}/... fallback
    if let Some(project) = project_segment(&url) {
        return Ok(ResolutionIntent::ProjectListing(project));
    }

    Ok(ResolutionIntent::Unresolved)
}

/// `scheme://host[:port]` of a URL, lowercased by the url crate.
fn site_base(url: &Url) -> String {
    let mut base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        base.push_str(&format!(":{}", port));
    }
    base
}

/// Case-insensitive query parameter lookup (last occurrence wins, matching
/// dictionary-overwrite semantics). Values are percent-decoded.
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .filter(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.into_owned())
        .last()
}

/// First fully-bounded issue key in the haystack, if any.
fn find_issue_key(haystack: &str) -> Option<String> {
    ISSUE_KEY
        .captures(haystack)
        .map(|caps| caps[1].to_string())
}

/// The path segment following a `projects` segment, if present.
fn project_segment(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case("projects"))
        .and_then(|idx| segments.get(idx + 1))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://acme.atlassian.net";

    fn parse_ok(url: &str) -> ResolutionIntent {
        parse(url, BASE).unwrap()
    }

    #[test]
    fn test_selected_issue_param_wins_over_everything() {
        let intent = parse_ok(
            "https://acme.atlassian.net/jira/software/projects/KAN/boards/1?selectedIssue=KAN-7&jql=project%20%3D%20KAN",
        );
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-7".into()));
    }

    #[test]
    fn test_selected_issue_value_is_trimmed() {
        let intent = parse_ok("https://acme.atlassian.net/browse?selectedIssue=%20KAN-9%20");
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-9".into()));
    }

    #[test]
    fn test_repeated_query_param_last_occurrence_wins() {
        let intent = parse_ok(
            "https://acme.atlassian.net/browse?selectedIssue=KAN-1&selectedissue=KAN-2",
        );
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-2".into()));
    }

    #[test]
    fn test_blank_selected_issue_falls_through_to_jql() {
        let intent = parse_ok(
            "https://acme.atlassian.net/issues/?selectedIssue=&jql=assignee%20%3D%20currentUser()",
        );
        assert_eq!(
            intent,
            ResolutionIntent::JqlQuery("assignee = currentUser()".into())
        );
    }

    #[test]
    fn test_jql_param_is_percent_decoded() {
        let intent =
            parse_ok("https://acme.atlassian.net/issues/?jql=project%20%3D%20KAN%20AND%20status%20%3D%20Done");
        assert_eq!(
            intent,
            ResolutionIntent::JqlQuery("project = KAN AND status = Done".into())
        );
    }

    #[test]
    fn test_issue_key_in_path() {
        let intent = parse_ok("https://acme.atlassian.net/browse/KAN-12");
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-12".into()));
    }

    #[test]
    fn test_issue_key_in_fragment() {
        let intent = parse_ok("https://acme.atlassian.net/jira/browse#KAN-3");
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-3".into()));
    }

    #[test]
    fn test_bounded_key_does_not_match_inside_longer_token() {
        // KAN-12-extra must not yield KAN-12: the trailing hyphen violates
        // the no-adjacent-character rule, and there is no other bounded key.
        let intent = parse_ok("https://acme.atlassian.net/browse/KAN-12-extra");
        assert_eq!(intent, ResolutionIntent::Unresolved);
    }

    #[test]
    fn test_key_with_leading_uppercase_neighbor_does_not_match() {
        let intent = parse_ok("https://acme.atlassian.net/browse/XKAN-12x");
        // XKAN-12 is itself a valid bounded key (X is part of the project
        // prefix); the lowercase x after the digits is an allowed neighbor.
        assert_eq!(intent, ResolutionIntent::SingleIssue("XKAN-12".into()));
    }

    #[test]
    fn test_single_letter_project_prefix_does_not_match() {
        // Pattern requires at least two characters before the hyphen.
        let intent = parse_ok("https://acme.atlassian.net/browse/K-1");
        assert_eq!(intent, ResolutionIntent::Unresolved);
    }

    #[test]
    fn test_projects_listing_fallback() {
        let intent = parse_ok("https://acme.atlassian.net/jira/software/projects/kanban/summary");
        assert_eq!(intent, ResolutionIntent::ProjectListing("kanban".into()));
    }

    #[test]
    fn test_projects_segment_without_follower_is_unresolved() {
        let intent = parse_ok("https://acme.atlassian.net/jira/software/projects");
        assert_eq!(intent, ResolutionIntent::Unresolved);
    }

    #[test]
    fn test_host_mismatch_is_an_error() {
        let err = parse("https://other.example.com/browse/KAN-1", BASE).unwrap_err();
        match err {
            Error::HostMismatch {
                configured, actual, ..
            } => {
                assert_eq!(configured, "https://acme.atlassian.net");
                assert_eq!(actual, "https://other.example.com");
            }
            other => panic!("expected HostMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_configured_base_tolerates_trailing_slash() {
        let intent = parse(
            "https://acme.atlassian.net/browse/KAN-1",
            "https://acme.atlassian.net/",
        )
        .unwrap();
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-1".into()));
    }

    #[test]
    fn test_host_comparison_is_case_insensitive() {
        let intent = parse("https://ACME.atlassian.net/browse/KAN-1", BASE).unwrap();
        assert_eq!(intent, ResolutionIntent::SingleIssue("KAN-1".into()));
    }

    #[test]
    fn test_relative_url_is_no_resolution_strategy() {
        let err = parse("/browse/KAN-1", BASE).unwrap_err();
        assert!(matches!(err, Error::NoResolutionStrategy { .. }));
    }

    #[test]
    fn test_plain_dashboard_url_is_unresolved() {
        let intent = parse_ok("https://acme.atlassian.net/jira/dashboards/last-visited");
        assert_eq!(intent, ResolutionIntent::Unresolved);
    }
}
