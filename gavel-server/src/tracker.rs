//! Client for the external issue tracker.
//!
//! Tracker sync is best-effort: a failed call never fails the primary
//! mutation. On failure the local link is kept with `enabled = false` and
//! the error is logged, matching how operators re-enable sync later.

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::records::TrackerLink;

#[derive(Debug, Clone, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCreated {
    pub issue_id: String,
    pub issue_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

pub struct TrackerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>, auth_token: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {auth_token}"))
            .context("Invalid tracker auth token")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build tracker HTTP client")?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    pub async fn create_issue(&self, request: &IssueRequest) -> anyhow::Result<IssueCreated> {
        let url = format!("{}/issues", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send issue create request")?
            .error_for_status()
            .context("Issue tracker rejected create request")?;
        response
            .json()
            .await
            .context("Failed to parse issue create response")
    }

    pub async fn update_issue(&self, issue_id: &str, update: &IssueUpdate) -> anyhow::Result<()> {
        let url = format!("{}/issues/{issue_id}", self.base_url);
        self.client
            .put(&url)
            .json(update)
            .send()
            .await
            .context("Failed to send issue update request")?
            .error_for_status()
            .context("Issue tracker rejected update request")?;
        Ok(())
    }

    /// Create a tracker issue and return the local link for it. Failure
    /// yields a disabled link rather than an error.
    pub async fn create_link(&self, request: &IssueRequest) -> TrackerLink {
        let mut link = TrackerLink::enabled();
        link.component_id = request.component_id.clone();
        link.hotlist_id = request.hotlist_id.clone();
        link.priority = request.priority.clone();
        link.severity = request.severity.clone();

        match self.create_issue(request).await {
            Ok(created) => {
                link.issue_id = Some(created.issue_id);
                link.issue_url = Some(created.issue_url);
            }
            Err(e) => {
                error!("Issue tracker create failed, disabling sync: {e:#}");
                link.enabled = false;
            }
        }
        link
    }

    /// Push a status change to an existing linked issue. No-op for links
    /// that are disabled or were never created remotely.
    pub async fn sync_status(&self, link: &TrackerLink, status: &str) {
        if !link.enabled {
            return;
        }
        let Some(issue_id) = link.issue_id.as_deref() else {
            return;
        };
        let update = IssueUpdate {
            status: Some(status.to_string()),
            comment: None,
        };
        if let Err(e) = self.update_issue(issue_id, &update).await {
            error!("Issue tracker status sync failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> IssueRequest {
        IssueRequest {
            title: "Review requested".to_string(),
            description: "Please review".to_string(),
            component_id: Some("1234".to_string()),
            hotlist_id: None,
            priority: Some("P2".to_string()),
            severity: Some("S2".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_link_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issue_id": "42",
                "issue_url": "https://tracker.example.com/issues/42",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TrackerClient::new(server.uri(), "test-token").unwrap();
        let link = client.create_link(&request()).await;

        assert!(link.enabled);
        assert_eq!(link.issue_id.as_deref(), Some("42"));
        assert_eq!(
            link.issue_url.as_deref(),
            Some("https://tracker.example.com/issues/42")
        );
        assert_eq!(link.component_id.as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn test_create_link_failure_disables_sync() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = TrackerClient::new(server.uri(), "test-token").unwrap();
        let link = client.create_link(&request()).await;

        assert!(!link.enabled);
        assert!(link.issue_id.is_none());
    }

    #[tokio::test]
    async fn test_sync_status_skips_disabled_links() {
        let server = MockServer::start().await;
        // No mocks mounted: any request would 404 but none should be sent.
        let client = TrackerClient::new(server.uri(), "test-token").unwrap();

        let mut link = TrackerLink::enabled();
        link.enabled = false;
        link.issue_id = Some("42".to_string());
        client.sync_status(&link, "In Progress").await;

        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
