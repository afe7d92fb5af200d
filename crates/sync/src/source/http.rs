//! HTTP implementation of the progress source.

use super::ProgressSource;
use async_trait::async_trait;
use badgeboard_domain::{CompletedBadge, SealedCredential, StudentId, SyncError};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Fetches progress from the learning platform's REST API.
pub struct HttpProgressSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpProgressSource {
    /// Create a source against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn progress_url(&self, student_id: &StudentId) -> String {
        format!("{}/students/{}/badges", self.base_url, student_id)
    }
}

#[async_trait]
impl ProgressSource for HttpProgressSource {
    async fn fetch_progress(
        &self,
        student_id: &StudentId,
        credential: Option<&SealedCredential>,
    ) -> Result<Vec<CompletedBadge>, SyncError> {
        let url = self.progress_url(student_id);
        debug!(student_id = %student_id, "fetching external progress");

        let mut request = self.http.get(&url);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SyncError::Fetch(format!(
                "upstream returned {status} for {url}"
            )));
        }
        if !status.is_success() {
            return Err(SyncError::MalformedPayload(format!(
                "unexpected status {status} for {url}"
            )));
        }

        response
            .json::<Vec<CompletedBadge>>()
            .await
            .map_err(|e| SyncError::MalformedPayload(format!("invalid progress payload: {e}")))
    }
}
