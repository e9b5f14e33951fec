//! buddybuild API client: lists builds for one application.

use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::models::build::Build;

/// Fixed page size; the board never paginates.
const BUILD_LIMIT: &str = "100";

#[derive(Clone, Debug)]
pub struct BuddyBuildClient {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl BuddyBuildClient {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            access_token: config.access_token.clone(),
        }
    }

    /// List the latest builds of `app_id`, newest first as upstream orders them.
    ///
    /// An empty `branch` is still sent as `branch=`; upstream decides what it means.
    pub async fn list_builds(&self, app_id: &str, branch: &str) -> Result<Vec<Build>, BoardError> {
        let url = format!("{}/v1/apps/{app_id}/builds", self.api_url);

        let resp = self
            .http
            .get(&url)
            .query(&[("limit", BUILD_LIMIT), ("branch", branch)])
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .header("User-Agent", "buildboard")
            .send()
            .await
            .map_err(BoardError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BoardError::UpstreamStatus { status });
        }

        let body = resp.bytes().await.map_err(BoardError::Transport)?;
        let builds: Vec<Build> = serde_json::from_slice(&body).map_err(BoardError::Decode)?;

        tracing::debug!(app_id, branch, count = builds.len(), "Fetched builds");
        Ok(builds)
    }
}
