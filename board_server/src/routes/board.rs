//! Fetch-then-render pipeline behind the board page.

use std::time::Instant;

use crate::error::BoardError;
use crate::routes::BoardRouterState;

/// Fetch builds for `branch` and render them. Nothing is rendered unless the
/// whole build list was fetched.
pub async fn render_board(state: &BoardRouterState, branch: &str) -> Result<String, BoardError> {
    let started = Instant::now();
    let builds = state.client.list_builds(&state.config.app_id, branch).await;
    crate::metrics::upstream_fetch_duration(started.elapsed().as_millis() as u64);
    let builds = builds?;

    crate::metrics::builds_fetched(builds.len());
    tracing::info!(
        app_id = %state.config.app_id,
        branch,
        count = builds.len(),
        "Fetched builds"
    );

    state.renderer.render(branch, &builds).await
}
