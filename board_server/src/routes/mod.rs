//! Build board HTTP routes.

pub mod board;

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::config::BoardConfig;
use crate::services::buddybuild_service::BuddyBuildClient;
use crate::services::render_service::PageRenderer;

/// Shared state for board route handlers.
#[derive(Clone)]
pub struct BoardRouterState {
    pub config: Arc<BoardConfig>,
    pub client: BuddyBuildClient,
    pub renderer: PageRenderer,
}

impl BoardRouterState {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            client: BuddyBuildClient::new(&config),
            renderer: PageRenderer::new(&config),
            config: Arc::new(config),
        }
    }
}

/// Build the board's Axum router.
pub fn board_router(state: BoardRouterState) -> Router {
    Router::new()
        .route("/", get(board_handler))
        .with_state(state)
}

/// Last `branch` value wins, like a single-valued query map. Absent means all
/// branches.
fn requested_branch(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == "branch")
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

async fn board_handler(
    State(state): State<BoardRouterState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let branch = match query {
        Ok(Query(pairs)) => requested_branch(&pairs),
        Err(rejection) => {
            tracing::error!(stage = "query", "Unreadable query string: {rejection}");
            crate::metrics::failure_recorded("query");
            crate::metrics::request_completed("error");
            return internal_error();
        }
    };

    match board::render_board(&state, &branch).await {
        Ok(html) => {
            crate::metrics::request_completed("ok");
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response()
        }
        Err(e) => {
            tracing::error!(stage = e.stage(), branch = %branch, "Failed to build board: {e}");
            crate::metrics::failure_recorded(e.stage());
            crate::metrics::request_completed("error");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, status.canonical_reason().unwrap_or("Internal Server Error")).into_response()
}
