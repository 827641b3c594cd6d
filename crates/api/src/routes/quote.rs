//! JSON rendition of the calculator view.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use merger_common::error::AppError;
use merger_engine::view::{RawViewInputs, ViewSnapshot};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/quote", get(quote))
}

/// GET /api/quote — Same figures as the page, as JSON.
///
/// Non-finite ratios (zero supply) serialize as `null`.
async fn quote(
    State(state): State<AppState>,
    Query(raw): Query<RawViewInputs>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let view = state.mount_view(&raw).await?;
    Ok(Json(view.render()))
}
