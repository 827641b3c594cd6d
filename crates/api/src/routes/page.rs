//! The rendered calculator page.

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;

use merger_common::error::AppError;
use merger_engine::view::RawViewInputs;

use crate::render;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(calculator_page))
}

/// GET / — Load market data once and render the page.
///
/// Unparsable inputs are coerced to zero rather than rejected.
async fn calculator_page(
    State(state): State<AppState>,
    Query(raw): Query<RawViewInputs>,
) -> Result<Html<String>, AppError> {
    let view = state.mount_view(&raw).await?;
    Ok(Html(render::page(&view.render())))
}
