pub mod health;
pub mod live;
pub mod page;
pub mod quote;

use axum::Router;

use crate::state::AppState;

/// Build the complete router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(page::router())
        .merge(quote::router())
        .merge(live::router())
        .with_state(state)
}
