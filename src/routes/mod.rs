use axum::Router;

use crate::AppState;

mod health;
mod heatmap;
mod notify;
mod opportunities;
mod predictions;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(heatmap::router())
        .merge(opportunities::router())
        .merge(predictions::router())
        .merge(notify::router())
        .merge(health::router())
        .with_state(state)
}
