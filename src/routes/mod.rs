pub mod itineraries;
pub mod public;
pub mod travel;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .merge(travel::router())
        .nest("/itineraries", itineraries::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
