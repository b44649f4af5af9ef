use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};

pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::list_devices),
        )
        .route(
            "/arpSpoof",
            get(handlers::arp_spoof).post(handlers::arp_spoof),
        )
        .with_state(state)
}
