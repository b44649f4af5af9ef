//! HTTP surface of `lure`: device listing and spoofing sessions with a
//! DNS capture window.

pub mod dto;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_api_routes;
pub use state::AppState;
