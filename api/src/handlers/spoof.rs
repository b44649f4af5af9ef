use axum::{
    Json,
    extract::{Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use lure_core::capture;
use lure_core::session::Session;
use tracing::{info, instrument};

use crate::dto::{DnsQueryDto, SpoofQuery};
use crate::errors::ApiError;
use crate::state::AppState;

pub const TRUNCATED_HEADER: &str = "x-capture-truncated";

/// Starts a spoofing session in the background, then answers with the DNS
/// exchanges seen during one capture window.
#[instrument(skip(state), name = "api_arp_spoof")]
pub async fn arp_spoof(
    State(state): State<AppState>,
    Query(params): Query<SpoofQuery>,
) -> Result<Response, ApiError> {
    let session_config = params.session_config(&state.config);
    let window = params.capture_window(&state.config);

    let slot = state.sessions.try_claim().ok_or(ApiError::SessionActive)?;
    let running = Session::start(session_config, state.links.as_ref()).await?;
    info!(host = %running.host(), targets = running.targets().len(), "Session started");

    tokio::spawn(async move {
        let summary = running.finish().await;
        info!(
            poison_sent = summary.poison.sent,
            restore_sent = summary.restore.sent,
            "Session finished"
        );
        drop(slot);
    });

    let result = capture::capture_dns(&window, state.links.as_ref()).await?;
    let exchanges: Vec<DnsQueryDto> = result.exchanges.iter().map(DnsQueryDto::from).collect();
    info!(exchanges = exchanges.len(), truncated = result.truncated, "Capture complete");

    let mut response = Json(exchanges).into_response();
    if result.truncated {
        response
            .headers_mut()
            .insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
    }
    Ok(response)
}
