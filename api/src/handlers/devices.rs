use axum::{Json, extract::State};
use tracing::{debug, instrument};

use crate::dto::DeviceDto;
use crate::state::AppState;

#[instrument(skip(state), name = "api_list_devices")]
pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<DeviceDto>> {
    let devices: Vec<DeviceDto> = state
        .links
        .devices()
        .into_iter()
        .map(DeviceDto::from)
        .collect();
    debug!(count = devices.len(), "Devices listed");
    Json(devices)
}
