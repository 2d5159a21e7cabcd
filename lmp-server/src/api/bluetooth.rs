//! Bluetooth adapter and device routes

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use lmp_common::events::DeviceInfo;
use serde::{Deserialize, Serialize};

use crate::api::extract::JsonBody;
use crate::bluetooth::{parse_device_id, AdapterPower, AdapterState, ScanStart};
use crate::error::{ApiContext, ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceRequest {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub enabled: bool,
    pub state: AdapterPower,
}

/// `{success, message}` plus the device when one is involved
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

/// Scan start/stop result with the scanning flag after the call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub message: String,
    pub is_scanning: bool,
}

impl ScanResponse {
    fn new(success: bool, message: &str, is_scanning: bool) -> Json<Self> {
        Json(Self {
            success,
            message: message.to_string(),
            is_scanning,
        })
    }
}

impl ActionResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            device: None,
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bluetooth/state", get(get_state))
        .route("/bluetooth/toggle", post(toggle))
        .route("/bluetooth/paired", get(paired_devices))
        .route("/bluetooth/connected", get(connected_devices))
        .route("/bluetooth/available", get(available_devices))
        .route("/bluetooth/scan", post(start_scan))
        .route("/bluetooth/scan/stop", post(stop_scan))
        .route("/bluetooth/connect", post(connect))
        .route("/bluetooth/disconnect", post(disconnect))
        .route("/bluetooth/paired/:id", delete(remove_device))
}

/// GET /api/bluetooth/state
pub async fn get_state(State(state): State<AppState>) -> Json<AdapterState> {
    Json(state.bluetooth.state().await)
}

/// POST /api/bluetooth/toggle
pub async fn toggle(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    let enabled = request
        .enabled
        .ok_or_else(|| ApiError::bad_request("Enabled status is required"))?;

    let adapter = state
        .bluetooth
        .set_enabled(enabled)
        .await
        .api_detail("Error toggling Bluetooth")?;

    Ok(Json(ToggleResponse {
        success: true,
        enabled: adapter.enabled,
        state: adapter.state,
    }))
}

/// GET /api/bluetooth/paired
pub async fn paired_devices(State(state): State<AppState>) -> ApiResult<Json<DevicesResponse>> {
    let devices = state
        .bluetooth
        .paired_devices()
        .await
        .api_context("Error getting paired devices")?;
    Ok(Json(DevicesResponse { devices }))
}

/// GET /api/bluetooth/connected
pub async fn connected_devices(State(state): State<AppState>) -> ApiResult<Json<DevicesResponse>> {
    let devices = state
        .bluetooth
        .connected_devices()
        .await
        .api_context("Error getting connected devices")?;
    Ok(Json(DevicesResponse { devices }))
}

/// GET /api/bluetooth/available
pub async fn available_devices(State(state): State<AppState>) -> Json<DevicesResponse> {
    Json(DevicesResponse {
        devices: state.bluetooth.available_devices(),
    })
}

/// POST /api/bluetooth/scan
pub async fn start_scan(State(state): State<AppState>) -> ApiResult<Json<ScanResponse>> {
    let started = state
        .bluetooth
        .start_scan()
        .await
        .api_detail("Error starting scan")?;

    Ok(match started {
        ScanStart::Started => ScanResponse::new(true, "Bluetooth scan started", true),
        ScanStart::AlreadyScanning => ScanResponse::new(true, "Already scanning for devices", true),
        ScanStart::NotReady => {
            ScanResponse::new(false, "Cannot start scan, Bluetooth not ready", false)
        }
    })
}

/// POST /api/bluetooth/scan/stop
pub async fn stop_scan(State(state): State<AppState>) -> Json<ScanResponse> {
    state.bluetooth.stop_scan().await;
    ScanResponse::new(true, "Scanning stopped", false)
}

/// POST /api/bluetooth/connect
pub async fn connect(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<DeviceRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let mac = parse_device_id(request.id.as_deref()).api_context("Error connecting to device")?;

    let outcome = state
        .bluetooth
        .connect(&mac)
        .await
        .api_detail("Error connecting to device")?;

    let message = if outcome.already_connected {
        "Device already connected"
    } else {
        "Device connected successfully"
    };
    Ok(Json(ActionResponse {
        success: true,
        message: message.to_string(),
        device: Some(outcome.device),
    }))
}

/// POST /api/bluetooth/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<DeviceRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let mac = parse_device_id(request.id.as_deref()).api_context("Error disconnecting device")?;

    let device = state
        .bluetooth
        .disconnect(&mac)
        .await
        .api_detail("Error disconnecting device")?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Device disconnected successfully".to_string(),
        device: Some(device),
    }))
}

/// DELETE /api/bluetooth/paired/:id
pub async fn remove_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let mac = parse_device_id(Some(&id)).api_context("Error removing device")?;
    state
        .bluetooth
        .remove(&mac)
        .await
        .api_detail("Error removing device")?;
    Ok(ActionResponse::ok("Device removed successfully"))
}
