//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;
use domain::services::ChannelState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub realtime: RealtimeHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Change channel health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RealtimeHealth {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_state: Option<ChannelState>,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_state: Option<ChannelState>,
}

fn realtime_health(state: &AppState) -> RealtimeHealth {
    RealtimeHealth {
        enabled: state.realtime.is_some(),
        channel_state: state.realtime.as_ref().map(|r| r.channel_state()),
    }
}

/// Full health check endpoint.
///
/// Reports database connectivity and the change channel state. Only a
/// database outage makes the service unhealthy.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let db_connected = state.store.ping().await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    let response = HealthResponse {
        status: if db_connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: db_connected,
            latency_ms: if db_connected { Some(latency_ms) } else { None },
        },
        realtime: realtime_health(&state),
    };

    let status = if db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
        channel_state: None,
    })
}

/// Readiness probe endpoint.
///
/// Not ready while the database is unreachable or the change channel has
/// given up reconnecting.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    let db_connected = state.store.ping().await.is_ok();
    let channel_state = state.realtime.as_ref().map(|r| r.channel_state());
    let channel_ok = channel_state != Some(ChannelState::Failed);

    if db_connected && channel_ok {
        (
            StatusCode::OK,
            Json(StatusResponse {
                status: "ready".to_string(),
                channel_state,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusResponse {
                status: "not_ready".to_string(),
                channel_state,
            }),
        )
    }
}
