//! Readiness probe and service information routes.

use crate::infrastructure::server::dto::{PingResponse, ServiceEndpoints, ServiceInfo};
use crate::infrastructure::server::state::{GatewayContext, GatewayStatus};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses(
        (status = 200, description = "Agent is ready for invocations", body = PingResponse),
        (status = 503, description = "Agent is initializing or failed to initialize", body = PingResponse)
    )
)]
pub async fn ping_handler(
    State(ctx): State<Arc<GatewayContext>>,
) -> (StatusCode, Json<PingResponse>) {
    let (status, time_of_last_update) = ctx.snapshot().await;
    debug!(status = status.label(), "Handling /ping");
    match status {
        GatewayStatus::Initializing => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(PingResponse {
                status: "HealthyBusy".to_string(),
                message: Some("agent initialization in progress".to_string()),
                error: None,
                time_of_last_update,
            }),
        ),
        GatewayStatus::Ready(_) => (
            StatusCode::OK,
            Json(PingResponse {
                status: "Healthy".to_string(),
                message: None,
                error: None,
                time_of_last_update,
            }),
        ),
        GatewayStatus::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(PingResponse {
                status: "Unhealthy".to_string(),
                message: None,
                error: Some(reason),
                time_of_last_update,
            }),
        ),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service name, version, and route listing", body = ServiceInfo)
    )
)]
pub async fn service_info_handler(State(ctx): State<Arc<GatewayContext>>) -> Json<ServiceInfo> {
    let (status, _) = ctx.snapshot().await;
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: status.label().to_string(),
        endpoints: ServiceEndpoints {
            ping: "GET /ping".to_string(),
            invocations: "POST /invocations".to_string(),
            docs: "GET /docs".to_string(),
        },
    })
}
