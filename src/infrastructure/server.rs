//! HTTP surface of the gateway: router assembly, OpenAPI document, and the
//! listener loop.

pub mod dto;
pub mod error;
pub mod payload;
pub mod routes;
pub mod state;

pub use error::ServerError;
pub use state::{GatewayContext, GatewayStatus};

use axum::extract::OriginalUri;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dto::ErrorResponse;
use routes::health::{ping_handler, service_info_handler};
use routes::invocations::invocations_handler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::ping_handler,
        routes::health::service_info_handler,
        routes::invocations::invocations_handler
    ),
    components(
        schemas(
            dto::PingResponse,
            dto::InvocationRequest,
            dto::InvocationResponse,
            dto::InvocationMetadata,
            dto::ErrorResponse,
            dto::ServiceInfo,
            dto::ServiceEndpoints
        )
    ),
    tags(
        (name = "health", description = "Readiness and service information"),
        (name = "invocations", description = "Agent invocation endpoint")
    )
)]
struct ApiDoc;

pub fn build_router(ctx: Arc<GatewayContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/ping", get(ping_handler))
        .route("/invocations", post(invocations_handler))
        .route("/", get(service_info_handler))
        .fallback(fallback_handler)
        .layer(cors)
        .with_state(ctx)
}

async fn fallback_handler(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    warn!(%method, path = uri.path(), "No route matched");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "Not Found",
            format!("route {method} {} does not exist", uri.path()),
        )),
    )
}

pub async fn serve(ctx: Arc<GatewayContext>, addr: SocketAddr) -> Result<(), ServerError> {
    let app = build_router(ctx);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Gateway listening");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
