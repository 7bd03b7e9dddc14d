//! The invocation route. One prompt in, one completion out, either as a JSON
//! document or as a simulated word-by-word SSE stream.

use crate::domain::types::Completion;
use crate::infrastructure::server::dto::{
    ErrorResponse, InvocationMetadata, InvocationResponse,
};
use crate::infrastructure::server::payload::InboundPayload;
use crate::infrastructure::server::state::GatewayContext;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::iter as event_stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/invocations",
    tag = "invocations",
    request_body = crate::infrastructure::server::dto::InvocationRequest,
    responses(
        (status = 200, description = "Completion produced; SSE when the Accept header asks for text/event-stream", body = InvocationResponse),
        (status = 400, description = "No usable prompt in the request body", body = ErrorResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse),
        (status = 503, description = "Agent is not ready", body = ErrorResponse)
    )
)]
pub async fn invocations_handler(
    State(ctx): State<Arc<GatewayContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = Uuid::new_v4();

    let Some(agent) = ctx.agent().await else {
        warn!(%request_id, "Rejecting invocation while the agent is not ready");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                "Service Unavailable",
                "the agent is not ready to accept invocations",
            )),
        )
            .into_response();
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let prompt = match InboundPayload::classify(content_type, body).normalize() {
        Ok(prompt) => prompt,
        Err(payload_error) => {
            warn!(%request_id, details = payload_error.details(), "Rejecting invocation");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Bad Request", payload_error.details())),
            )
                .into_response();
        }
    };

    info!(%request_id, prompt_chars = prompt.chars().count(), "Handling invocation");
    let completion = match agent.generate(&prompt).await {
        Ok(completion) => completion,
        Err(generation_error) => {
            error!(%request_id, %generation_error, "Invocation failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "Internal Server Error",
                    generation_error.to_string(),
                )),
            )
                .into_response();
        }
    };
    info!(
        %request_id,
        used_tool_count = completion.used_tool_count,
        tokens = completion.token_usage,
        "Invocation completed"
    );

    if wants_event_stream(&headers) {
        stream_completion(completion)
    } else {
        let metadata = InvocationMetadata {
            model: agent.model().to_string(),
            tokens: completion.token_usage,
        };
        Json(InvocationResponse {
            response: completion.text,
            status: "success".to_string(),
            metadata,
        })
        .into_response()
    }
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// The completion is produced in full before streaming starts; the stream
/// replays it word by word with a trailing space per chunk, then a done marker.
fn stream_completion(completion: Completion) -> Response {
    let mut events: Vec<Result<Event, Infallible>> = completion
        .text
        .split(' ')
        .map(|word| {
            Ok(Event::default().data(json!({ "chunk": format!("{word} ") }).to_string()))
        })
        .collect();
    events.push(Ok(Event::default().data(json!({ "done": true }).to_string())));
    Sse::new(event_stream(events)).into_response()
}
