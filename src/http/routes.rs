use crate::http::types::{
    HttpError, HttpResult, SendMessageRequest, SendTemplateRequest, StatusResponse, VerifyQuery,
};
use crate::http::HttpState;
use crate::whatsapp::types::DEFAULT_TEMPLATE_LANGUAGE;
use crate::whatsapp::SentMessage;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::log::{error, info, warn};

/// Rejects bodies that are not JSON at all, before any processing happens.
fn parse_json(body: &[u8]) -> Result<serde_json::Value, HttpError> {
    serde_json::from_slice(body).map_err(HttpError::bad_request)
}

/// Missing or mistyped fields are processing errors, not bad requests.
fn parse_request<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpError> {
    serde_json::from_value(parse_json(body)?).map_err(|e| {
        error!("Invalid send request: {e}");
        HttpError::internal(e)
    })
}

fn relay_upstream(sent: SentMessage) -> HttpResult {
    let status = StatusCode::from_u16(sent.status).map_err(HttpError::internal)?;
    Ok((status, Json(sent.body)).into_response())
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, body = crate::http::types::StatusResponse,
            example = json!({"status": "ok"}))
    )
))]
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::OK)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/webhook",
    tag = "Webhook",
    params(crate::http::types::VerifyQuery),
    responses(
        (status = 200, description = "Challenge echoed back", body = String),
        (status = 403, description = "Verification failed", body = String)
    )
))]
pub async fn webhook_verify(
    State(state): State<HttpState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    match query.verify(state.verify_token.as_deref()) {
        Some(challenge) => {
            info!("WEBHOOK_VERIFIED");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("Webhook verification failed");
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhook",
    request_body = serde_json::Value,
    responses(
        (status = 200, body = crate::http::types::StatusResponse,
            example = json!({"status": "success"})),
        (status = 500, body = crate::http::types::StatusResponse,
            example = json!({"status": "error"}))
    )
))]
pub async fn webhook_receive(State(state): State<HttpState>, body: Bytes) -> HttpResult {
    let payload = parse_json(&body)?;
    info!("Incoming payload: {payload}");

    let response = match state.relay.handle_payload(payload).await {
        Ok(_) => (StatusCode::OK, Json(StatusResponse::SUCCESS)),
        Err(e) => {
            error!("Error processing webhook: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::ERROR),
            )
        }
    };
    Ok(response.into_response())
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/send-message",
    tag = "Messages",
    security((), ("bearer_auth" = [])),
    request_body = crate::http::types::SendMessageRequest,
    responses(
        (status = 200, description = "Graph API response, relayed verbatim", body = serde_json::Value),
        (status = 500, body = crate::http::types::ErrorResponse)
    )
))]
pub async fn send_message(State(state): State<HttpState>, body: Bytes) -> HttpResult {
    let request: SendMessageRequest = parse_request(&body)?;
    let sent = state
        .relay
        .client()
        .send_text(&request.recipient, &request.message, None)
        .await
        .map_err(|e| {
            error!("Error sending message: {e}");
            HttpError::internal(e)
        })?;

    relay_upstream(sent)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/send-template",
    tag = "Messages",
    security((), ("bearer_auth" = [])),
    request_body = crate::http::types::SendTemplateRequest,
    responses(
        (status = 200, description = "Graph API response, relayed verbatim", body = serde_json::Value),
        (status = 500, body = crate::http::types::ErrorResponse)
    )
))]
pub async fn send_template(State(state): State<HttpState>, body: Bytes) -> HttpResult {
    let request: SendTemplateRequest = parse_request(&body)?;
    let language_code = request
        .language_code
        .as_deref()
        .unwrap_or(DEFAULT_TEMPLATE_LANGUAGE);

    let sent = state
        .relay
        .client()
        .send_template(&request.recipient, &request.template, language_code)
        .await
        .map_err(|e| {
            error!("Error sending template: {e}");
            HttpError::internal(e)
        })?;

    relay_upstream(sent)
}
