use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Fixed `{"status": ...}` bodies used by the health and webhook routes.
#[derive(Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusResponse {
    pub status: &'static str,
}
impl StatusResponse {
    pub const OK: Self = Self { status: "ok" };
    pub const SUCCESS: Self = Self { status: "success" };
    pub const ERROR: Self = Self { status: "error" };
}

#[derive(Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}
impl HttpError {
    pub fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }

    pub fn bad_request(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: error.to_string(),
        }
    }
}
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type HttpResult = Result<Response, HttpError>;

/// Query sent by the platform when (re)subscribing the webhook URL.
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,

    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,

    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}
impl VerifyQuery {
    /// Returns the challenge to echo back if the subscription request is valid.
    /// Without a configured token nothing verifies.
    pub fn verify(self, expected_token: Option<&str>) -> Option<String> {
        let expected_token = expected_token?;
        let valid = self.mode.as_deref() == Some("subscribe")
            && self.verify_token.as_deref() == Some(expected_token);

        valid.then(|| self.challenge.unwrap_or_default())
    }
}

#[derive(Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendMessageRequest {
    pub recipient: String,
    pub message: String,
}

#[derive(Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendTemplateRequest {
    pub recipient: String,
    pub template: String,

    #[serde(default)]
    pub language_code: Option<String>,
}
