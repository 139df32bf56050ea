mod routes;
mod types;

#[cfg(feature = "openapi")]
mod openapi;

use crate::config::HTTPConfig;
use crate::http::routes::*;
use crate::http::types::HttpError;
use crate::relay::MessageRelay;
use anyhow::{bail, Result};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::log::{debug, warn};

#[cfg(feature = "openapi")]
use utoipa::OpenApi;

#[cfg(feature = "sentry")]
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};

const AUTH_TOKEN_ENV: &str = "RELAY_HTTP_AUTH_TOKEN";

#[derive(Clone)]
pub struct HttpState {
    pub relay: MessageRelay,
    pub verify_token: Option<String>,
}

/// Send routes accept `Authorization: Bearer <token>` only.
async fn auth_middleware(
    axum::extract::State(expected_token): axum::extract::State<String>,
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, HttpError> {
    let unauthorized = |message: &str| HttpError {
        status: StatusCode::UNAUTHORIZED,
        message: message.to_string(),
    };

    let Some(header) = request.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("Missing authorization header"));
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| unauthorized("Expected a bearer token"))?;

    if token != expected_token {
        return Err(unauthorized("Invalid token"));
    }
    Ok(next.run(request).await)
}

pub fn create_app(config: &HTTPConfig, state: HttpState, _sentry: bool) -> Result<axum::Router> {
    // The auth token is only ever read from the environment, never the config file.
    let auth_token = if config.require_authentication {
        match std::env::var(AUTH_TOKEN_ENV) {
            Ok(token) => Some(token),
            Err(_) => bail!("Missing required {AUTH_TOKEN_ENV} environment variable, and require_authentication is enabled!"),
        }
    } else {
        warn!("Serving send routes without authentication middleware, as require_authentication is disabled!");
        None
    };

    #[allow(unused_mut)]
    let mut router = build_router(auth_token);

    #[cfg(feature = "openapi")]
    {
        debug!("Adding OpenAPI SwaggerUi at /docs!");
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/docs/openapi.json", openapi::ApiDoc::openapi()),
        );
    }

    // If Sentry is enabled, include axum integration layers.
    #[cfg(feature = "sentry")]
    if _sentry {
        debug!("Adding Sentry HTTP layer!");
        router = router
            .layer(
                ServiceBuilder::new()
                    .layer(NewSentryLayer::<axum::http::Request<axum::body::Body>>::new_from_top()),
            )
            .layer(ServiceBuilder::new().layer(SentryHttpLayer::new().enable_transaction()))
    }

    Ok(router.with_state(state))
}

/// Webhook and health routes are always public, the platform cannot authenticate.
/// Only the outbound send routes sit behind the optional bearer token.
fn build_router(auth_token: Option<String>) -> axum::Router<HttpState> {
    let mut send_routes = axum::Router::new()
        .route("/send-message", post(send_message))
        .route("/send-template", post(send_template));

    if let Some(token) = auth_token {
        debug!("Adding HTTP authentication middleware to send routes!");
        send_routes = send_routes.layer(axum::middleware::from_fn_with_state(token, auth_middleware));
    }

    axum::Router::new()
        .route("/health", get(health))
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        .merge(send_routes)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-version"),
            HeaderValue::from_static(crate::VERSION),
        ))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PlaceholderAgent;
    use crate::config::WhatsAppConfig;
    use crate::whatsapp::WhatsAppClient;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::response::Response;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VERIFY_TOKEN: &str = "hook-secret";

    fn app(server: &MockServer, auth_token: Option<&str>) -> axum::Router {
        let config = WhatsAppConfig {
            access_token: "test_token".to_string(),
            phone_number_id: "42".to_string(),
            graph_url: server.uri(),
            ..Default::default()
        };
        let client = WhatsAppClient::new(&config).unwrap();
        let state = HttpState {
            relay: MessageRelay::new(client, Arc::new(PlaceholderAgent)),
            verify_token: Some(VERIFY_TOKEN.to_string()),
        };
        build_router(auth_token.map(str::to_string)).with_state(state)
    }

    async fn call(app: axum::Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json_value(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    async fn mount_ok(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"messages": [{"id": "wamid.reply"}]})),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        let response = call(app(&server, None), get_request("/health")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-version").unwrap(),
            crate::VERSION
        );
        assert_eq!(body_json_value(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_webhook_verification_success() {
        let server = MockServer::start().await;
        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"
        );
        let response = call(app(&server, None), get_request(&uri)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "1158201444");
    }

    #[tokio::test]
    async fn test_webhook_verification_failures() {
        let server = MockServer::start().await;
        for uri in [
            "/webhook",
            "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
            "/webhook?hub.mode=unsubscribe&hub.verify_token=hook-secret&hub.challenge=1",
            "/webhook?hub.verify_token=hook-secret&hub.challenge=1",
        ] {
            let response = call(app(&server, None), get_request(uri)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body_text(response).await, "Verification failed");
        }
    }

    #[tokio::test]
    async fn test_webhook_example_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v19.0/42/messages"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "123",
                "type": "text",
                "text": {"body": "Received your message: 'hi'. This is an automated reply."},
                "context": {"message_id": "m1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .expect(1)
            .mount(&server)
            .await;

        let payload = json!({"entry":[{"changes":[{"value":{"messages":[
            {"type":"text","from":"123","id":"m1","text":{"body":"hi"}}
        ]}}]}]});
        let response = call(app(&server, None), post_json("/webhook", &payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json_value(response).await, json!({"status": "success"}));
    }

    #[tokio::test]
    async fn test_webhook_non_text_messages_succeed_without_sending() {
        let server = MockServer::start().await;
        mount_ok(&server, 0).await;

        let payload = json!({"entry":[{"changes":[{"value":{"messages":[
            {"type":"image","from":"123","id":"m1","image":{"id":"media-1"}}
        ]}}]}]});
        let response = call(app(&server, None), post_json("/webhook", &payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json_value(response).await, json!({"status": "success"}));
    }

    #[tokio::test]
    async fn test_webhook_malformed_payload() {
        let server = MockServer::start().await;
        mount_ok(&server, 0).await;

        let payload = json!({"entry":[{"changes":[{"value":{"messages":[
            {"type":"text","from":"123","text":{"body":"no id"}}
        ]}}]}]});
        let response = call(app(&server, None), post_json("/webhook", &payload)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json_value(response).await, json!({"status": "error"}));
    }

    #[tokio::test]
    async fn test_webhook_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let payload = json!({"entry":[{"changes":[{"value":{"messages":[
            {"type":"text","from":"123","id":"m1","text":{"body":"hi"}}
        ]}}]}]});
        let response = call(app(&server, None), post_json("/webhook", &payload)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json_value(response).await, json!({"status": "error"}));
    }

    #[tokio::test]
    async fn test_webhook_rejects_non_json_body() {
        let server = MockServer::start().await;
        mount_ok(&server, 0).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .body(Body::from("not json"))
            .unwrap();
        let response = call(app(&server, None), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_message_relays_upstream_response() {
        let server = MockServer::start().await;
        let upstream = json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": "123", "wa_id": "123"}],
            "messages": [{"id": "wamid.sent"}]
        });
        Mock::given(method("POST"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "123",
                "type": "text",
                "text": {"body": "hello"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(upstream.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!({"recipient": "123", "message": "hello"});
        let response = call(app(&server, None), post_json("/send-message", &body)).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json_value(response).await, upstream);
    }

    #[tokio::test]
    async fn test_send_message_missing_recipient() {
        let server = MockServer::start().await;
        mount_ok(&server, 0).await;

        let body = json!({"message": "hello"});
        let response = call(app(&server, None), post_json("/send-message", &body)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body_json_value(response).await;
        assert!(error["error"].as_str().unwrap().contains("recipient"));
    }

    #[tokio::test]
    async fn test_send_message_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid parameter"))
            .mount(&server)
            .await;

        let body = json!({"recipient": "123", "message": "hello"});
        let response = call(app(&server, None), post_json("/send-message", &body)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body_json_value(response).await;
        assert!(error["error"].as_str().unwrap().contains("400"));
    }

    #[tokio::test]
    async fn test_send_template_default_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "123",
                "type": "template",
                "template": {"name": "hello_world", "language": {"code": "en_US"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!({"recipient": "123", "template": "hello_world"});
        let response = call(app(&server, None), post_json("/send-template", &body)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_routes_require_token_when_enabled() {
        let server = MockServer::start().await;
        mount_ok(&server, 1).await;
        let body = json!({"recipient": "123", "message": "hello"});

        let response = call(
            app(&server, Some("api-token")),
            post_json("/send-message", &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = post_json("/send-message", &body);
        request
            .headers_mut()
            .insert("authorization", "Bearer wrong".parse().unwrap());
        let response = call(app(&server, Some("api-token")), request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = post_json("/send-message", &body);
        request
            .headers_mut()
            .insert("authorization", "Bearer api-token".parse().unwrap());
        let response = call(app(&server, Some("api-token")), request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_routes_reject_non_bearer_credentials() {
        let server = MockServer::start().await;
        mount_ok(&server, 0).await;
        let body = json!({"recipient": "123", "template": "hello_world"});

        for credentials in ["api-token", "Basic api-token", "bearer api-token"] {
            let mut request = post_json("/send-template", &body);
            request
                .headers_mut()
                .insert("authorization", credentials.parse().unwrap());
            let response = call(app(&server, Some("api-token")), request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{credentials}");
            assert_eq!(
                body_json_value(response).await,
                json!({"error": "Expected a bearer token"})
            );
        }
    }

    #[tokio::test]
    async fn test_webhook_routes_stay_public_with_auth() {
        let server = MockServer::start().await;
        let response = call(app(&server, Some("api-token")), get_request("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=abc"
        );
        let response = call(app(&server, Some("api-token")), get_request(&uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
