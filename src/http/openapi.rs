use crate::http::routes::*;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::{ContentBuilder, RefOr, Response};
use utoipa::Modify;

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "WhatsApp Relay",
    ),
    tags(
        (name = "Webhook", description = "Platform webhook verification and message delivery"),
        (name = "Messages", description = "Outbound text and template messages"),
        (name = "System", description = "Service status")
    ),
    paths(
        health,
        webhook_verify,
        webhook_receive,
        send_message,
        send_template,
    ),
    components(
        schemas(
            crate::http::types::StatusResponse,
            crate::http::types::ErrorResponse,
            crate::http::types::SendMessageRequest,
            crate::http::types::SendTemplateRequest,
        )
    ),
    modifiers(&OpenApiModifier)
)]
pub struct ApiDoc;

struct OpenApiModifier;
impl Modify for OpenApiModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info = utoipa::openapi::InfoBuilder::new()
            .title("WhatsApp Relay")
            .version(env!("CARGO_PKG_VERSION"))
            .description(Some(env!("CARGO_PKG_DESCRIPTION")))
            .license(Some(
                utoipa::openapi::LicenseBuilder::new()
                    .name(env!("CARGO_PKG_LICENSE"))
                    .url(Some(format!("https://spdx.org/licenses/{}.html", env!("CARGO_PKG_LICENSE"))))
                    .build(),
            ))
            .build();

        // Only used when require_authentication is enabled.
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }

        // The send routes share the authentication failure responses.
        let auth_responses = [("401", "Invalid token")];
        for (route, path_item) in openapi.paths.paths.iter_mut() {
            if !route.starts_with("/send-") {
                continue;
            }

            for op in [&mut path_item.post].into_iter().flatten() {
                for (status, desc) in auth_responses {
                    op.responses
                        .responses
                        .entry(status.to_string())
                        .or_insert_with(|| {
                            let content = ContentBuilder::new()
                                .example(Some(serde_json::json!({ "error": desc })))
                                .build();

                            RefOr::T(
                                Response::builder()
                                    .description(desc)
                                    .content("application/json", content)
                                    .build(),
                            )
                        });
                }
            }
        }
    }
}
