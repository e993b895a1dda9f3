//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer, the
//! domain error schema wrappers, and the bearer-token security scheme. The
//! document is served by Swagger UI in debug builds and printed by the
//! `openapi-dump` binary.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// Adds the bearer-token security scheme to the generated document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Token issued by the identity provider"))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Pramana submissions API",
        description = "Crowdsourced LLM output submissions, crowd statistics, and personal data rights."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::service_info::service_info,
        crate::inbound::http::submit::submit,
        crate::inbound::http::submit::submit_batch,
        crate::inbound::http::data::chart,
        crate::inbound::http::users::current_user_stats,
        crate::inbound::http::users::delete_current_user_data,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "submissions", description = "Accept model outputs"),
        (name = "data", description = "Aggregated crowd statistics"),
        (name = "users", description = "Personal statistics and data-rights requests"),
        (name = "service", description = "Service metadata"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
