//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{ScanLimits, ServerConfig, ServerConfigError};
pub use state_builders::build_http_state;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::data::chart;
use crate::inbound::http::error::{json_error_handler, query_error_handler};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::service_info::service_info;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::submit::{submit, submit_batch};
use crate::inbound::http::users::{current_user_stats, delete_current_user_data};
use crate::middleware::{RateLimit, RateLimiter, Trace};

/// Largest accepted JSON body: a full batch of maximum-size outputs is
/// rejected, typical suite runs are not.
pub const MAX_JSON_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared handles cloned into every worker's app.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Assemble the application: routes, extractor config, and middleware.
///
/// Middleware order from the outside in: [`Trace`], then [`RateLimit`], so
/// rate-limited responses still carry a trace id.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        rate_limiter,
    } = deps;

    let api = web::scope("/api")
        .service(service_info)
        .service(submit)
        .service(submit_batch)
        .service(chart)
        .service(current_user_stats)
        .service(delete_current_user_data);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(
            web::JsonConfig::default()
                .limit(MAX_JSON_BODY_BYTES)
                .error_handler(json_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.wrap(RateLimit::new(rate_limiter)).wrap(Trace)
}

/// Bind the HTTP server and mark it ready.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config));
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state,
        rate_limiter: Arc::clone(&config.rate_limiter),
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
