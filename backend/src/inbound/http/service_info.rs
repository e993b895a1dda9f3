//! Service banner.
//!
//! ```text
//! GET /api
//! ```

use actix_web::{HttpResponse, get};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "pramana-api";

/// Response payload identifying the running service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfoBody {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "pramana-api")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Identify the service and its version.
#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "Service banner", body = ServiceInfoBody)),
    tags = ["service"],
    operation_id = "serviceInfo",
    security([])
)]
#[get("")]
pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfoBody {
        status: "ok".to_owned(),
        service: SERVICE_NAME.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}
