//! Service banner.

use axum::Json;

use crate::response::{EndpointIndex, RootResponse};

/// GET / - Service name, version and endpoint index.
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Reports API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: EndpointIndex {
            health: "/health".to_string(),
            reports: "/reports".to_string(),
        },
    })
}
