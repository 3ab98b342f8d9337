//! HTTP API layer for the reports service.

pub mod auth;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use auth::{IdentityVerifier, KeycloakConfig, KeycloakVerifier};
pub use routes::{router, CorsConfig};
pub use state::AppState;
