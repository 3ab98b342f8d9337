//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use reports_core::{extract_bearer, Error, VerifiedIdentity};
use telemetry::metrics;
use tracing::debug;

use crate::response::ApiError;
use crate::state::AppState;

/// Caller identity verified from the `Authorization: Bearer` header.
///
/// Every failure is the same 401 so callers cannot tell which check failed.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub VerifiedIdentity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let verified = match extract_bearer(auth_header) {
            Ok(token) => state.verifier.verify(token).await,
            Err(_) => None,
        };

        let now = chrono::Utc::now().timestamp();
        match verified {
            Some(identity) if !identity.is_expired(now) => Ok(CurrentUser(identity)),
            _ => {
                debug!("Rejected bearer credential");
                metrics().report_rejections.inc();
                Err(Error::unauthenticated().into())
            }
        }
    }
}
