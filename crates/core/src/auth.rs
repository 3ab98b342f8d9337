//! Bearer credentials and verified identities.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity claims yielded by the identity provider for a verified token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub email: Option<String>,
    /// `preferred_username` claim.
    pub username: Option<String>,
    /// `sub` claim.
    pub subject: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: Option<i64>,
}

impl VerifiedIdentity {
    /// The string used to look up mart rows: email, else username, else subject.
    pub fn identity(&self) -> Option<&str> {
        [&self.email, &self.username, &self.subject]
            .into_iter()
            .filter_map(|claim| claim.as_deref())
            .find(|claim| !claim.is_empty())
    }

    /// Same as [`identity`](Self::identity), as a rejection when absent.
    pub fn require_identity(&self) -> Result<&str> {
        self.identity().ok_or_else(Error::identity_unresolved)
    }

    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now_secs)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
/// The scheme name is matched case-insensitively.
pub fn extract_bearer(auth_header: Option<&str>) -> Result<&str> {
    let token = auth_header
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .ok_or_else(Error::unauthenticated)?;

    if token.is_empty() {
        return Err(Error::unauthenticated());
    }

    Ok(token)
}
