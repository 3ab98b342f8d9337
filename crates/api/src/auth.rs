//! Bearer token verification against the identity provider.
//!
//! The provider is Keycloak speaking OpenID Connect. Access tokens are RS256
//! JWTs checked locally against the realm key set, and the profile comes from
//! the userinfo endpoint. Every failure collapses to "not verified".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use reports_core::{Error, Result, VerifiedIdentity};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Verifies a bearer token and returns the identity it belongs to.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// `None` for any token that is missing, malformed, badly signed,
    /// expired or could not be checked.
    async fn verify(&self, token: &str) -> Option<VerifiedIdentity>;
}

/// Identity provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakConfig {
    /// Base URL, e.g. `http://keycloak:8080`
    pub url: String,
    pub realm: String,
    pub client_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            url: "http://keycloak:8080".to_string(),
            realm: "reports-realm".to_string(),
            client_id: "reports-api".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl KeycloakConfig {
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.url.trim_end_matches('/'), self.realm)
    }

    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.issuer())
    }
}

#[derive(Debug, thiserror::Error)]
enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),
}

/// Endpoints taken from the discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderEndpoints {
    pub jwks_uri: String,
    pub userinfo_endpoint: String,
}

/// Access token claims. Audience is not checked.
#[derive(Debug, Default, Deserialize)]
struct Claims {
    exp: Option<i64>,
    sub: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
}

impl Claims {
    /// Identity used when userinfo is unavailable. Email is left out.
    fn fallback_identity(self) -> VerifiedIdentity {
        VerifiedIdentity {
            email: None,
            username: self.preferred_username.or(self.email),
            subject: self.sub,
            expires_at: self.exp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    preferred_username: Option<String>,
    sub: Option<String>,
}

/// Picks the key named by `kid`, or the only key when the token names none.
fn find_key(keys: &JwkSet, kid: Option<&str>) -> Option<DecodingKey> {
    let jwk = match kid {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }?;
    DecodingKey::from_jwk(jwk).ok()
}

/// Keycloak-backed [`IdentityVerifier`].
///
/// Discovery runs once on first use. If it fails, that failure is kept and
/// returned until the process restarts. The key set is cached and fetched
/// again when a token names a key it does not hold.
pub struct KeycloakVerifier {
    config: KeycloakConfig,
    http: reqwest::Client,
    endpoints: OnceCell<std::result::Result<ProviderEndpoints, String>>,
    keys: RwLock<Option<Arc<JwkSet>>>,
}

impl KeycloakVerifier {
    pub fn new(config: KeycloakConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            endpoints: OnceCell::new(),
            keys: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Provider endpoints, discovered on the first call.
    pub async fn resolve(&self) -> Result<&ProviderEndpoints> {
        self.endpoints
            .get_or_init(|| self.discover())
            .await
            .as_ref()
            .map_err(|msg| Error::internal(msg.clone()))
    }

    async fn discover(&self) -> std::result::Result<ProviderEndpoints, String> {
        let url = self.config.discovery_url();
        debug!(url = %url, "Fetching OpenID configuration");

        self.get_json(&url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Identity provider initialization failed");
            format!("Error initializing identity provider: {e}")
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, ProviderError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn signing_key(
        &self,
        endpoints: &ProviderEndpoints,
        kid: Option<&str>,
    ) -> std::result::Result<DecodingKey, ProviderError> {
        let cached = self.keys.read().clone();
        if let Some(key) = cached.and_then(|keys| find_key(&keys, kid)) {
            return Ok(key);
        }

        debug!(url = %endpoints.jwks_uri, kid = ?kid, "Fetching signing keys");
        let keys: Arc<JwkSet> = Arc::new(self.get_json(&endpoints.jwks_uri).await?);
        *self.keys.write() = Some(Arc::clone(&keys));

        find_key(&keys, kid).ok_or_else(|| ProviderError::UnknownKey(kid.map(str::to_string)))
    }

    async fn check_token(
        &self,
        endpoints: &ProviderEndpoints,
        token: &str,
    ) -> std::result::Result<Claims, ProviderError> {
        let header = decode_header(token)?;
        let key = self.signing_key(endpoints, header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(decode::<Claims>(token, &key, &validation)?.claims)
    }

    async fn userinfo(
        &self,
        endpoints: &ProviderEndpoints,
        token: &str,
    ) -> std::result::Result<UserInfo, ProviderError> {
        let response = self
            .http
            .get(&endpoints.userinfo_endpoint)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityVerifier for KeycloakVerifier {
    async fn verify(&self, token: &str) -> Option<VerifiedIdentity> {
        let endpoints = match self.resolve().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                debug!(error = %e, "Identity provider unavailable");
                return None;
            }
        };

        let claims = match self.check_token(endpoints, token).await {
            Ok(claims) => claims,
            Err(ProviderError::Token(e)) => {
                debug!(error = %e, "Token rejected");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                return None;
            }
        };

        match self.userinfo(endpoints, token).await {
            Ok(info) => Some(VerifiedIdentity {
                email: info.email,
                username: info.preferred_username,
                subject: info.sub.or(claims.sub),
                expires_at: claims.exp,
            }),
            Err(e) => {
                debug!(error = %e, "Userinfo unavailable, using token claims");
                Some(claims.fallback_identity())
            }
        }
    }
}
