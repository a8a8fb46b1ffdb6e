use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    jwk::{Jwk, PublicKeyUse},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::error::AppError;

/// The only signature algorithm accepted on bearer tokens.
pub const ALLOWED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims
///
/// Payload of an access token issued by the identity provider. Only `exp` is mandatory;
/// the remaining claims are carried into `AuthUser` for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id.
    #[serde(default)]
    pub sub: String,
    /// Expiration Time (exp): validated on every request.
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// VerifyError
///
/// Reasons a bearer token was refused. All of them surface to the client as
/// `AppError::InvalidCredential`; the detail is only logged.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token header: {0}")]
    MalformedHeader(jsonwebtoken::errors::Error),

    #[error("algorithm {0:?} is not allowed")]
    AlgorithmNotAllowed(Algorithm),

    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("key set unavailable: {0}")]
    KeySetUnavailable(#[from] reqwest::Error),

    #[error("token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
}

impl From<VerifyError> for AppError {
    fn from(e: VerifyError) -> Self {
        tracing::debug!("Credential refused: {}", e);
        AppError::InvalidCredential
    }
}

/// TokenVerifier
///
/// Validates a raw bearer token and yields its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// VerifierState
///
/// The concrete type used to share the token verifier across the application state.
pub type VerifierState = Arc<dyn TokenVerifier>;

#[derive(Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Vec<Value>,
}

/// JwksVerifier
///
/// Verifies RS256 tokens against the key set published at `jwks_url`
/// (e.g. a Keycloak realm's `/protocol/openid-connect/certs`).
///
/// Decoding keys are cached by `kid`. A token whose `kid` is not cached triggers one
/// refetch of the whole set, which replaces the cache so rotated-out keys stop verifying.
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: String,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl JwksVerifier {
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), jwks_url)
    }

    pub fn with_client(client: reqwest::Client, jwks_url: impl Into<String>) -> Self {
        Self {
            client,
            jwks_url: jwks_url.into(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Number of decoding keys currently cached.
    pub async fn cached_key_count(&self) -> usize {
        self.keys.read().await.len()
    }

    // A token without kid is accepted only when the set holds exactly one key.
    async fn cached(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let keys = self.keys.read().await;
        match kid {
            Some(kid) => keys.get(kid).cloned(),
            None if keys.len() == 1 => keys.values().next().cloned(),
            None => None,
        }
    }

    async fn refresh(&self) -> Result<(), VerifyError> {
        let document: KeySetDocument = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut fresh = HashMap::new();
        for raw in document.keys {
            let jwk = match serde_json::from_value::<Jwk>(raw) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::debug!("Skipping unparseable JWK: {}", e);
                    continue;
                }
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }
            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => {
                    fresh.insert(jwk.common.key_id.clone().unwrap_or_default(), key);
                }
                Err(e) => tracing::debug!("Skipping unusable JWK: {}", e),
            }
        }

        tracing::debug!("Fetched {} signing keys from {}", fresh.len(), self.jwks_url);
        *self.keys.write().await = fresh;
        Ok(())
    }

    async fn signing_key(&self, kid: Option<&str>) -> Result<DecodingKey, VerifyError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }
        self.refresh().await?;
        self.cached(kid)
            .await
            .ok_or_else(|| VerifyError::UnknownKey(kid.map(str::to_string)))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let header = decode_header(token).map_err(VerifyError::MalformedHeader)?;
        if header.alg != ALLOWED_ALGORITHM {
            return Err(VerifyError::AlgorithmNotAllowed(header.alg));
        }

        let key = self.signing_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.validate_aud = false;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(VerifyError::Rejected)
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. There are no roles: any valid
/// token grants full administrative access.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub username: Option<String>,
}

/// AuthUser Extractor Implementation
///
/// 1. No `Authorization` header: `AppError::Unauthenticated` (401).
/// 2. A header that is not `Bearer <token>`, or a token the verifier refuses:
///    `AppError::InvalidCredential` (403).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the auth middleware for this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let verifier = VerifierState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::InvalidCredential)?;

        let claims = verifier.verify(token).await?;

        Ok(AuthUser {
            subject: claims.sub,
            username: claims.preferred_username,
        })
    }
}
