/// Identity Gateway
///
/// Resolves the caller's external identity from a session token. Tokens are
/// JWTs issued by the identity provider and arrive either as
/// `Authorization: Bearer <token>` or in the session cookie.
///
/// Handlers take [`Identity`] when a caller is required and
/// [`OptionalIdentity`] when anonymous access is allowed.
use crate::config::AuthConfig;
use crate::error::AppError;
use actix_web::{web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// External (identity-provider) user id
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Display name, when the provider includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Verifies session tokens
pub struct IdentityGateway {
    decoding_key: DecodingKey,
    validation: Validation,
    session_cookie: String,
}

impl IdentityGateway {
    /// Build from configuration. An RS256 public key takes precedence over
    /// the HS256 secret.
    pub fn from_config(config: &AuthConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        let (decoding_key, algorithm) = match (&config.jwt_public_key_pem, &config.jwt_secret) {
            (Some(pem), _) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
            (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, None) => {
                return Err(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into());
            }
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key,
            validation,
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// HS256 gateway with the default cookie name
    pub fn hs256(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            session_cookie: "__session".to_string(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            AppError::Unauthorized("Invalid or expired session".to_string())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Session has no subject".to_string()));
        }
        Ok(data.claims)
    }

    /// Bearer header first, then the session cookie
    fn token_from_request(&self, req: &HttpRequest) -> Option<String> {
        let bearer = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        bearer.or_else(|| {
            req.cookie(&self.session_cookie)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        })
    }

    fn identify(&self, req: &HttpRequest) -> Result<Option<Identity>, AppError> {
        match self.token_from_request(req) {
            Some(token) => self.verify(&token).map(|claims| Some(Identity::from(claims))),
            None => Ok(None),
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub external_id: String,
    pub name: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            external_id: claims.sub,
            name: claims.name.filter(|n| !n.trim().is_empty()),
        }
    }
}

/// A caller that may be anonymous. Invalid tokens count as anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalIdentity(pub Option<Identity>);

fn gateway(req: &HttpRequest) -> Result<&web::Data<IdentityGateway>, AppError> {
    req.app_data::<web::Data<IdentityGateway>>()
        .ok_or_else(|| AppError::Internal("Identity gateway not configured".to_string()))
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = gateway(req).and_then(|gateway| {
            gateway
                .identify(req)?
                .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
        });
        ready(result)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = gateway(req).map(|gateway| OptionalIdentity(gateway.identify(req).ok().flatten()));
        ready(result)
    }
}
