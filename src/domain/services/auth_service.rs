use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::errors::DomainError;

/**
 * JWT claims carried by access tokens.
 *
 * Tokens are minted by the identity service; this side only checks the
 * signature and expiry, then trusts `sub` as the owner id.
 */
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier - contains the user ID
    pub sub: String,

    /// Expiration timestamp (seconds since Unix epoch)
    pub exp: i64,

    /// Issued at timestamp (seconds since Unix epoch)
    #[serde(default)]
    pub iat: i64,
}

/// Authentication-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token not provided")]
    TokenNotProvided,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        DomainError::access_denied("Auth", err.to_string())
    }
}

/// Validates bearer tokens and extracts the owner they speak for
pub struct AuthService {
    /// Secret key used for verifying JWT signatures
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        Ok(token_data.claims)
    }

    /// Validates the token and parses its subject as an owner id
    pub fn owner_from_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self.validate_token(token)?;
        Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("subject is not a valid user id".to_string()))
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(secret: &str, owner_id: &Uuid, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        sub: owner_id.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("token encoding")
}
