//! Credential plumbing: bcrypt password hashing and JWT minting. Token
//! validation lives in `middleware::jwt`.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use agri_core::error::AgriError;
use agri_core::ports::PasswordHasher;
use agri_core::types::User;
use agri_core::AuthClaims;

use crate::middleware::jwt::JwtConfig;

/// Sessions last a week, as the original deployment configured.
const TOKEN_TTL_DAYS: i64 = 7;

pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AgriError> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AgriError::Internal(anyhow!("bcrypt hash failed: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AgriError> {
        bcrypt::verify(password, hash)
            .map_err(|e| AgriError::Internal(anyhow!("bcrypt verify failed: {}", e)))
    }
}

/// Mint a bearer token for a freshly authenticated user.
pub fn issue_token(encoding: &EncodingKey, user: &User) -> Result<String, AgriError> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = AuthClaims {
        sub: user.user_id.to_string(),
        role: user.role.as_str().to_string(),
        name: Some(user.name.clone()),
        exp,
    };
    encode(&Header::default(), &claims, encoding)
        .map_err(|e| AgriError::Internal(anyhow!("token encoding failed: {}", e)))
}

/// Convenience over `JwtConfig` for handlers.
pub fn issue_token_with(config: &JwtConfig, user: &User) -> Result<String, AgriError> {
    issue_token(&config.encoding, user)
}
