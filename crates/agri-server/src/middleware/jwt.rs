//! Bearer-token middleware. Decodes and validates the JWT, builds a typed
//! `Principal`, and hands it to handlers as a request extension.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, EncodingKey, Validation};

use agri_core::{AgriError, AuthClaims, Principal};

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub async fn jwt_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let config = req
        .extensions()
        .get::<JwtConfig>()
        .cloned()
        .ok_or_else(|| AgriError::Internal(anyhow::anyhow!("JwtConfig extension missing")))?;

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AgriError::Unauthorized("missing bearer token".into()))?;

    let data = decode::<AuthClaims>(token, &config.decoding, &Validation::default())
        .map_err(|e| AgriError::Unauthorized(format!("invalid token: {}", e)))?;

    let principal = Principal::from_claims(&data.claims)?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
