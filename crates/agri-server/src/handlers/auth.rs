//! Registration and login.
//!
//! POST /api/auth/register — create an account (defaults to FARMER)
//! POST /api/auth/login    — verify credentials, mint a bearer token

use std::sync::Arc;

use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use agri_core::service::{AdvisoryService, RegisterInput};

use crate::auth::issue_token_with;
use crate::error::AppError;
use crate::middleware::jwt::JwtConfig;

pub async fn register(
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<Value>, AppError> {
    let user = service.register(input).await?;
    Ok(Json(json!({
        "message": "registered",
        "user": user,
    })))
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

pub async fn login(
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Extension(jwt): Extension<JwtConfig>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, AppError> {
    let user = service.login(&body.email, &body.password).await?;
    let token = issue_token_with(&jwt, &user)?;
    Ok(Json(json!({
        "token": token,
        "user": user,
    })))
}
