//! Admin surface.
//!
//! GET    /api/admin/pending-rules                 — moderation queue
//! PUT    /api/admin/review-rule/:id               — approve/reject a proposal
//! GET    /api/admin/pending-recommendations       — review queue
//! PUT    /api/admin/approve-recommendation/:id    — approve/reject, optional edits
//! GET    /api/admin/rules  POST /api/admin/rules  — active rule set
//! POST   /api/admin/recommendation/:soil_test_id  — manual recommendation
//! GET    /api/admin/soiltests                     — all tests with outcomes
//! DELETE /api/admin/soiltests/:id
//! GET/POST/PUT/DELETE /api/admin/users[/:id]      — user management
//! GET    /api/admin/stats

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use agri_core::service::{
    AdvisoryService, RegisterInput, ReviewAction, SoilTestOverview, SuggestionEdit,
    UpdateUserInput,
};
use agri_core::types::{Recommendation, RuleDraft, SoilRule, SystemStats, User};
use agri_core::Principal;

use crate::error::AppError;

#[derive(Deserialize)]
pub struct ReviewBody {
    pub action: String,
}

pub async fn pending_rules(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilRule>>, AppError> {
    Ok(Json(service.list_pending_rules(&principal).await?))
}

pub async fn review_rule(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(rule_id): Path<Uuid>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<SoilRule>, AppError> {
    let action = ReviewAction::parse(&body.action)?;
    Ok(Json(service.review_rule(&principal, rule_id, action).await?))
}

pub async fn pending_recommendations(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    Ok(Json(service.list_pending_recommendations(&principal).await?))
}

#[derive(Deserialize)]
pub struct ReviewRecommendationBody {
    pub action: String,
    pub crop_suggestion: Option<String>,
    pub fertilizer_suggestion: Option<String>,
    pub irrigation_recommendation: Option<String>,
}

pub async fn review_recommendation(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(recommendation_id): Path<Uuid>,
    Json(body): Json<ReviewRecommendationBody>,
) -> Result<Json<Recommendation>, AppError> {
    let action = ReviewAction::parse(&body.action)?;
    // Edits only count when both replacement texts are present.
    let edit = match (body.crop_suggestion, body.fertilizer_suggestion) {
        (Some(crop), Some(fertilizer)) => Some(SuggestionEdit {
            crop_suggestion: crop,
            fertilizer_suggestion: fertilizer,
            irrigation_recommendation: body.irrigation_recommendation,
        }),
        _ => None,
    };
    Ok(Json(
        service
            .review_recommendation(&principal, recommendation_id, action, edit)
            .await?,
    ))
}

pub async fn list_rules(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilRule>>, AppError> {
    Ok(Json(service.list_rules(&principal).await?))
}

pub async fn set_rule(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Json(draft): Json<RuleDraft>,
) -> Result<Json<SoilRule>, AppError> {
    Ok(Json(service.set_rule(&principal, draft).await?))
}

pub async fn create_recommendation(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(soil_test_id): Path<Uuid>,
    Json(edit): Json<SuggestionEdit>,
) -> Result<Json<Recommendation>, AppError> {
    Ok(Json(
        service
            .create_recommendation(&principal, soil_test_id, edit)
            .await?,
    ))
}

pub async fn soil_tests(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilTestOverview>>, AppError> {
    Ok(Json(service.all_soil_tests(&principal).await?))
}

pub async fn delete_soil_test(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(soil_test_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    service.delete_soil_test(&principal, soil_test_id).await?;
    Ok(Json(json!({ "message": "soil test deleted" })))
}

pub async fn list_users(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(service.list_users(&principal).await?))
}

pub async fn create_user(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.create_user(&principal, input).await?))
}

pub async fn update_user(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, AppError> {
    Ok(Json(service.update_user(&principal, user_id, input).await?))
}

pub async fn delete_user(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    service.delete_user(&principal, user_id).await?;
    Ok(Json(json!({ "message": "user deleted" })))
}

pub async fn stats(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<SystemStats>, AppError> {
    Ok(Json(service.stats(&principal).await?))
}
