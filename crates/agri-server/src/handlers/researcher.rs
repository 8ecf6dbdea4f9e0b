//! Researcher surface.
//!
//! POST /api/researcher/propose-rules     — submit a rule proposal (PENDING)
//! GET  /api/researcher/my-pending-rules  — own queue
//! GET  /api/researcher/soil-insights     — per-soil-type aggregates
//! GET  /api/researcher/trends            — recommendation counts per crop
//! GET  /api/researcher/soiltests         — all tests (with outcomes)
//! PUT  /api/researcher/soiltests/:id     — correct a reading

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use agri_core::service::{AdvisoryService, SoilTestOverview};
use agri_core::types::{CropTrend, RuleDraft, SoilInsight, SoilRule, SoilTest};
use agri_core::validate::SoilTestInput;
use agri_core::Principal;

use crate::error::AppError;

pub async fn propose_rules(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Json(draft): Json<RuleDraft>,
) -> Result<Json<SoilRule>, AppError> {
    Ok(Json(service.propose_rule(&principal, draft).await?))
}

pub async fn my_pending_rules(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilRule>>, AppError> {
    Ok(Json(service.my_pending_rules(&principal).await?))
}

pub async fn soil_insights(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilInsight>>, AppError> {
    Ok(Json(service.soil_insights(&principal).await?))
}

pub async fn trends(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<CropTrend>>, AppError> {
    Ok(Json(service.recommendation_trends(&principal).await?))
}

pub async fn soil_tests(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilTestOverview>>, AppError> {
    Ok(Json(service.all_soil_tests(&principal).await?))
}

pub async fn correct_soil_test(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(soil_test_id): Path<Uuid>,
    Json(input): Json<SoilTestInput>,
) -> Result<Json<SoilTest>, AppError> {
    Ok(Json(
        service
            .correct_soil_test(&principal, soil_test_id, input)
            .await?,
    ))
}
