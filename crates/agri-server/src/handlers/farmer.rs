//! Farmer surface.
//!
//! POST /api/farmer/soil-test                      — submit a reading
//! GET  /api/farmer/my-tests                       — own tests, newest first
//! GET  /api/farmer/recommendation/:soil_test_id   — outcome for one test
//! GET  /api/farmer/weather                        — live weather or last snapshot
//! GET  /api/farmer/irrigation                     — irrigation plans

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use agri_core::service::{AdvisoryService, Submission};
use agri_core::types::{IrrigationPlan, Recommendation, SoilTest, WeatherSnapshot};
use agri_core::validate::SoilTestInput;
use agri_core::Principal;

use crate::error::AppError;

pub async fn submit_soil_test(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Json(input): Json<SoilTestInput>,
) -> Result<Json<Submission>, AppError> {
    let submission = service.submit_soil_test(&principal, input).await?;
    Ok(Json(submission))
}

pub async fn my_tests(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<SoilTest>>, AppError> {
    Ok(Json(service.my_soil_tests(&principal).await?))
}

pub async fn recommendation(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(soil_test_id): Path<Uuid>,
) -> Result<Json<Recommendation>, AppError> {
    Ok(Json(
        service
            .recommendation_for_test(&principal, soil_test_id)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

pub async fn weather(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherSnapshot>, AppError> {
    let location = query.location.as_deref().unwrap_or("Dhaka");
    Ok(Json(service.weather(&principal, location).await?))
}

pub async fn irrigation_plans(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<IrrigationPlan>>, AppError> {
    Ok(Json(service.irrigation_plans(&principal).await?))
}
