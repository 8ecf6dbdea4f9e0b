//! Government-official surface.
//!
//! GET  /api/govt/reports                        — generated reports, newest first
//! POST /api/govt/generate-report/:soil_test_id  — render and persist a report

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use agri_core::service::AdvisoryService;
use agri_core::types::Report;
use agri_core::Principal;

use crate::error::AppError;

pub async fn reports(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
) -> Result<Json<Vec<Report>>, AppError> {
    Ok(Json(service.list_reports(&principal).await?))
}

pub async fn generate_report(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn AdvisoryService>>,
    Path(soil_test_id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    Ok(Json(service.generate_report(&principal, soil_test_id).await?))
}
