//! sqlx row types. Enums travel as TEXT and are parsed on the way out; the
//! conversion failing means the database holds a value the application never
//! wrote, which surfaces as `Internal`.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use agri_core::error::AgriError;
use agri_core::types::*;

#[derive(FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AgriError;

    fn try_from(row: UserRow) -> Result<Self, AgriError> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| AgriError::Internal(anyhow!("unknown role '{}' in store", row.role)))?;
        Ok(User {
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            registered_at: row.registered_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(FromRow)]
pub struct SoilTestRow {
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub soil_type: String,
    pub ph: f64,
    pub moisture: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SoilTestRow> for SoilTest {
    type Error = AgriError;

    fn try_from(row: SoilTestRow) -> Result<Self, AgriError> {
        let soil_type = SoilType::parse(&row.soil_type).ok_or_else(|| {
            AgriError::Internal(anyhow!("unknown soil type '{}' in store", row.soil_type))
        })?;
        Ok(SoilTest {
            test_id: row.test_id,
            user_id: row.user_id,
            reading: SoilReading {
                soil_type,
                ph: row.ph,
                moisture: row.moisture,
                nitrogen: row.nitrogen,
                phosphorus: row.phosphorus,
                potassium: row.potassium,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub struct SoilRuleRow {
    pub rule_id: Uuid,
    pub soil_type: String,
    pub ph_min: f64,
    pub ph_max: f64,
    pub moisture_min: f64,
    pub moisture_max: f64,
    pub nitrogen_min: f64,
    pub nitrogen_max: f64,
    pub phosphorus_min: f64,
    pub phosphorus_max: f64,
    pub potassium_min: f64,
    pub potassium_max: f64,
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub updated_on: DateTime<Utc>,
}

impl TryFrom<SoilRuleRow> for SoilRule {
    type Error = AgriError;

    fn try_from(row: SoilRuleRow) -> Result<Self, AgriError> {
        let soil_type = SoilType::parse(&row.soil_type).ok_or_else(|| {
            AgriError::Internal(anyhow!("unknown soil type '{}' in store", row.soil_type))
        })?;
        let status = RuleStatus::parse(&row.status).ok_or_else(|| {
            AgriError::Internal(anyhow!("unknown rule status '{}' in store", row.status))
        })?;
        Ok(SoilRule {
            rule_id: row.rule_id,
            soil_type,
            ranges: ParamRanges {
                ph: Range::new(row.ph_min, row.ph_max),
                moisture: Range::new(row.moisture_min, row.moisture_max),
                nitrogen: Range::new(row.nitrogen_min, row.nitrogen_max),
                phosphorus: Range::new(row.phosphorus_min, row.phosphorus_max),
                potassium: Range::new(row.potassium_min, row.potassium_max),
            },
            crop_suggestion: row.crop_suggestion,
            fertilizer_suggestion: row.fertilizer_suggestion,
            irrigation_recommendation: row.irrigation_recommendation,
            status,
            created_by: row.created_by,
            reviewed_by: row.reviewed_by,
            updated_on: row.updated_on,
        })
    }
}

#[derive(FromRow)]
pub struct RecommendationRow {
    pub recommendation_id: Uuid,
    pub soil_test_id: Option<Uuid>,
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
    pub generated_by: Option<Uuid>,
    pub source: String,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub proposed_ranges: Option<serde_json::Value>,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RecommendationRow> for Recommendation {
    type Error = AgriError;

    fn try_from(row: RecommendationRow) -> Result<Self, AgriError> {
        let source = RecommendationSource::parse(&row.source).ok_or_else(|| {
            AgriError::Internal(anyhow!("unknown source '{}' in store", row.source))
        })?;
        let status = RecommendationStatus::parse(&row.status).ok_or_else(|| {
            AgriError::Internal(anyhow!("unknown status '{}' in store", row.status))
        })?;
        let proposed_ranges = row
            .proposed_ranges
            .map(serde_json::from_value::<ParamRanges>)
            .transpose()
            .map_err(|e| AgriError::Internal(anyhow!("malformed range snapshot: {}", e)))?;
        Ok(Recommendation {
            recommendation_id: row.recommendation_id,
            soil_test_id: row.soil_test_id,
            crop_suggestion: row.crop_suggestion,
            fertilizer_suggestion: row.fertilizer_suggestion,
            irrigation_recommendation: row.irrigation_recommendation,
            generated_by: row.generated_by,
            source,
            status,
            reviewed_by: row.reviewed_by,
            proposed_ranges,
            confidence_score: row.confidence_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct ReportRow {
    pub report_id: Uuid,
    pub report_url: String,
    pub created_by: Uuid,
    pub created_on: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Report {
            report_id: row.report_id,
            report_url: row.report_url,
            created_by: row.created_by,
            created_on: row.created_on,
        }
    }
}

#[derive(FromRow)]
pub struct WeatherRow {
    pub location: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
    pub wind_speed_ms: f64,
    pub observed_at: DateTime<Utc>,
}

impl From<WeatherRow> for WeatherSnapshot {
    fn from(row: WeatherRow) -> Self {
        WeatherSnapshot {
            location: row.location,
            temperature_c: row.temperature_c,
            humidity_pct: row.humidity_pct,
            precipitation_mm: row.precipitation_mm,
            wind_speed_ms: row.wind_speed_ms,
            observed_at: row.observed_at,
        }
    }
}

#[derive(FromRow)]
pub struct IrrigationPlanRow {
    pub plan_id: Uuid,
    pub irrigation_advice: String,
    pub created_on: DateTime<Utc>,
}

impl From<IrrigationPlanRow> for IrrigationPlan {
    fn from(row: IrrigationPlanRow) -> Self {
        IrrigationPlan {
            plan_id: row.plan_id,
            irrigation_advice: row.irrigation_advice,
            created_on: row.created_on,
        }
    }
}
