//! Postgres implementations of the agri-core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid a compile-time database
//! requirement.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use agri_core::error::AgriError;
use agri_core::ports::*;
use agri_core::types::*;

use crate::rows::*;

/// Map driver errors. Unique-index violations surface as `Conflict` (the
/// partial index on recommendations and the users.email constraint), all
/// else as `Internal`.
fn db_err(e: sqlx::Error) -> AgriError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some("23505") {
            return AgriError::Conflict(db.message().to_string());
        }
    }
    AgriError::Internal(anyhow::Error::new(e))
}

// ─── PgUserStore ──────────────────────────────────────────────

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, name, email, password_hash, role, registered_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.registered_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY registered_at")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, role = $5, last_login_at = $6
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AgriError::NotFound(format!("user {}", user.user_id)));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login_at = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AgriError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }
}

// ─── PgSoilTestStore ──────────────────────────────────────────

pub struct PgSoilTestStore {
    pool: PgPool,
}

impl PgSoilTestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SoilTestStore for PgSoilTestStore {
    async fn insert(&self, test: &SoilTest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO soil_tests
                (test_id, user_id, soil_type, ph, moisture, nitrogen, phosphorus, potassium, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(test.test_id)
        .bind(test.user_id)
        .bind(test.reading.soil_type.as_str())
        .bind(test.reading.ph)
        .bind(test.reading.moisture)
        .bind(test.reading.nitrogen)
        .bind(test.reading.phosphorus)
        .bind(test.reading.potassium)
        .bind(test.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, test_id: Uuid) -> Result<Option<SoilTest>> {
        let row = sqlx::query_as::<_, SoilTestRow>("SELECT * FROM soil_tests WHERE test_id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(SoilTest::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SoilTest>> {
        let rows = sqlx::query_as::<_, SoilTestRow>(
            "SELECT * FROM soil_tests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SoilTest::try_from).collect()
    }

    async fn list_all(&self) -> Result<Vec<SoilTest>> {
        let rows =
            sqlx::query_as::<_, SoilTestRow>("SELECT * FROM soil_tests ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(SoilTest::try_from).collect()
    }

    async fn update(&self, test: &SoilTest) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE soil_tests
            SET soil_type = $2, ph = $3, moisture = $4, nitrogen = $5,
                phosphorus = $6, potassium = $7
            WHERE test_id = $1
            "#,
        )
        .bind(test.test_id)
        .bind(test.reading.soil_type.as_str())
        .bind(test.reading.ph)
        .bind(test.reading.moisture)
        .bind(test.reading.nitrogen)
        .bind(test.reading.phosphorus)
        .bind(test.reading.potassium)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AgriError::NotFound(format!("soil test {}", test.test_id)));
        }
        Ok(())
    }

    async fn delete(&self, test_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM soil_tests WHERE test_id = $1")
            .bind(test_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// ─── PgRuleStore ──────────────────────────────────────────────

pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_by_status(&self, status: RuleStatus) -> Result<Vec<SoilRule>> {
        let rows = sqlx::query_as::<_, SoilRuleRow>(
            "SELECT * FROM soil_rules WHERE status = $1 ORDER BY updated_on DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SoilRule::try_from).collect()
    }
}

const INSERT_RULE: &str = r#"
INSERT INTO soil_rules
    (rule_id, soil_type,
     ph_min, ph_max, moisture_min, moisture_max, nitrogen_min, nitrogen_max,
     phosphorus_min, phosphorus_max, potassium_min, potassium_max,
     crop_suggestion, fertilizer_suggestion, irrigation_recommendation,
     status, created_by, reviewed_by, updated_on)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
"#;

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn insert(&self, rule: &SoilRule) -> Result<()> {
        sqlx::query(INSERT_RULE)
            .bind(rule.rule_id)
            .bind(rule.soil_type.as_str())
            .bind(rule.ranges.ph.min)
            .bind(rule.ranges.ph.max)
            .bind(rule.ranges.moisture.min)
            .bind(rule.ranges.moisture.max)
            .bind(rule.ranges.nitrogen.min)
            .bind(rule.ranges.nitrogen.max)
            .bind(rule.ranges.phosphorus.min)
            .bind(rule.ranges.phosphorus.max)
            .bind(rule.ranges.potassium.min)
            .bind(rule.ranges.potassium.max)
            .bind(&rule.crop_suggestion)
            .bind(&rule.fertilizer_suggestion)
            .bind(&rule.irrigation_recommendation)
            .bind(rule.status.as_str())
            .bind(rule.created_by)
            .bind(rule.reviewed_by)
            .bind(rule.updated_on)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, rule_id: Uuid) -> Result<Option<SoilRule>> {
        let row = sqlx::query_as::<_, SoilRuleRow>("SELECT * FROM soil_rules WHERE rule_id = $1")
            .bind(rule_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(SoilRule::try_from).transpose()
    }

    async fn update(&self, rule: &SoilRule) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE soil_rules
            SET status = $2, reviewed_by = $3, updated_on = $4,
                crop_suggestion = $5, fertilizer_suggestion = $6,
                irrigation_recommendation = $7
            WHERE rule_id = $1
            "#,
        )
        .bind(rule.rule_id)
        .bind(rule.status.as_str())
        .bind(rule.reviewed_by)
        .bind(rule.updated_on)
        .bind(&rule.crop_suggestion)
        .bind(&rule.fertilizer_suggestion)
        .bind(&rule.irrigation_recommendation)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AgriError::NotFound(format!("rule {}", rule.rule_id)));
        }
        Ok(())
    }

    async fn list_approved(&self) -> Result<Vec<SoilRule>> {
        self.list_by_status(RuleStatus::Approved).await
    }

    async fn list_pending(&self) -> Result<Vec<SoilRule>> {
        self.list_by_status(RuleStatus::Pending).await
    }

    async fn list_pending_by(&self, created_by: Uuid) -> Result<Vec<SoilRule>> {
        let rows = sqlx::query_as::<_, SoilRuleRow>(
            r#"
            SELECT * FROM soil_rules
            WHERE status = 'PENDING' AND created_by = $1
            ORDER BY updated_on DESC
            "#,
        )
        .bind(created_by)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SoilRule::try_from).collect()
    }
}

// ─── PgRecommendationStore ────────────────────────────────────

pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ranges_json(rec: &Recommendation) -> Result<Option<serde_json::Value>> {
    rec.proposed_ranges
        .map(|r| serde_json::to_value(r))
        .transpose()
        .map_err(|e| AgriError::Internal(anyhow::Error::new(e)))
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn insert(&self, rec: &Recommendation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recommendations
                (recommendation_id, soil_test_id, crop_suggestion, fertilizer_suggestion,
                 irrigation_recommendation, generated_by, source, status, reviewed_by,
                 proposed_ranges, confidence_score, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(rec.recommendation_id)
        .bind(rec.soil_test_id)
        .bind(&rec.crop_suggestion)
        .bind(&rec.fertilizer_suggestion)
        .bind(&rec.irrigation_recommendation)
        .bind(rec.generated_by)
        .bind(rec.source.as_str())
        .bind(rec.status.as_str())
        .bind(rec.reviewed_by)
        .bind(ranges_json(rec)?)
        .bind(rec.confidence_score)
        .bind(rec.created_at)
        .bind(rec.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, recommendation_id: Uuid) -> Result<Option<Recommendation>> {
        let row = sqlx::query_as::<_, RecommendationRow>(
            "SELECT * FROM recommendations WHERE recommendation_id = $1",
        )
        .bind(recommendation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Recommendation::try_from).transpose()
    }

    async fn find_for_soil_test(&self, soil_test_id: Uuid) -> Result<Option<Recommendation>> {
        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            SELECT * FROM recommendations
            WHERE soil_test_id = $1 AND source <> 'proposed'
            LIMIT 1
            "#,
        )
        .bind(soil_test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Recommendation::try_from).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, RecommendationRow>(
            "SELECT * FROM recommendations WHERE status = 'pending' ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Recommendation::try_from).collect()
    }

    async fn list_all(&self) -> Result<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, RecommendationRow>(
            "SELECT * FROM recommendations ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Recommendation::try_from).collect()
    }

    async fn update(&self, rec: &Recommendation) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE recommendations
            SET crop_suggestion = $2, fertilizer_suggestion = $3,
                irrigation_recommendation = $4, source = $5, status = $6,
                reviewed_by = $7, confidence_score = $8, updated_at = $9
            WHERE recommendation_id = $1
            "#,
        )
        .bind(rec.recommendation_id)
        .bind(&rec.crop_suggestion)
        .bind(&rec.fertilizer_suggestion)
        .bind(&rec.irrigation_recommendation)
        .bind(rec.source.as_str())
        .bind(rec.status.as_str())
        .bind(rec.reviewed_by)
        .bind(rec.confidence_score)
        .bind(rec.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AgriError::NotFound(format!(
                "recommendation {}",
                rec.recommendation_id
            )));
        }
        Ok(())
    }
}

// ─── PgReportStore ────────────────────────────────────────────

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (report_id, report_url, created_by, created_on)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(report.report_id)
        .bind(&report.report_url)
        .bind(report.created_by)
        .bind(report.created_on)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Report>> {
        let rows =
            sqlx::query_as::<_, ReportRow>("SELECT * FROM reports ORDER BY created_on DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows.into_iter().map(Report::from).collect())
    }
}

// ─── PgWeatherStore ───────────────────────────────────────────

pub struct PgWeatherStore {
    pool: PgPool,
}

impl PgWeatherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgWeatherStore {
    async fn insert(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO weather_snapshots
                (location, temperature_c, humidity_pct, precipitation_mm, wind_speed_ms, observed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&snapshot.location)
        .bind(snapshot.temperature_c)
        .bind(snapshot.humidity_pct)
        .bind(snapshot.precipitation_mm)
        .bind(snapshot.wind_speed_ms)
        .bind(snapshot.observed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<WeatherSnapshot>> {
        let row = sqlx::query_as::<_, WeatherRow>(
            r#"
            SELECT location, temperature_c, humidity_pct, precipitation_mm, wind_speed_ms, observed_at
            FROM weather_snapshots ORDER BY observed_at DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(WeatherSnapshot::from))
    }
}

// ─── PgIrrigationPlanStore ────────────────────────────────────

pub struct PgIrrigationPlanStore {
    pool: PgPool,
}

impl PgIrrigationPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IrrigationPlanStore for PgIrrigationPlanStore {
    async fn insert(&self, plan: &IrrigationPlan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO irrigation_plans (plan_id, irrigation_advice, created_on)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(plan.plan_id)
        .bind(&plan.irrigation_advice)
        .bind(plan.created_on)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<IrrigationPlan>> {
        let rows = sqlx::query_as::<_, IrrigationPlanRow>(
            "SELECT * FROM irrigation_plans ORDER BY created_on DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(IrrigationPlan::from).collect())
    }
}

// ─── Bundle ───────────────────────────────────────────────────

/// All adapters over one pool, ready to hand to the service constructor.
pub struct PgStores {
    pub users: PgUserStore,
    pub soil_tests: PgSoilTestStore,
    pub rules: PgRuleStore,
    pub recommendations: PgRecommendationStore,
    pub reports: PgReportStore,
    pub weather: PgWeatherStore,
    pub irrigation: PgIrrigationPlanStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: PgUserStore::new(pool.clone()),
            soil_tests: PgSoilTestStore::new(pool.clone()),
            rules: PgRuleStore::new(pool.clone()),
            recommendations: PgRecommendationStore::new(pool.clone()),
            reports: PgReportStore::new(pool.clone()),
            weather: PgWeatherStore::new(pool.clone()),
            irrigation: PgIrrigationPlanStore::new(pool),
        }
    }
}
