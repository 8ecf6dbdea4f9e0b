//! AdvisoryService — the central domain service.
//!
//! Takes port traits via `Arc<dyn PortTrait>` so the same logic works against
//! Postgres or the in-memory store. All methods take `&Principal` explicitly —
//! no implicit identity — and enforce role checks internally; handlers stay
//! thin.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgriError, FieldError};
use crate::matcher::match_reading;
use crate::ports::*;
use crate::principal::Principal;
use crate::types::*;
use crate::validate::{validate_reading, validate_rule_draft, SoilTestInput};

// ─── Request/response shapes ──────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to FARMER when absent.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Outcome of a soil-test submission. `recommendation` is `None` only when
/// the secondary write failed after the test itself was durably stored; the
/// caller can retry recommendation creation independently.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub soil_test: SoilTest,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn parse(s: &str) -> Result<ReviewAction> {
        match s {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            other => Err(AgriError::InvalidAction(format!(
                "'{}' — must be \"approve\" or \"reject\"",
                other
            ))),
        }
    }
}

/// Reviewer-supplied replacement text for a recommendation under review.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionEdit {
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
}

/// Admin overview row: a soil test paired with its recommendation, if any.
#[derive(Debug, Clone, Serialize)]
pub struct SoilTestOverview {
    #[serde(flatten)]
    pub soil_test: SoilTest,
    pub recommendation: Option<Recommendation>,
}

// ─── Service trait ────────────────────────────────────────────

pub type Result<T> = std::result::Result<T, AgriError>;

#[async_trait]
pub trait AdvisoryService: Send + Sync {
    // Accounts
    async fn register(&self, input: RegisterInput) -> Result<User>;
    async fn login(&self, email: &str, password: &str) -> Result<User>;
    async fn list_users(&self, principal: &Principal) -> Result<Vec<User>>;
    async fn create_user(&self, principal: &Principal, input: RegisterInput) -> Result<User>;
    async fn update_user(
        &self,
        principal: &Principal,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> Result<User>;
    async fn delete_user(&self, principal: &Principal, user_id: Uuid) -> Result<()>;
    async fn stats(&self, principal: &Principal) -> Result<SystemStats>;

    // Soil tests and recommendations
    async fn submit_soil_test(
        &self,
        principal: &Principal,
        input: SoilTestInput,
    ) -> Result<Submission>;
    async fn my_soil_tests(&self, principal: &Principal) -> Result<Vec<SoilTest>>;
    async fn recommendation_for_test(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
    ) -> Result<Recommendation>;
    async fn create_recommendation(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
        edit: SuggestionEdit,
    ) -> Result<Recommendation>;
    async fn list_pending_recommendations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<Recommendation>>;
    async fn review_recommendation(
        &self,
        principal: &Principal,
        recommendation_id: Uuid,
        action: ReviewAction,
        edit: Option<SuggestionEdit>,
    ) -> Result<Recommendation>;

    // Rule proposals and the active rule set
    async fn propose_rule(&self, principal: &Principal, draft: RuleDraft) -> Result<SoilRule>;
    async fn my_pending_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>>;
    async fn list_pending_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>>;
    async fn review_rule(
        &self,
        principal: &Principal,
        rule_id: Uuid,
        action: ReviewAction,
    ) -> Result<SoilRule>;
    async fn set_rule(&self, principal: &Principal, draft: RuleDraft) -> Result<SoilRule>;
    async fn list_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>>;

    // Researcher analytics and corrections
    async fn soil_insights(&self, principal: &Principal) -> Result<Vec<SoilInsight>>;
    async fn recommendation_trends(&self, principal: &Principal) -> Result<Vec<CropTrend>>;
    async fn all_soil_tests(&self, principal: &Principal) -> Result<Vec<SoilTestOverview>>;
    async fn correct_soil_test(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
        input: SoilTestInput,
    ) -> Result<SoilTest>;
    async fn delete_soil_test(&self, principal: &Principal, soil_test_id: Uuid) -> Result<()>;

    // Weather and irrigation
    async fn weather(&self, principal: &Principal, location: &str) -> Result<WeatherSnapshot>;
    async fn irrigation_plans(&self, principal: &Principal) -> Result<Vec<IrrigationPlan>>;

    // Reports
    async fn generate_report(&self, principal: &Principal, soil_test_id: Uuid) -> Result<Report>;
    async fn list_reports(&self, principal: &Principal) -> Result<Vec<Report>>;
}

// ─── Implementation ───────────────────────────────────────────

pub struct AdvisoryServiceImpl {
    users: Arc<dyn UserStore>,
    soil_tests: Arc<dyn SoilTestStore>,
    rules: Arc<dyn RuleStore>,
    recommendations: Arc<dyn RecommendationStore>,
    reports: Arc<dyn ReportStore>,
    weather: Arc<dyn WeatherStore>,
    irrigation: Arc<dyn IrrigationPlanStore>,
    hasher: Arc<dyn PasswordHasher>,
    renderer: Arc<dyn ReportRenderer>,
    ml: Option<Arc<dyn MlAdvisor>>,
    weather_provider: Option<Arc<dyn WeatherProvider>>,
}

impl AdvisoryServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserStore>,
        soil_tests: Arc<dyn SoilTestStore>,
        rules: Arc<dyn RuleStore>,
        recommendations: Arc<dyn RecommendationStore>,
        reports: Arc<dyn ReportStore>,
        weather: Arc<dyn WeatherStore>,
        irrigation: Arc<dyn IrrigationPlanStore>,
        hasher: Arc<dyn PasswordHasher>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            users,
            soil_tests,
            rules,
            recommendations,
            reports,
            weather,
            irrigation,
            hasher,
            renderer,
            ml: None,
            weather_provider: None,
        }
    }

    pub fn with_ml(mut self, advisor: Arc<dyn MlAdvisor>) -> Self {
        self.ml = Some(advisor);
        self
    }

    pub fn with_weather_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather_provider = Some(provider);
        self
    }

    fn validate_register(input: &RegisterInput) -> Result<Role> {
        let mut errors = Vec::new();
        if input.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if !input.email.contains('@') {
            errors.push(FieldError::new("email", "must be a valid address"));
        }
        if input.password.is_empty() {
            errors.push(FieldError::new("password", "must not be empty"));
        }
        let role = match &input.role {
            None => Some(Role::Farmer),
            Some(raw) => {
                let parsed = Role::parse(raw);
                if parsed.is_none() {
                    errors.push(FieldError::new("role", format!("unknown role '{}'", raw)));
                }
                parsed
            }
        };
        match (role, errors.is_empty()) {
            (Some(role), true) => Ok(role),
            _ => Err(AgriError::Validation(errors)),
        }
    }

    async fn insert_unique_user(&self, input: RegisterInput, role: Role) -> Result<User> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AgriError::Conflict(format!(
                "email {} already registered",
                input.email
            )));
        }
        let hash = self.hasher.hash(&input.password)?;
        let user = User::new(input.name, input.email, hash, role);
        self.users.insert(&user).await?;
        Ok(user)
    }

    /// Best-effort ML advice; absent advisor or any failure is `None`.
    async fn ml_advice(&self, reading: &SoilReading) -> Option<MlAdvice> {
        match &self.ml {
            Some(advisor) => advisor.advise(reading).await,
            None => None,
        }
    }
}

#[async_trait]
impl AdvisoryService for AdvisoryServiceImpl {
    // ── Accounts ──────────────────────────────────────────────

    async fn register(&self, input: RegisterInput) -> Result<User> {
        let role = Self::validate_register(&input)?;
        self.insert_unique_user(input, role).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        let invalid = || AgriError::Unauthorized("invalid credentials".into());
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(invalid());
        }
        self.users.record_login(user.user_id).await?;
        Ok(user)
    }

    async fn list_users(&self, principal: &Principal) -> Result<Vec<User>> {
        principal.require_role(Role::Admin)?;
        self.users.list().await
    }

    async fn create_user(&self, principal: &Principal, input: RegisterInput) -> Result<User> {
        principal.require_role(Role::Admin)?;
        let role = Self::validate_register(&input)?;
        self.insert_unique_user(input, role).await
    }

    async fn update_user(
        &self,
        principal: &Principal,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> Result<User> {
        principal.require_role(Role::Admin)?;
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AgriError::NotFound(format!("user {}", user_id)))?;

        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(email) = input.email {
            if email != user.email {
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(AgriError::Conflict(format!(
                        "email {} already registered",
                        email
                    )));
                }
                user.email = email;
            }
        }
        if let Some(password) = input.password {
            user.password_hash = self.hasher.hash(&password)?;
        }
        if let Some(raw) = input.role {
            user.role = Role::parse(&raw).ok_or_else(|| {
                AgriError::Validation(vec![FieldError::new(
                    "role",
                    format!("unknown role '{}'", raw),
                )])
            })?;
        }

        self.users.update(&user).await?;
        Ok(user)
    }

    async fn delete_user(&self, principal: &Principal, user_id: Uuid) -> Result<()> {
        principal.require_role(Role::Admin)?;
        self.users.delete(user_id).await
    }

    async fn stats(&self, principal: &Principal) -> Result<SystemStats> {
        principal.require_role(Role::Admin)?;
        let users = self.users.list().await?;
        let count_role = |role: Role| users.iter().filter(|u| u.role == role).count() as u64;
        Ok(SystemStats {
            total_users: users.len() as u64,
            farmers: count_role(Role::Farmer),
            researchers: count_role(Role::Researcher),
            govt_officials: count_role(Role::GovtOfficial),
            admins: count_role(Role::Admin),
            soil_tests: self.soil_tests.list_all().await?.len() as u64,
            recommendations: self.recommendations.list_all().await?.len() as u64,
        })
    }

    // ── Soil tests and recommendations ────────────────────────

    async fn submit_soil_test(
        &self,
        principal: &Principal,
        input: SoilTestInput,
    ) -> Result<Submission> {
        principal.require_role(Role::Farmer)?;
        let reading = validate_reading(&input).map_err(AgriError::Validation)?;

        // Primary write. Once this lands the test survives any later failure.
        let test = SoilTest::new(principal.user_id, reading);
        self.soil_tests.insert(&test).await?;

        // Degraded rule listing counts as "no match", never a hard failure.
        let approved = match self.rules.list_approved().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!("rule listing failed during submission: {}", e);
                Vec::new()
            }
        };
        let matched = match_reading(&approved, &reading);
        let advice = self.ml_advice(&reading).await;

        let mut rec = match matched {
            Some(rule) => Recommendation::from_rule(test.test_id, rule),
            None => Recommendation::pending_review(test.test_id, principal.user_id, &reading),
        };
        // Ranked sources: the rule outcome decides status; ML advice that
        // arrived in time replaces the text and is tagged, never silently.
        if let Some(advice) = advice {
            rec.crop_suggestion = advice.crop;
            rec.fertilizer_suggestion = advice.fertilizer;
            rec.source = RecommendationSource::Ml;
            rec.confidence_score = Some(advice.confidence);
        }

        match self.recommendations.insert(&rec).await {
            Ok(()) => Ok(Submission {
                soil_test: test,
                recommendation: Some(rec),
            }),
            Err(e) => {
                tracing::error!(
                    "recommendation write failed for soil test {}: {}",
                    test.test_id,
                    e
                );
                Ok(Submission {
                    soil_test: test,
                    recommendation: None,
                })
            }
        }
    }

    async fn my_soil_tests(&self, principal: &Principal) -> Result<Vec<SoilTest>> {
        principal.require_role(Role::Farmer)?;
        self.soil_tests.list_for_user(principal.user_id).await
    }

    async fn recommendation_for_test(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
    ) -> Result<Recommendation> {
        principal.require_any(&[Role::Farmer, Role::Admin])?;
        self.recommendations
            .find_for_soil_test(soil_test_id)
            .await?
            .ok_or_else(|| {
                AgriError::NotFound(format!("no recommendation for soil test {}", soil_test_id))
            })
    }

    async fn create_recommendation(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
        edit: SuggestionEdit,
    ) -> Result<Recommendation> {
        principal.require_role(Role::Admin)?;
        if self.soil_tests.get(soil_test_id).await?.is_none() {
            return Err(AgriError::NotFound(format!("soil test {}", soil_test_id)));
        }
        if self
            .recommendations
            .find_for_soil_test(soil_test_id)
            .await?
            .is_some()
        {
            return Err(AgriError::Conflict(format!(
                "soil test {} already has a recommendation",
                soil_test_id
            )));
        }

        let now = Utc::now();
        let rec = Recommendation {
            recommendation_id: Uuid::new_v4(),
            soil_test_id: Some(soil_test_id),
            crop_suggestion: edit.crop_suggestion,
            fertilizer_suggestion: edit.fertilizer_suggestion,
            irrigation_recommendation: edit.irrigation_recommendation,
            generated_by: Some(principal.user_id),
            source: RecommendationSource::Manual,
            status: RecommendationStatus::Approved,
            reviewed_by: Some(principal.user_id),
            proposed_ranges: None,
            confidence_score: None,
            created_at: now,
            updated_at: now,
        };
        self.recommendations.insert(&rec).await?;
        Ok(rec)
    }

    async fn list_pending_recommendations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<Recommendation>> {
        principal.require_any(&[Role::Admin, Role::Researcher])?;
        self.recommendations.list_pending().await
    }

    async fn review_recommendation(
        &self,
        principal: &Principal,
        recommendation_id: Uuid,
        action: ReviewAction,
        edit: Option<SuggestionEdit>,
    ) -> Result<Recommendation> {
        principal.require_any(&[Role::Admin, Role::Researcher])?;
        let mut rec = self
            .recommendations
            .get(recommendation_id)
            .await?
            .ok_or_else(|| {
                AgriError::NotFound(format!("recommendation {}", recommendation_id))
            })?;

        // Terminal records: same action is an idempotent no-op, a different
        // one is refused.
        if rec.status.is_terminal() {
            let same = matches!(
                (action, rec.status),
                (ReviewAction::Approve, RecommendationStatus::Approved)
                    | (ReviewAction::Reject, RecommendationStatus::Rejected)
            );
            return if same {
                Ok(rec)
            } else {
                Err(AgriError::InvalidStateTransition(format!(
                    "recommendation {} is already {}",
                    recommendation_id,
                    rec.status.as_str()
                )))
            };
        }

        match action {
            ReviewAction::Approve => {
                rec.status = RecommendationStatus::Approved;
                rec.reviewed_by = Some(principal.user_id);
                if let Some(edit) = edit {
                    rec.crop_suggestion = edit.crop_suggestion;
                    rec.fertilizer_suggestion = edit.fertilizer_suggestion;
                    if edit.irrigation_recommendation.is_some() {
                        rec.irrigation_recommendation = edit.irrigation_recommendation;
                    }
                    rec.source = RecommendationSource::Modified;
                }
                rec.updated_at = Utc::now();
                self.recommendations.update(&rec).await?;

                // Secondary write: teach the rule set from the approved
                // values. Failure is logged, never rolled back into the
                // already-committed review.
                if let (Some(ranges), Some(test_id)) = (rec.proposed_ranges, rec.soil_test_id) {
                    match self.soil_tests.get(test_id).await {
                        Ok(Some(test)) => {
                            let rule = SoilRule {
                                rule_id: Uuid::new_v4(),
                                soil_type: test.reading.soil_type,
                                ranges,
                                crop_suggestion: rec.crop_suggestion.clone(),
                                fertilizer_suggestion: rec.fertilizer_suggestion.clone(),
                                irrigation_recommendation: rec.irrigation_recommendation.clone(),
                                status: RuleStatus::Approved,
                                created_by: Some(principal.user_id),
                                reviewed_by: Some(principal.user_id),
                                updated_on: Utc::now(),
                            };
                            if let Err(e) = self.rules.insert(&rule).await {
                                tracing::warn!(
                                    "rule synthesis after approving {} failed: {}",
                                    recommendation_id,
                                    e
                                );
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(
                                "soil test lookup for rule synthesis failed: {}",
                                e
                            );
                        }
                    }
                }
            }
            ReviewAction::Reject => {
                rec.status = RecommendationStatus::Rejected;
                rec.reviewed_by = Some(principal.user_id);
                rec.updated_at = Utc::now();
                self.recommendations.update(&rec).await?;
            }
        }

        Ok(rec)
    }

    // ── Rule proposals and the active rule set ────────────────

    async fn propose_rule(&self, principal: &Principal, draft: RuleDraft) -> Result<SoilRule> {
        principal.require_role(Role::Researcher)?;
        let soil_type = validate_rule_draft(&draft).map_err(AgriError::Validation)?;
        let rule = SoilRule::from_draft(
            soil_type,
            &draft,
            RuleStatus::Pending,
            Some(principal.user_id),
        );
        self.rules.insert(&rule).await?;
        Ok(rule)
    }

    async fn my_pending_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>> {
        principal.require_role(Role::Researcher)?;
        self.rules.list_pending_by(principal.user_id).await
    }

    async fn list_pending_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>> {
        principal.require_role(Role::Admin)?;
        self.rules.list_pending().await
    }

    async fn review_rule(
        &self,
        principal: &Principal,
        rule_id: Uuid,
        action: ReviewAction,
    ) -> Result<SoilRule> {
        principal.require_role(Role::Admin)?;
        let mut rule = self
            .rules
            .get(rule_id)
            .await?
            .ok_or_else(|| AgriError::NotFound(format!("rule {}", rule_id)))?;

        if rule.status.is_terminal() {
            let same = matches!(
                (action, rule.status),
                (ReviewAction::Approve, RuleStatus::Approved)
                    | (ReviewAction::Reject, RuleStatus::Rejected)
            );
            return if same {
                Ok(rule)
            } else {
                Err(AgriError::InvalidStateTransition(format!(
                    "rule {} is already {}",
                    rule_id,
                    rule.status.as_str()
                )))
            };
        }

        rule.status = match action {
            ReviewAction::Approve => RuleStatus::Approved,
            ReviewAction::Reject => RuleStatus::Rejected,
        };
        rule.reviewed_by = Some(principal.user_id);
        rule.updated_on = Utc::now();
        self.rules.update(&rule).await?;
        Ok(rule)
    }

    async fn set_rule(&self, principal: &Principal, draft: RuleDraft) -> Result<SoilRule> {
        principal.require_role(Role::Admin)?;
        let soil_type = validate_rule_draft(&draft).map_err(AgriError::Validation)?;
        let mut rule = SoilRule::from_draft(
            soil_type,
            &draft,
            RuleStatus::Approved,
            Some(principal.user_id),
        );
        rule.reviewed_by = Some(principal.user_id);
        self.rules.insert(&rule).await?;
        Ok(rule)
    }

    async fn list_rules(&self, principal: &Principal) -> Result<Vec<SoilRule>> {
        principal.require_any(&[Role::Admin, Role::Researcher])?;
        self.rules.list_approved().await
    }

    // ── Researcher analytics and corrections ──────────────────

    async fn soil_insights(&self, principal: &Principal) -> Result<Vec<SoilInsight>> {
        principal.require_role(Role::Researcher)?;
        let tests = self.soil_tests.list_all().await?;
        let mut grouped: HashMap<SoilType, (u64, f64)> = HashMap::new();
        for test in &tests {
            let entry = grouped.entry(test.reading.soil_type).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += test.reading.ph;
        }
        let mut insights: Vec<SoilInsight> = grouped
            .into_iter()
            .map(|(soil_type, (count, ph_sum))| SoilInsight {
                soil_type,
                test_count: count,
                avg_ph: ph_sum / count as f64,
            })
            .collect();
        insights.sort_by(|a, b| b.test_count.cmp(&a.test_count));
        Ok(insights)
    }

    async fn recommendation_trends(&self, principal: &Principal) -> Result<Vec<CropTrend>> {
        principal.require_role(Role::Researcher)?;
        let recs = self.recommendations.list_all().await?;
        let mut grouped: HashMap<String, u64> = HashMap::new();
        for rec in &recs {
            *grouped.entry(rec.crop_suggestion.clone()).or_insert(0) += 1;
        }
        let mut trends: Vec<CropTrend> = grouped
            .into_iter()
            .map(|(crop_suggestion, count)| CropTrend {
                crop_suggestion,
                count,
            })
            .collect();
        trends.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(trends)
    }

    async fn all_soil_tests(&self, principal: &Principal) -> Result<Vec<SoilTestOverview>> {
        principal.require_any(&[Role::Admin, Role::Researcher])?;
        let tests = self.soil_tests.list_all().await?;
        let mut rows = Vec::with_capacity(tests.len());
        for test in tests {
            let recommendation = self
                .recommendations
                .find_for_soil_test(test.test_id)
                .await?;
            rows.push(SoilTestOverview {
                soil_test: test,
                recommendation,
            });
        }
        Ok(rows)
    }

    async fn correct_soil_test(
        &self,
        principal: &Principal,
        soil_test_id: Uuid,
        input: SoilTestInput,
    ) -> Result<SoilTest> {
        principal.require_role(Role::Researcher)?;
        let reading = validate_reading(&input).map_err(AgriError::Validation)?;
        let mut test = self
            .soil_tests
            .get(soil_test_id)
            .await?
            .ok_or_else(|| AgriError::NotFound(format!("soil test {}", soil_test_id)))?;
        test.reading = reading;
        self.soil_tests.update(&test).await?;
        Ok(test)
    }

    async fn delete_soil_test(&self, principal: &Principal, soil_test_id: Uuid) -> Result<()> {
        principal.require_role(Role::Admin)?;
        self.soil_tests.delete(soil_test_id).await
    }

    // ── Weather and irrigation ────────────────────────────────

    async fn weather(&self, principal: &Principal, location: &str) -> Result<WeatherSnapshot> {
        principal.require_role(Role::Farmer)?;

        if let Some(provider) = &self.weather_provider {
            if let Some(snapshot) = provider.fetch(location).await {
                if let Err(e) = self.weather.insert(&snapshot).await {
                    tracing::warn!("failed to persist weather snapshot: {}", e);
                }
                return Ok(snapshot);
            }
        }

        // Degrade to the last known observation.
        self.weather
            .latest()
            .await?
            .ok_or_else(|| AgriError::NotFound("no weather data available".into()))
    }

    async fn irrigation_plans(&self, principal: &Principal) -> Result<Vec<IrrigationPlan>> {
        principal.require_role(Role::Farmer)?;
        self.irrigation.list().await
    }

    // ── Reports ───────────────────────────────────────────────

    async fn generate_report(&self, principal: &Principal, soil_test_id: Uuid) -> Result<Report> {
        principal.require_role(Role::GovtOfficial)?;
        let test = self
            .soil_tests
            .get(soil_test_id)
            .await?
            .ok_or_else(|| AgriError::NotFound(format!("soil test {}", soil_test_id)))?;
        let rec = self
            .recommendations
            .find_for_soil_test(soil_test_id)
            .await?
            .ok_or_else(|| {
                AgriError::NotFound(format!("no recommendation for soil test {}", soil_test_id))
            })?;

        let url = self.renderer.render(&test, &rec)?;
        let report = Report::new(url, principal.user_id);
        self.reports.insert(&report).await?;
        Ok(report)
    }

    async fn list_reports(&self, principal: &Principal) -> Result<Vec<Report>> {
        principal.require_role(Role::GovtOfficial)?;
        self.reports.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::report::TextReportRenderer;

    /// Transparent hasher so tests can assert on stored values directly.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String> {
            Ok(format!("plain:{}", password))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool> {
            Ok(hash == format!("plain:{}", password))
        }
    }

    /// Recommendation store whose writes always fail, for the durability
    /// property of `submit_soil_test`.
    struct FailingRecStore;

    #[async_trait]
    impl RecommendationStore for FailingRecStore {
        async fn insert(&self, _rec: &Recommendation) -> Result<()> {
            Err(AgriError::Internal(anyhow::anyhow!("disk on fire")))
        }
        async fn get(&self, _id: Uuid) -> Result<Option<Recommendation>> {
            Ok(None)
        }
        async fn find_for_soil_test(&self, _id: Uuid) -> Result<Option<Recommendation>> {
            Ok(None)
        }
        async fn list_pending(&self) -> Result<Vec<Recommendation>> {
            Ok(Vec::new())
        }
        async fn list_all(&self) -> Result<Vec<Recommendation>> {
            Ok(Vec::new())
        }
        async fn update(&self, _rec: &Recommendation) -> Result<()> {
            Err(AgriError::Internal(anyhow::anyhow!("disk on fire")))
        }
    }

    /// Fixed ML advice for the ranked-source tests.
    struct FixedAdvisor(MlAdvice);

    #[async_trait]
    impl MlAdvisor for FixedAdvisor {
        async fn advise(&self, _reading: &SoilReading) -> Option<MlAdvice> {
            Some(MlAdvice {
                crop: self.0.crop.clone(),
                fertilizer: self.0.fertilizer.clone(),
                confidence: self.0.confidence,
            })
        }
    }

    fn service_over(store: Arc<MemoryStore>) -> AdvisoryServiceImpl {
        AdvisoryServiceImpl::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(PlainHasher),
            Arc::new(TextReportRenderer),
        )
    }

    fn service() -> AdvisoryServiceImpl {
        service_over(MemoryStore::new())
    }

    fn farmer() -> Principal {
        Principal::in_process(Uuid::new_v4(), Role::Farmer)
    }

    fn admin() -> Principal {
        Principal::in_process(Uuid::new_v4(), Role::Admin)
    }

    fn researcher() -> Principal {
        Principal::in_process(Uuid::new_v4(), Role::Researcher)
    }

    fn official() -> Principal {
        Principal::in_process(Uuid::new_v4(), Role::GovtOfficial)
    }

    fn loamy_input() -> SoilTestInput {
        SoilTestInput {
            soil_type: "loamy".to_string(),
            ph: 6.5,
            moisture: 40.0,
            nitrogen: 25.0,
            phosphorus: 25.0,
            potassium: 25.0,
        }
    }

    fn loamy_draft() -> RuleDraft {
        RuleDraft {
            soil_type: "loamy".to_string(),
            ph: Range::new(5.0, 7.0),
            moisture: Range::new(30.0, 50.0),
            nitrogen: Range::new(20.0, 30.0),
            phosphorus: Range::new(20.0, 30.0),
            potassium: Range::new(20.0, 30.0),
            crop_suggestion: "Wheat".to_string(),
            fertilizer_suggestion: "Urea".to_string(),
            irrigation_recommendation: None,
        }
    }

    // ── Submission outcomes ───────────────────────────────────

    #[tokio::test]
    async fn submission_matching_an_approved_rule_is_approved() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();

        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Approved);
        assert_eq!(rec.source, RecommendationSource::Rule);
        assert_eq!(rec.crop_suggestion, "Wheat");
        assert_eq!(rec.generated_by, None);
        assert_eq!(rec.soil_test_id, Some(outcome.soil_test.test_id));
    }

    #[tokio::test]
    async fn submission_without_a_matching_rule_is_pending() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();

        let caller = farmer();
        let mut input = loamy_input();
        input.soil_type = "sandy".to_string();
        let outcome = svc.submit_soil_test(&caller, input).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Pending);
        assert_eq!(rec.source, RecommendationSource::Manual);
        assert_eq!(rec.crop_suggestion, "Pending admin review");
        assert_eq!(rec.generated_by, Some(caller.user_id));
        // The input values are snapshotted as single-point windows.
        let ranges = rec.proposed_ranges.unwrap();
        assert_eq!(ranges.ph.min, 6.5);
        assert_eq!(ranges.ph.max, 6.5);
    }

    #[tokio::test]
    async fn boundary_reading_matches() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();

        let input = SoilTestInput {
            soil_type: "loamy".to_string(),
            ph: 5.0,
            moisture: 30.0,
            nitrogen: 20.0,
            phosphorus: 20.0,
            potassium: 20.0,
        };
        let outcome = svc.submit_soil_test(&farmer(), input).await.unwrap();
        assert_eq!(
            outcome.recommendation.unwrap().status,
            RecommendationStatus::Approved
        );
    }

    #[tokio::test]
    async fn invalid_reading_is_rejected_before_any_write() {
        let svc = service();
        let mut input = loamy_input();
        input.ph = 99.0;
        let err = svc.submit_soil_test(&farmer(), input).await.unwrap_err();
        assert!(matches!(err, AgriError::Validation(_)));
        assert!(svc.all_soil_tests(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_recommendation_write_keeps_the_soil_test() {
        let store = MemoryStore::new();
        let svc = AdvisoryServiceImpl::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FailingRecStore),
            store.clone(),
            store.clone(),
            store,
            Arc::new(PlainHasher),
            Arc::new(TextReportRenderer),
        );

        let caller = farmer();
        let outcome = svc.submit_soil_test(&caller, loamy_input()).await.unwrap();
        assert!(outcome.recommendation.is_none());
        // The primary write survived; the farmer can still see the test.
        let tests = svc.my_soil_tests(&caller).await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].test_id, outcome.soil_test.test_id);
    }

    #[tokio::test]
    async fn ml_advice_replaces_text_but_never_approves() {
        let svc = service().with_ml(Arc::new(FixedAdvisor(MlAdvice {
            crop: "Maize".into(),
            fertilizer: "DAP".into(),
            confidence: 0.87,
        })));

        // No rule matches: still pending, but tagged ml.
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Pending);
        assert_eq!(rec.source, RecommendationSource::Ml);
        assert_eq!(rec.crop_suggestion, "Maize");
        assert_eq!(rec.confidence_score, Some(0.87));
    }

    #[tokio::test]
    async fn ml_advice_over_a_rule_match_stays_approved() {
        let svc = service_over(MemoryStore::new()).with_ml(Arc::new(FixedAdvisor(MlAdvice {
            crop: "Maize".into(),
            fertilizer: "DAP".into(),
            confidence: 0.91,
        })));
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();

        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Approved);
        assert_eq!(rec.source, RecommendationSource::Ml);
        assert_eq!(rec.crop_suggestion, "Maize");
    }

    // ── Recommendation lookup and uniqueness ──────────────────

    #[tokio::test]
    async fn recommendation_lookup_finds_the_submission_outcome() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();
        let caller = farmer();
        let outcome = svc.submit_soil_test(&caller, loamy_input()).await.unwrap();

        let rec = svc
            .recommendation_for_test(&caller, outcome.soil_test.test_id)
            .await
            .unwrap();
        assert_eq!(
            rec.recommendation_id,
            outcome.recommendation.unwrap().recommendation_id
        );

        let err = svc
            .recommendation_for_test(&caller, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_manual_recommendation_is_a_conflict() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();

        let err = svc
            .create_recommendation(
                &admin(),
                outcome.soil_test.test_id,
                SuggestionEdit {
                    crop_suggestion: "Barley".into(),
                    fertilizer_suggestion: "DAP".into(),
                    irrigation_recommendation: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::Conflict(_)));
    }

    // ── Recommendation review ─────────────────────────────────

    #[tokio::test]
    async fn approving_with_edits_marks_source_modified() {
        let svc = service();
        let caller = farmer();
        let outcome = svc.submit_soil_test(&caller, loamy_input()).await.unwrap();
        let rec_id = outcome.recommendation.unwrap().recommendation_id;

        let reviewer = admin();
        let reviewed = svc
            .review_recommendation(
                &reviewer,
                rec_id,
                ReviewAction::Approve,
                Some(SuggestionEdit {
                    crop_suggestion: "Barley".into(),
                    fertilizer_suggestion: "Compost".into(),
                    irrigation_recommendation: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, RecommendationStatus::Approved);
        assert_eq!(reviewed.source, RecommendationSource::Modified);
        assert_eq!(reviewed.crop_suggestion, "Barley");
        assert_eq!(reviewed.reviewed_by, Some(reviewer.user_id));
    }

    #[tokio::test]
    async fn approving_a_pending_review_teaches_the_rule_set() {
        let svc = service();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec_id = outcome.recommendation.unwrap().recommendation_id;

        svc.review_recommendation(
            &admin(),
            rec_id,
            ReviewAction::Approve,
            Some(SuggestionEdit {
                crop_suggestion: "Barley".into(),
                fertilizer_suggestion: "Compost".into(),
                irrigation_recommendation: None,
            }),
        )
        .await
        .unwrap();

        // A second identical reading now short-circuits through the matcher.
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Approved);
        assert_eq!(rec.source, RecommendationSource::Rule);
        assert_eq!(rec.crop_suggestion, "Barley");
    }

    #[tokio::test]
    async fn re_review_same_action_is_idempotent() {
        let svc = service();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec_id = outcome.recommendation.unwrap().recommendation_id;

        let first = svc
            .review_recommendation(&admin(), rec_id, ReviewAction::Reject, None)
            .await
            .unwrap();
        let second = svc
            .review_recommendation(&admin(), rec_id, ReviewAction::Reject, None)
            .await
            .unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn conflicting_re_review_is_refused() {
        let svc = service();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec_id = outcome.recommendation.unwrap().recommendation_id;

        svc.review_recommendation(&admin(), rec_id, ReviewAction::Approve, None)
            .await
            .unwrap();
        let err = svc
            .review_recommendation(&admin(), rec_id, ReviewAction::Reject, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn review_of_missing_recommendation_is_not_found() {
        let svc = service();
        let err = svc
            .review_recommendation(&admin(), Uuid::new_v4(), ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::NotFound(_)));
    }

    // ── Rule proposal workflow ────────────────────────────────

    #[tokio::test]
    async fn invalid_proposal_creates_nothing() {
        let svc = service();
        let mut draft = loamy_draft();
        draft.ph = Range::new(8.0, 5.0);
        let err = svc.propose_rule(&researcher(), draft).await.unwrap_err();
        let AgriError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.iter().any(|f| f.field == "pH"));
        assert!(svc.list_pending_rules(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approved_proposal_becomes_matchable() {
        let svc = service();
        let proposer = researcher();
        let rule = svc.propose_rule(&proposer, loamy_draft()).await.unwrap();
        assert_eq!(rule.status, RuleStatus::Pending);
        assert_eq!(rule.created_by, Some(proposer.user_id));

        // Pending rules never match.
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        assert_eq!(
            outcome.recommendation.unwrap().status,
            RecommendationStatus::Pending
        );

        let reviewer = admin();
        let approved = svc
            .review_rule(&reviewer, rule.rule_id, ReviewAction::Approve)
            .await
            .unwrap();
        assert_eq!(approved.status, RuleStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(reviewer.user_id));

        // Immediately afterwards the same reading resolves through it.
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let rec = outcome.recommendation.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Approved);
        assert_eq!(rec.source, RecommendationSource::Rule);
    }

    #[tokio::test]
    async fn rejected_proposal_never_matches() {
        let svc = service();
        let rule = svc.propose_rule(&researcher(), loamy_draft()).await.unwrap();
        svc.review_rule(&admin(), rule.rule_id, ReviewAction::Reject)
            .await
            .unwrap();

        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        assert_eq!(
            outcome.recommendation.unwrap().status,
            RecommendationStatus::Pending
        );
    }

    #[tokio::test]
    async fn rule_re_review_follows_one_way_transitions() {
        let svc = service();
        let rule = svc.propose_rule(&researcher(), loamy_draft()).await.unwrap();
        svc.review_rule(&admin(), rule.rule_id, ReviewAction::Approve)
            .await
            .unwrap();

        // Same action again: no-op.
        let again = svc
            .review_rule(&admin(), rule.rule_id, ReviewAction::Approve)
            .await
            .unwrap();
        assert_eq!(again.status, RuleStatus::Approved);

        // Conflicting action: refused.
        let err = svc
            .review_rule(&admin(), rule.rule_id, ReviewAction::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn pending_rules_are_listed_newest_first() {
        let svc = service();
        let proposer = researcher();
        let first = svc.propose_rule(&proposer, loamy_draft()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = svc.propose_rule(&proposer, loamy_draft()).await.unwrap();

        let pending = svc.list_pending_rules(&admin()).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].rule_id, second.rule_id);
        assert_eq!(pending[1].rule_id, first.rule_id);

        let mine = svc.my_pending_rules(&proposer).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    // ── Accounts ──────────────────────────────────────────────

    #[tokio::test]
    async fn register_login_round_trip() {
        let svc = service();
        let user = svc
            .register(RegisterInput {
                name: "Asha".into(),
                email: "asha@example.com".into(),
                password: "growmore".into(),
                role: None,
            })
            .await
            .unwrap();
        assert_eq!(user.role, Role::Farmer);

        let logged_in = svc.login("asha@example.com", "growmore").await.unwrap();
        assert_eq!(logged_in.user_id, user.user_id);
        assert!(logged_in.last_login_at.is_none()); // snapshot taken before record_login

        let err = svc.login("asha@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AgriError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let svc = service();
        let input = RegisterInput {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "growmore".into(),
            role: None,
        };
        svc.register(input.clone()).await.unwrap();
        let err = svc.register(input).await.unwrap_err();
        assert!(matches!(err, AgriError::Conflict(_)));
    }

    #[tokio::test]
    async fn role_checks_gate_every_surface() {
        let svc = service();
        assert!(matches!(
            svc.submit_soil_test(&admin(), loamy_input())
                .await
                .unwrap_err(),
            AgriError::Forbidden(_)
        ));
        assert!(matches!(
            svc.list_pending_rules(&farmer()).await.unwrap_err(),
            AgriError::Forbidden(_)
        ));
        assert!(matches!(
            svc.propose_rule(&admin(), loamy_draft()).await.unwrap_err(),
            AgriError::Forbidden(_)
        ));
        assert!(matches!(
            svc.list_reports(&farmer()).await.unwrap_err(),
            AgriError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn stats_count_roles_and_records() {
        let svc = service();
        svc.register(RegisterInput {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "pw".into(),
            role: None,
        })
        .await
        .unwrap();
        svc.register(RegisterInput {
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password: "pw".into(),
            role: Some("RESEARCHER".into()),
        })
        .await
        .unwrap();

        let stats = svc.stats(&admin()).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.farmers, 1);
        assert_eq!(stats.researchers, 1);
        assert_eq!(stats.soil_tests, 0);
    }

    // ── Reports ───────────────────────────────────────────────

    #[tokio::test]
    async fn report_generation_needs_both_records() {
        let svc = service();
        let caller = official();

        let err = svc
            .generate_report(&caller, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AgriError::NotFound(_)));

        svc.set_rule(&admin(), loamy_draft()).await.unwrap();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();

        let report = svc
            .generate_report(&caller, outcome.soil_test.test_id)
            .await
            .unwrap();
        assert_eq!(report.created_by, caller.user_id);

        let listed = svc.list_reports(&caller).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].report_id, report.report_id);
    }

    // ── Analytics ─────────────────────────────────────────────

    #[tokio::test]
    async fn insights_and_trends_aggregate_by_group() {
        let svc = service();
        svc.set_rule(&admin(), loamy_draft()).await.unwrap();
        svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();
        let mut sandy = loamy_input();
        sandy.soil_type = "sandy".to_string();
        sandy.ph = 7.5;
        svc.submit_soil_test(&farmer(), sandy).await.unwrap();

        let caller = researcher();
        let insights = svc.soil_insights(&caller).await.unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].soil_type, SoilType::Loamy);
        assert_eq!(insights[0].test_count, 2);
        assert!((insights[0].avg_ph - 6.5).abs() < 1e-9);

        let trends = svc.recommendation_trends(&caller).await.unwrap();
        assert_eq!(trends[0].crop_suggestion, "Wheat");
        assert_eq!(trends[0].count, 2);
    }

    // ── Corrections ───────────────────────────────────────────

    #[tokio::test]
    async fn researcher_correction_rewrites_the_reading() {
        let svc = service();
        let outcome = svc.submit_soil_test(&farmer(), loamy_input()).await.unwrap();

        let mut corrected = loamy_input();
        corrected.ph = 6.9;
        let updated = svc
            .correct_soil_test(&researcher(), outcome.soil_test.test_id, corrected)
            .await
            .unwrap();
        assert_eq!(updated.reading.ph, 6.9);
        assert_eq!(updated.test_id, outcome.soil_test.test_id);
    }

    #[tokio::test]
    async fn review_action_parse_rejects_unknown_verbs() {
        assert!(ReviewAction::parse("approve").is_ok());
        assert!(ReviewAction::parse("reject").is_ok());
        let err = ReviewAction::parse("escalate").unwrap_err();
        assert!(matches!(err, AgriError::InvalidAction(_)));
    }
}
