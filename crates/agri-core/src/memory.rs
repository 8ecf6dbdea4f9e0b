//! In-memory store backend. Insertion-ordered vectors behind tokio RwLocks —
//! enough for the POC server mode and the test suites. Postgres is the
//! production backend (`agri-postgres`).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AgriError;
use crate::ports::*;
use crate::types::*;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    soil_tests: RwLock<Vec<SoilTest>>,
    rules: RwLock<Vec<SoilRule>>,
    recommendations: RwLock<Vec<Recommendation>>,
    reports: RwLock<Vec<Report>>,
    weather: RwLock<Vec<WeatherSnapshot>>,
    irrigation: RwLock<Vec<IrrigationPlan>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

fn missing(what: &str, id: Uuid) -> AgriError {
    AgriError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        self.users.write().await.push(user.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|u| u.user_id == user.user_id)
            .ok_or_else(|| missing("user", user.user_id))?;
        *slot = user.clone();
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        self.users.write().await.retain(|u| u.user_id != user_id);
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| missing("user", user_id))?;
        slot.last_login_at = Some(chrono::Utc::now());
        Ok(())
    }
}

#[async_trait]
impl SoilTestStore for MemoryStore {
    async fn insert(&self, test: &SoilTest) -> Result<()> {
        self.soil_tests.write().await.push(test.clone());
        Ok(())
    }

    async fn get(&self, test_id: Uuid) -> Result<Option<SoilTest>> {
        Ok(self
            .soil_tests
            .read()
            .await
            .iter()
            .find(|t| t.test_id == test_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SoilTest>> {
        let mut tests: Vec<SoilTest> = self
            .soil_tests
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tests)
    }

    async fn list_all(&self) -> Result<Vec<SoilTest>> {
        let mut tests = self.soil_tests.read().await.clone();
        tests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tests)
    }

    async fn update(&self, test: &SoilTest) -> Result<()> {
        let mut tests = self.soil_tests.write().await;
        let slot = tests
            .iter_mut()
            .find(|t| t.test_id == test.test_id)
            .ok_or_else(|| missing("soil test", test.test_id))?;
        *slot = test.clone();
        Ok(())
    }

    async fn delete(&self, test_id: Uuid) -> Result<()> {
        self.soil_tests
            .write()
            .await
            .retain(|t| t.test_id != test_id);
        Ok(())
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn insert(&self, rule: &SoilRule) -> Result<()> {
        self.rules.write().await.push(rule.clone());
        Ok(())
    }

    async fn get(&self, rule_id: Uuid) -> Result<Option<SoilRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .find(|r| r.rule_id == rule_id)
            .cloned())
    }

    async fn update(&self, rule: &SoilRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        let slot = rules
            .iter_mut()
            .find(|r| r.rule_id == rule.rule_id)
            .ok_or_else(|| missing("rule", rule.rule_id))?;
        *slot = rule.clone();
        Ok(())
    }

    async fn list_approved(&self) -> Result<Vec<SoilRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.status == RuleStatus::Approved)
            .cloned()
            .collect())
    }

    async fn list_pending(&self) -> Result<Vec<SoilRule>> {
        let mut rules: Vec<SoilRule> = self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.status == RuleStatus::Pending)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.updated_on.cmp(&a.updated_on));
        Ok(rules)
    }

    async fn list_pending_by(&self, created_by: Uuid) -> Result<Vec<SoilRule>> {
        let mut rules: Vec<SoilRule> = self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.status == RuleStatus::Pending && r.created_by == Some(created_by))
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.updated_on.cmp(&a.updated_on));
        Ok(rules)
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn insert(&self, rec: &Recommendation) -> Result<()> {
        self.recommendations.write().await.push(rec.clone());
        Ok(())
    }

    async fn get(&self, recommendation_id: Uuid) -> Result<Option<Recommendation>> {
        Ok(self
            .recommendations
            .read()
            .await
            .iter()
            .find(|r| r.recommendation_id == recommendation_id)
            .cloned())
    }

    async fn find_for_soil_test(&self, soil_test_id: Uuid) -> Result<Option<Recommendation>> {
        Ok(self
            .recommendations
            .read()
            .await
            .iter()
            .find(|r| {
                r.soil_test_id == Some(soil_test_id) && r.source != RecommendationSource::Proposed
            })
            .cloned())
    }

    async fn list_pending(&self) -> Result<Vec<Recommendation>> {
        let mut recs: Vec<Recommendation> = self
            .recommendations
            .read()
            .await
            .iter()
            .filter(|r| r.status == RecommendationStatus::Pending)
            .cloned()
            .collect();
        recs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recs)
    }

    async fn list_all(&self) -> Result<Vec<Recommendation>> {
        Ok(self.recommendations.read().await.clone())
    }

    async fn update(&self, rec: &Recommendation) -> Result<()> {
        let mut recs = self.recommendations.write().await;
        let slot = recs
            .iter_mut()
            .find(|r| r.recommendation_id == rec.recommendation_id)
            .ok_or_else(|| missing("recommendation", rec.recommendation_id))?;
        *slot = rec.clone();
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert(&self, report: &Report) -> Result<()> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Report>> {
        let mut reports = self.reports.read().await.clone();
        reports.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(reports)
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn insert(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        self.weather.write().await.push(snapshot.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<WeatherSnapshot>> {
        Ok(self
            .weather
            .read()
            .await
            .iter()
            .max_by_key(|w| w.observed_at)
            .cloned())
    }
}

#[async_trait]
impl IrrigationPlanStore for MemoryStore {
    async fn insert(&self, plan: &IrrigationPlan) -> Result<()> {
        self.irrigation.write().await.push(plan.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<IrrigationPlan>> {
        let mut plans = self.irrigation.read().await.clone();
        plans.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(plans)
    }
}
