//! Storage and external-service port traits.
//!
//! The service layer operates exclusively through these traits, enabling
//! pluggable backends (the in-memory store for POC and tests, Postgres for
//! production). Implementations live in `memory.rs` and `agri-postgres`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AgriError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, AgriError>;

// ─── Users ────────────────────────────────────────────────────

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;
    async fn get(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    /// Full-record update keyed by `user_id`. Last write wins.
    async fn update(&self, user: &User) -> Result<()>;
    async fn delete(&self, user_id: Uuid) -> Result<()>;
    async fn record_login(&self, user_id: Uuid) -> Result<()>;
}

// ─── Soil tests ───────────────────────────────────────────────

#[async_trait]
pub trait SoilTestStore: Send + Sync {
    async fn insert(&self, test: &SoilTest) -> Result<()>;
    async fn get(&self, test_id: Uuid) -> Result<Option<SoilTest>>;
    /// All tests for one farmer, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SoilTest>>;
    async fn list_all(&self) -> Result<Vec<SoilTest>>;
    /// Researcher correction. Last write wins.
    async fn update(&self, test: &SoilTest) -> Result<()>;
    async fn delete(&self, test_id: Uuid) -> Result<()>;
}

// ─── Rules ────────────────────────────────────────────────────

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn insert(&self, rule: &SoilRule) -> Result<()>;
    async fn get(&self, rule_id: Uuid) -> Result<Option<SoilRule>>;
    async fn update(&self, rule: &SoilRule) -> Result<()>;
    /// The matcher's candidate set.
    async fn list_approved(&self) -> Result<Vec<SoilRule>>;
    /// Moderation queue, `updated_on` descending.
    async fn list_pending(&self) -> Result<Vec<SoilRule>>;
    /// Pending proposals by one researcher, `updated_on` descending.
    async fn list_pending_by(&self, created_by: Uuid) -> Result<Vec<SoilRule>>;
}

// ─── Recommendations ──────────────────────────────────────────

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn insert(&self, rec: &Recommendation) -> Result<()>;
    async fn get(&self, recommendation_id: Uuid) -> Result<Option<Recommendation>>;
    /// The non-proposed recommendation for a soil test, if any.
    async fn find_for_soil_test(&self, soil_test_id: Uuid) -> Result<Option<Recommendation>>;
    /// Review queue, newest first.
    async fn list_pending(&self) -> Result<Vec<Recommendation>>;
    async fn list_all(&self) -> Result<Vec<Recommendation>>;
    async fn update(&self, rec: &Recommendation) -> Result<()>;
}

// ─── Reports, weather, irrigation ─────────────────────────────

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, report: &Report) -> Result<()>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Report>>;
}

#[async_trait]
pub trait WeatherStore: Send + Sync {
    async fn insert(&self, snapshot: &WeatherSnapshot) -> Result<()>;
    async fn latest(&self) -> Result<Option<WeatherSnapshot>>;
}

#[async_trait]
pub trait IrrigationPlanStore: Send + Sync {
    async fn insert(&self, plan: &IrrigationPlan) -> Result<()>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<IrrigationPlan>>;
}

// ─── External collaborators ───────────────────────────────────

/// Crop/fertilizer advice from the ML service. Best-effort: implementations
/// bound the call with a timeout and return `None` on any failure — a missing
/// advisor must never fail a submission.
#[async_trait]
pub trait MlAdvisor: Send + Sync {
    async fn advise(&self, reading: &SoilReading) -> Option<MlAdvice>;
}

#[derive(Debug, Clone)]
pub struct MlAdvice {
    pub crop: String,
    pub fertilizer: String,
    pub confidence: f64,
}

/// Live weather lookup. Same best-effort contract as `MlAdvisor`; the service
/// falls back to the latest stored snapshot when this returns `None`.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> Option<WeatherSnapshot>;
}

/// Opaque credential hashing. bcrypt in production; tests may substitute a
/// transparent double.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Renders a report artifact for a soil test + recommendation pair and
/// returns its url/path. PDF rendering proper is an external collaborator;
/// the in-tree implementation produces a plain-text artifact reference.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, test: &SoilTest, rec: &Recommendation) -> Result<String>;
}
