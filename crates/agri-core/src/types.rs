use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Roles ────────────────────────────────────────────────────

/// Account role. Serialized in SCREAMING_SNAKE form in both JSON bodies and
/// JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "FARMER")]
    Farmer,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "RESEARCHER")]
    Researcher,
    #[serde(rename = "GOVT_OFFICIAL")]
    GovtOfficial,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "FARMER",
            Role::Admin => "ADMIN",
            Role::Researcher => "RESEARCHER",
            Role::GovtOfficial => "GOVT_OFFICIAL",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "FARMER" => Some(Role::Farmer),
            "ADMIN" => Some(Role::Admin),
            "RESEARCHER" => Some(Role::Researcher),
            "GOVT_OFFICIAL" => Some(Role::GovtOfficial),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Users ────────────────────────────────────────────────────

/// A registered account. The bcrypt hash never leaves the server — it is
/// skipped on serialization and only the stores read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            registered_at: Utc::now(),
            last_login_at: None,
        }
    }
}

// ─── Soil readings and tests ──────────────────────────────────

/// The seven recognised soil textures. Parsing is exact and lowercase —
/// matching is case-sensitive by design (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Loamy,
    Sandy,
    Clayey,
    Silty,
    Peaty,
    Chalky,
    Saline,
}

impl SoilType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Loamy => "loamy",
            SoilType::Sandy => "sandy",
            SoilType::Clayey => "clayey",
            SoilType::Silty => "silty",
            SoilType::Peaty => "peaty",
            SoilType::Chalky => "chalky",
            SoilType::Saline => "saline",
        }
    }

    pub fn parse(s: &str) -> Option<SoilType> {
        match s {
            "loamy" => Some(SoilType::Loamy),
            "sandy" => Some(SoilType::Sandy),
            "clayey" => Some(SoilType::Clayey),
            "silty" => Some(SoilType::Silty),
            "peaty" => Some(SoilType::Peaty),
            "chalky" => Some(SoilType::Chalky),
            "saline" => Some(SoilType::Saline),
            _ => None,
        }
    }
}

impl std::fmt::Display for SoilType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five measured parameters plus soil texture. Shared between soil tests
/// and matcher input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub soil_type: SoilType,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub moisture: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// A farmer-submitted reading. Immutable after creation except through
/// researcher correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilTest {
    pub test_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub reading: SoilReading,
    pub created_at: DateTime<Utc>,
}

impl SoilTest {
    pub fn new(user_id: Uuid, reading: SoilReading) -> Self {
        Self {
            test_id: Uuid::new_v4(),
            user_id,
            reading,
            created_at: Utc::now(),
        }
    }
}

// ─── Rules ────────────────────────────────────────────────────

/// An inclusive numeric window. Invariant `min <= max` is enforced at the
/// validation boundary, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A degenerate window holding a single point. Used when snapshotting a
    /// reading into a pending recommendation.
    pub fn point(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// The five parameter windows of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRanges {
    #[serde(rename = "pH")]
    pub ph: Range,
    pub moisture: Range,
    pub nitrogen: Range,
    pub phosphorus: Range,
    pub potassium: Range,
}

impl ParamRanges {
    /// Snapshot a reading as five single-point windows.
    pub fn snapshot(reading: &SoilReading) -> Self {
        Self {
            ph: Range::point(reading.ph),
            moisture: Range::point(reading.moisture),
            nitrogen: Range::point(reading.nitrogen),
            phosphorus: Range::point(reading.phosphorus),
            potassium: Range::point(reading.potassium),
        }
    }

    /// True when every window contains its corresponding reading value.
    pub fn contains(&self, reading: &SoilReading) -> bool {
        self.ph.contains(reading.ph)
            && self.moisture.contains(reading.moisture)
            && self.nitrogen.contains(reading.nitrogen)
            && self.phosphorus.contains(reading.phosphorus)
            && self.potassium.contains(reading.potassium)
    }

    /// Sum of the five window widths. Narrower rules are considered more
    /// specific by the matcher tie-break.
    pub fn total_span(&self) -> f64 {
        self.ph.span()
            + self.moisture.span()
            + self.nitrogen.span()
            + self.phosphorus.span()
            + self.potassium.span()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    Pending,
    Approved,
    Rejected,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Pending => "PENDING",
            RuleStatus::Approved => "APPROVED",
            RuleStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<RuleStatus> {
        match s {
            "PENDING" => Some(RuleStatus::Pending),
            "APPROVED" => Some(RuleStatus::Approved),
            "REJECTED" => Some(RuleStatus::Rejected),
            _ => None,
        }
    }

    /// PENDING is the only state with outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RuleStatus::Approved | RuleStatus::Rejected)
    }
}

/// An agronomic rule mapping a soil-type + parameter window to suggestions.
/// APPROVED rules are immutable and the only ones the matcher considers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilRule {
    pub rule_id: Uuid,
    pub soil_type: SoilType,
    #[serde(flatten)]
    pub ranges: ParamRanges,
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
    pub status: RuleStatus,
    pub created_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub updated_on: DateTime<Utc>,
}

/// Incoming rule fields, shared by researcher proposals and admin-set rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDraft {
    pub soil_type: String,
    #[serde(rename = "pH")]
    pub ph: Range,
    pub moisture: Range,
    pub nitrogen: Range,
    pub phosphorus: Range,
    pub potassium: Range,
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
}

impl SoilRule {
    /// Build a rule from a validated draft. Caller decides the initial status
    /// (PENDING for proposals, APPROVED for admin-set rules).
    pub fn from_draft(
        soil_type: SoilType,
        draft: &RuleDraft,
        status: RuleStatus,
        created_by: Option<Uuid>,
    ) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            soil_type,
            ranges: ParamRanges {
                ph: draft.ph,
                moisture: draft.moisture,
                nitrogen: draft.nitrogen,
                phosphorus: draft.phosphorus,
                potassium: draft.potassium,
            },
            crop_suggestion: draft.crop_suggestion.clone(),
            fertilizer_suggestion: draft.fertilizer_suggestion.clone(),
            irrigation_recommendation: draft.irrigation_recommendation.clone(),
            status,
            created_by,
            reviewed_by: None,
            updated_on: Utc::now(),
        }
    }
}

// ─── Recommendations ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Approved,
    Pending,
    Rejected,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Approved => "approved",
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<RecommendationStatus> {
        match s {
            "approved" => Some(RecommendationStatus::Approved),
            "pending" => Some(RecommendationStatus::Pending),
            "rejected" => Some(RecommendationStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecommendationStatus::Approved | RecommendationStatus::Rejected
        )
    }
}

/// Provenance of a recommendation's suggestion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Manual,
    Ml,
    Modified,
    Rule,
    Proposed,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::Manual => "manual",
            RecommendationSource::Ml => "ml",
            RecommendationSource::Modified => "modified",
            RecommendationSource::Rule => "rule",
            RecommendationSource::Proposed => "proposed",
        }
    }

    pub fn parse(s: &str) -> Option<RecommendationSource> {
        match s {
            "manual" => Some(RecommendationSource::Manual),
            "ml" => Some(RecommendationSource::Ml),
            "modified" => Some(RecommendationSource::Modified),
            "rule" => Some(RecommendationSource::Rule),
            "proposed" => Some(RecommendationSource::Proposed),
            _ => None,
        }
    }
}

/// The outcome attached to a soil test, or a standalone proposed change when
/// `source == proposed`. Never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_id: Uuid,
    /// None only for `source == proposed`.
    pub soil_test_id: Option<Uuid>,
    pub crop_suggestion: String,
    pub fertilizer_suggestion: String,
    pub irrigation_recommendation: Option<String>,
    /// None means system-generated.
    pub generated_by: Option<Uuid>,
    pub source: RecommendationSource,
    pub status: RecommendationStatus,
    pub reviewed_by: Option<Uuid>,
    /// Parameter snapshot kept for audit on pending/proposed records.
    pub proposed_ranges: Option<ParamRanges>,
    /// Set only for ML-sourced suggestions.
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recommendation {
    /// Approved outcome from a matched rule.
    pub fn from_rule(soil_test_id: Uuid, rule: &SoilRule) -> Self {
        let now = Utc::now();
        Self {
            recommendation_id: Uuid::new_v4(),
            soil_test_id: Some(soil_test_id),
            crop_suggestion: rule.crop_suggestion.clone(),
            fertilizer_suggestion: rule.fertilizer_suggestion.clone(),
            irrigation_recommendation: rule.irrigation_recommendation.clone(),
            generated_by: None,
            source: RecommendationSource::Rule,
            status: RecommendationStatus::Approved,
            reviewed_by: None,
            proposed_ranges: None,
            confidence_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending placeholder awaiting admin review, with the reading snapshotted
    /// as single-point ranges for later audit.
    pub fn pending_review(soil_test_id: Uuid, submitted_by: Uuid, reading: &SoilReading) -> Self {
        let now = Utc::now();
        Self {
            recommendation_id: Uuid::new_v4(),
            soil_test_id: Some(soil_test_id),
            crop_suggestion: "Pending admin review".to_string(),
            fertilizer_suggestion: "Pending admin review".to_string(),
            irrigation_recommendation: None,
            generated_by: Some(submitted_by),
            source: RecommendationSource::Manual,
            status: RecommendationStatus::Pending,
            reviewed_by: None,
            proposed_ranges: Some(ParamRanges::snapshot(reading)),
            confidence_score: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ─── Reports, weather, irrigation ─────────────────────────────

/// A generated report artifact reference. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_id: Uuid,
    pub report_url: String,
    pub created_by: Uuid,
    pub created_on: DateTime<Utc>,
}

impl Report {
    pub fn new(report_url: String, created_by: Uuid) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            report_url,
            created_by,
            created_on: Utc::now(),
        }
    }
}

/// Read-mostly weather observation ingested from the external provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
    pub wind_speed_ms: f64,
    pub observed_at: DateTime<Utc>,
}

/// Researcher-authored irrigation guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationPlan {
    pub plan_id: Uuid,
    pub irrigation_advice: String,
    pub created_on: DateTime<Utc>,
}

// ─── Analytics rollups ────────────────────────────────────────

/// Per-soil-type aggregate for the researcher dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilInsight {
    pub soil_type: SoilType,
    pub test_count: u64,
    pub avg_ph: f64,
}

/// Recommendation count per suggested crop, descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropTrend {
    pub crop_suggestion: String,
    pub count: u64,
}

/// Admin dashboard totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_users: u64,
    pub farmers: u64,
    pub researchers: u64,
    pub govt_officials: u64,
    pub admins: u64,
    pub soil_tests: u64,
    pub recommendations: u64,
}
