//! Postgres backend for agri-core. Schema lives in `migrations/`.

mod rows;
mod store;

pub use store::{
    PgIrrigationPlanStore, PgRecommendationStore, PgReportStore, PgRuleStore, PgSoilTestStore,
    PgStores, PgUserStore, PgWeatherStore,
};
