use std::sync::Arc;

use tracing::{info, warn};

use agri_core::advisor::HttpMlAdvisor;
use agri_core::memory::MemoryStore;
use agri_core::report::TextReportRenderer;
use agri_core::service::{AdvisoryService, AdvisoryServiceImpl};
use agri_core::weather::OpenWeatherClient;
use agri_postgres::PgStores;
use agri_server::auth::BcryptHasher;
use agri_server::middleware::jwt::JwtConfig;
use agri_server::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agri_server=info,tower_http=info".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        warn!("JWT_SECRET not set, using an insecure development secret");
        "dev-secret-change-me".to_string()
    });
    let jwt_config = JwtConfig::from_secret(jwt_secret.as_bytes());

    // Store backend: Postgres when DATABASE_URL is configured, in-memory
    // otherwise (demo mode — state is lost on restart).
    let mut service = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            info!("connecting to database");
            let pool = sqlx::PgPool::connect(&database_url).await?;
            let stores = PgStores::new(pool);
            AdvisoryServiceImpl::new(
                Arc::new(stores.users),
                Arc::new(stores.soil_tests),
                Arc::new(stores.rules),
                Arc::new(stores.recommendations),
                Arc::new(stores.reports),
                Arc::new(stores.weather),
                Arc::new(stores.irrigation),
                Arc::new(BcryptHasher),
                Arc::new(TextReportRenderer),
            )
        }
        Err(_) => {
            warn!("DATABASE_URL not set, using the in-memory store");
            let store = MemoryStore::new();
            AdvisoryServiceImpl::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store,
                Arc::new(BcryptHasher),
                Arc::new(TextReportRenderer),
            )
        }
    };

    if let Ok(url) = std::env::var("ML_API_URL") {
        info!("ML advisor enabled");
        service = service.with_ml(Arc::new(HttpMlAdvisor::new(url)));
    }
    if let Ok(key) = std::env::var("WEATHER_API_KEY") {
        info!("weather provider enabled");
        service = service.with_weather_provider(Arc::new(OpenWeatherClient::new(key)));
    }

    let service: Arc<dyn AdvisoryService> = Arc::new(service);
    let app = build_router(service, jwt_config);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{}", port);
    info!("starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
