use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod nutrition;
pub mod store;
pub mod uploads;
pub mod views;

use auth::mailer::LogMailer;
use auth::{AuthProvider, LocalAuthProvider};
use config::{Config, StoreBackend};
use nutrition::{NutritionLookup, OpenFoodFactsClient};
use store::{CredentialStore, MemoryStore, PgStore, RecordStore};
use uploads::{PhotoStore, MAX_PHOTO_BYTES};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn RecordStore>,
    pub nutrition: Arc<dyn NutritionLookup>,
    pub photos: PhotoStore,
}

/// Wires the configured backends. For postgres this connects and applies
/// migrations before returning.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let config = Arc::new(config);

    let (store, credentials): (Arc<dyn RecordStore>, Arc<dyn CredentialStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pool = db::create_pool(url)
                    .await
                    .context("Failed to connect to database")?;
                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                tracing::info!("Database migrations applied");

                let pg = Arc::new(PgStore::new(pool));
                let store: Arc<dyn RecordStore> = pg.clone();
                let credentials: Arc<dyn CredentialStore> = pg;
                (store, credentials)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data will not survive a restart");
                let mem = Arc::new(MemoryStore::new());
                let store: Arc<dyn RecordStore> = mem.clone();
                let credentials: Arc<dyn CredentialStore> = mem;
                (store, credentials)
            }
        };

    let auth = LocalAuthProvider::new(credentials, Arc::new(LogMailer), config.clone());
    let nutrition = OpenFoodFactsClient::from_config(&config)
        .context("Failed to build OpenFoodFacts client")?;

    Ok(AppState {
        photos: PhotoStore::from_config(&config),
        config,
        auth: Arc::new(auth),
        store,
        nutrition: Arc::new(nutrition),
    })
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(&config.site_url)
        .chain(config.cors_extra_origins.iter())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Auth actions
        .route("/api/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/auth/sign-in", post(handlers::auth::sign_in))
        .route("/api/auth/magic-link", post(handlers::auth::magic_link))
        .route("/api/auth/sign-out", post(handlers::auth::sign_out))
        .route("/api/auth/session", get(handlers::auth::session))
        // Profile
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).post(handlers::profile::upsert_profile),
        )
        .route(
            "/api/profile/photo",
            post(handlers::profile::upload_photo)
                .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 1024 * 1024)),
        )
        // Daily logs
        .route(
            "/api/daily-logs",
            get(handlers::daily_logs::list_daily_logs).post(handlers::daily_logs::create_daily_log),
        )
        .route(
            "/api/daily-logs/:date",
            get(handlers::daily_logs::get_daily_log_by_date),
        )
        // Products
        .route(
            "/api/product-lookup",
            get(handlers::product_lookup::lookup_product),
        );

    let page_routes = Router::new()
        .route("/", get(handlers::pages::landing))
        .route("/sign-in", get(handlers::pages::sign_in_page))
        .route("/sign-up", get(handlers::pages::sign_up_page))
        .route("/auth/callback", get(handlers::auth::callback))
        .route("/onboarding", get(handlers::pages::onboarding))
        .route("/dashboard", get(handlers::pages::dashboard))
        .route("/dashboard/log", get(handlers::pages::log_form))
        .route("/dashboard/progress", get(handlers::pages::progress))
        .route("/dashboard/food", get(handlers::pages::food_entries));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(api_routes)
        .merge(page_routes)
        .nest_service("/uploads", ServeDir::new(state.photos.dir()))
        // Layers run bottom-up: the session is resolved before the guard sees it.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard::route_guard,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::resolve_session,
        ))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::auth::mailer::LinkMailer;
    use crate::auth::AuthError;
    use crate::config::{Config, StoreBackend};
    use crate::models::identity::LoginCodePurpose;

    pub fn test_config() -> Config {
        Config {
            store_backend: StoreBackend::Memory,
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            site_url: "http://localhost:3000".into(),
            cors_extra_origins: Vec::new(),
            jwt_secret: "test-secret-that-is-long-enough".into(),
            session_ttl_secs: 3600,
            login_code_ttl_secs: 600,
            off_base_url: "http://127.0.0.1:1".into(),
            off_user_agent: "nosugar-tests".into(),
            off_timeout_secs: 2,
            upload_dir: std::env::temp_dir()
                .join("nosugar-test-uploads")
                .to_string_lossy()
                .into_owned(),
            upload_public_url: "/uploads".into(),
            challenge_days: 14,
        }
    }

    /// Keeps every link instead of delivering it.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        pub fn links(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn last_code(&self) -> Option<String> {
            let (_, link) = self.sent.lock().unwrap().last()?.clone();
            link.split_once("code=").map(|(_, code)| code.to_string())
        }
    }

    #[async_trait]
    impl LinkMailer for RecordingMailer {
        async fn send_link(
            &self,
            email: &str,
            _purpose: LoginCodePurpose,
            link: &str,
        ) -> Result<(), AuthError> {
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), link.to_string()));
            Ok(())
        }
    }
}
