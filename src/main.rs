//! Teacher Portfolio Backend
//!
//! Local evidence store with Google Drive uploads and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod drive;
mod errors;
mod models;
mod search;
mod sync;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::LocalStore;
use search::SearchIndex;
use sync::EvidenceSync;

/// Largest request body accepted, sized for evidence file uploads.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LocalStore>,
    pub search: Arc<SearchIndex>,
    pub sync: Arc<EvidenceSync>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: LocalStore, search: SearchIndex) -> Self {
        let store = Arc::new(store);
        let sync = Arc::new(EvidenceSync::new(&config.drive, store.clone()));
        Self {
            store,
            search: Arc::new(search),
            sync,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Teacher Portfolio Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Drive folder: {:?}", config.drive.folder_name);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (PORTFOLIO_API_PSK). Authentication is disabled!");
    }
    if config.drive.client_id.is_empty() {
        tracing::warn!("DRIVE_CLIENT_ID is not set; Drive sign-in will be rejected");
    }

    let pool = db::init_database(&config.db_path).await?;
    let store = LocalStore::new(pool);

    let outcome = store.load().await;
    if outcome.is_data_loss() {
        tracing::warn!("Evidence store unusable at startup: {:?}", outcome.status());
    }

    let search = SearchIndex::open(&config.index_path)?;
    search.rebuild(outcome.records()).await?;

    let bind_addr = config.bind_addr;
    let app = create_router(AppState::new(config, store, search));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Evidence
        .route(
            "/evidence",
            get(api::list_evidence)
                .post(api::create_evidence)
                .delete(api::clear_evidence),
        )
        .route("/evidence/count", get(api::count_evidence))
        .route("/evidence/types", get(api::list_evidence_types))
        .route("/evidence/export", get(api::export_evidence))
        .route("/evidence/import", post(api::import_evidence))
        .route("/evidence/upload", post(api::upload_evidence))
        .route("/evidence/{id}", get(api::get_evidence))
        .route("/categories", get(api::list_categories))
        // Profile
        .route(
            "/profile",
            get(api::get_profile)
                .put(api::save_profile)
                .delete(api::clear_profile),
        )
        // Drive session
        .route("/drive/status", get(api::drive_status))
        .route("/drive/sign-in", post(api::drive_sign_in))
        .route("/drive/sign-out", post(api::drive_sign_out))
        // Search
        .route("/search", get(api::search_evidence))
        .layer(middleware::from_fn(move |req, next| {
            auth::require_api_key(psk.clone(), req, next)
        }));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
