//! ArquiAlert Backend
//!
//! Aggregates defense tenders and grants from public procurement portals, keeps an
//! admin-curated tender store in SQLite and serves full-text search with Tantivy.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod notify;
mod procurement;
mod search;
mod sources;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use notify::EmailService;
use procurement::{spawn_refresh_task, ProcurementService};
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub procurement: Arc<ProcurementService>,
    pub email: Arc<EmailService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ArquiAlert Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (ARQUI_ADMIN_PSK). Admin routes are open!");
    }
    if config.sam_api_key.is_none() {
        tracing::warn!("SAM_GOV_API_KEY not set, SAM.gov grants will use sample data");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Seed the search index with the admin store; automatic tenders follow on first fetch
    let search = Arc::new(SearchIndex::in_memory()?);
    let manual: Vec<_> = repo
        .list_manual_tenders()
        .await?
        .into_iter()
        .map(|m| m.tender)
        .collect();
    search.index_tenders(&manual).await?;
    tracing::info!("Search index seeded with {} manual tenders", search.len());

    let procurement = Arc::new(ProcurementService::from_config(&config)?);
    tracing::info!("{} tender endpoints configured", procurement.endpoints().len());

    let email = Arc::new(EmailService::new(config.email.clone())?);
    if email.is_simulated() {
        tracing::warn!("No mail relay configured (ARQUI_EMAIL_RELAY_URL). Emails are simulated");
    }

    if let Some(interval) = config.refresh_interval {
        tracing::info!("Background refresh every {:?}", interval);
        spawn_refresh_task(procurement.clone(), search.clone(), interval);
    }

    // Create application state
    let state = AppState {
        repo,
        search,
        procurement,
        email,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.admin_psk.clone();

    // Admin tender store, guarded by the PSK
    let admin_routes = Router::new()
        .route(
            "/tenders",
            get(api::list_admin_tenders).post(api::create_admin_tender),
        )
        .route("/tenders/{id}", delete(api::delete_admin_tender))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(psk.clone(), req, next)
        }));

    // Public API routes
    let api_routes = Router::new()
        // Tenders
        .route("/procurement", get(api::get_procurement))
        .route("/tenders/{id}", get(api::get_tender).put(api::update_tender))
        .route("/search", get(api::search_tenders))
        // Grants
        .route("/grants", get(api::list_grants).post(api::search_grants))
        .route("/sam-grants", get(api::list_sam_grants))
        // Alerts and email
        .route("/register-notification", post(api::register_notification))
        .route("/alerts", get(api::list_alerts))
        .route("/send-alert", post(api::send_alert))
        .route("/send-email", post(api::send_email))
        .route("/send-emailjs", post(api::send_emailjs))
        .nest("/admin", admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
