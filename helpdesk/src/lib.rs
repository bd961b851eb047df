//! # helpdesk: support mailbox backend
//!
//! Serves the typed procedures behind a customer-support mailbox web client: organization
//! members and invitations, per-member mailbox access, staff reply statistics, and the GitHub
//! App installation callback that links a mailbox to a set of repositories.
//!
//! ## Architecture
//!
//! - **API layer** ([`api`]): axum handlers under `/api/rpc/{procedure}` plus the GitHub
//!   callback at `/api/connect/github/callback`
//! - **Authentication** ([`auth`]): verifies the identity provider's session JWT from the
//!   session cookie or a bearer token
//! - **Database layer** ([`db`]): repositories over PostgreSQL via sqlx
//! - **Integrations** ([`integrations`]): identity provider, GitHub App and Slack clients
//! - **Client** ([`client`]): typed procedure client and the last-mailbox persistence hook
//!
//! ## Request lifecycle
//!
//! 1. The session extractor verifies the caller's JWT ([`api::models::users::CurrentUser`])
//! 2. Profile reads are memoized for the request in [`context::RequestContext`]
//! 3. Handlers call data-access functions in [`db::handlers`]
//! 4. Errors map to HTTP responses through [`errors::Error`]
//!
//! ## Quick start
//!
//! ```ignore
//! use helpdesk::{Application, Config};
//!
//! let config = Config::load(&args)?;
//! let app = Application::new(config).await?;
//! app.serve(shutdown_signal()).await?;
//! ```
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod integrations;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    config::CorsOrigin,
    integrations::{
        github::{self, GitHubClient},
        identity::{self, IdentityProvider},
        slack::{self, SlackClient},
    },
    openapi::ApiDoc,
};
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{MailboxId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .identity(identity)
///     .github(github)
///     .slack(slack)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub github: Arc<dyn GitHubClient>,
    pub slack: Arc<dyn SlackClient>,
}

/// Get the helpdesk database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect the pool with the configured limits
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(settings.max_lifetime_secs))
        .connect(&config.database.url)
        .await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.auth.security.cors.allowed_origins;
    let allow_origin = if allowed.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the origin without a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: procedures, the GitHub callback, health and docs.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let rpc_routes = Router::new()
        .route("/organization.getMembers", get(api::handlers::organization::get_members))
        .route("/organization.addMember", post(api::handlers::organization::add_member))
        .route("/user.current", get(api::handlers::users::current_user))
        .route("/user.updateLastMailboxSlug", post(api::handlers::users::update_last_mailbox_slug))
        .route("/mailbox.members.list", get(api::handlers::mailboxes::list_members))
        .route("/mailbox.members.update", post(api::handlers::mailboxes::update_member))
        .route("/mailbox.members.stats", get(api::handlers::mailboxes::member_stats));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/connect/github/callback", get(api::handlers::github::callback))
        .nest("/api/rpc", rpc_routes)
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns the router and database pool.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and builds
///    the provider clients
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, closes the pool and flushes telemetry
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting helpdesk with configuration: {:#?}", config);
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on an existing pool. Migrations are applied.
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        let identity: Arc<dyn IdentityProvider> = Arc::from(identity::create_provider(&config.identity, pool.clone())?);
        let github: Arc<dyn GitHubClient> = Arc::from(github::create_client(&config.github)?);
        let slack: Arc<dyn SlackClient> = Arc::from(slack::create_client(&config.slack)?);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .identity(identity)
            .github(github)
            .slack(slack)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Helpdesk listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
