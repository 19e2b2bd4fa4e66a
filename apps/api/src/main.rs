//! API Server Entry Point
//!
//! Startup wiring: environment, database, migrations, cleanup, and the
//! authentication routes. Startup errors use `anyhow`; request-level
//! errors are the domain crates' concern.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use auth::application::config::AuthConfig;
use auth::domain::repository::MaintenanceRepository;
use auth::infra::{LogOnlyNotifier, PgAuthRepository, TracingEventSink};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("../../database/migrations").run(&pool).await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: expired challenges, dead sessions, stale rate
    // windows. Errors here should not prevent server startup.
    let repo = Arc::new(PgAuthRepository::new(pool.clone()));
    match repo.cleanup_expired().await {
        Ok(rows) => {
            tracing::info!(rows_deleted = rows, "startup cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "startup cleanup failed, continuing anyway");
        }
    }

    let auth_config = if cfg!(debug_assertions) {
        AuthConfig::development()
    } else {
        // In production, load secret from environment
        let secret_b64 =
            env::var("AUTH_SESSION_SECRET").expect("AUTH_SESSION_SECRET must be set in production");
        let secret_bytes = Engine::decode(&general_purpose::STANDARD, &secret_b64)?;
        anyhow::ensure!(
            secret_bytes.len() == 32,
            "AUTH_SESSION_SECRET must decode to 32 bytes"
        );
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&secret_bytes);
        AuthConfig::new(secret, true)
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-csrf-token"),
            header::HeaderName::from_static("x-xsrf-token"),
        ]))
        .allow_credentials(true);

    let app = Router::new()
        .nest(
            "/auth",
            auth::auth_router(
                repo,
                Arc::new(auth_config),
                Arc::new(TracingEventSink),
                Arc::new(LogOnlyNotifier),
            ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(31113);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
