//! StoryForge Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod infrastructure;
mod use_cases;

use app::{App, Repositories};
use infrastructure::{
    clock::SystemClock,
    ollama::OllamaClient,
    persistence::memory::InMemoryRateLimitStore,
    persistence::sqlite::{
        connect, SqliteRateLimitStore, SqliteStoryRunRepo, SqliteStoryStepRepo,
        SqliteUserProfileRepo,
    },
    ports::{ClockPort, RateLimitStore},
};
use use_cases::generation::RetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is usually run from
    // `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyforge_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting StoryForge Engine");

    // Load configuration
    let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let server_port: u16 = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .unwrap_or(3000);
    let db_path = std::env::var("ENGINE_DB").unwrap_or_else(|_| "storyforge.db".into());
    let max_attempts: u32 = std::env::var("GENERATION_MAX_ATTEMPTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    let retry_delay_ms: u64 = std::env::var("GENERATION_RETRY_DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1000);

    // Create clock for repositories
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    // Open the database
    tracing::info!("Opening database at {}", db_path);
    let pool = connect(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("database setup failed: {}", e))?;

    // Rate-limit counters live in SQLite by default; RATE_LIMIT_STORE=memory
    // keeps them in-process for single-node deployments.
    let rate_limits: Arc<dyn RateLimitStore> = match std::env::var("RATE_LIMIT_STORE").as_deref() {
        Ok("memory") => {
            tracing::info!("Using in-memory rate-limit store");
            Arc::new(InMemoryRateLimitStore::new())
        }
        _ => Arc::new(SqliteRateLimitStore::new(pool.clone())),
    };

    let repositories = Repositories {
        runs: Arc::new(SqliteStoryRunRepo::new(pool.clone(), clock.clone())),
        steps: Arc::new(SqliteStoryStepRepo::new(pool.clone())),
        profiles: Arc::new(SqliteUserProfileRepo::new(pool, clock.clone())),
        rate_limits,
    };

    // Create the story producer
    let producer = Arc::new(OllamaClient::from_env());
    let retry_config = RetryConfig {
        max_attempts,
        retry_delay: Duration::from_millis(retry_delay_ms),
    };
    tracing::info!(
        "Story producer configured with retry: max_attempts={}, retry_delay_ms={}",
        retry_config.max_attempts,
        retry_delay_ms
    );

    // Create application
    let app = Arc::new(App::new(repositories, producer, clock, retry_config));

    // Build router
    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{server_host}:{server_port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let Some(allowed_origins) = allowed_origins else {
        return None;
    };

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        // Clients send identity headers and JSON bodies, both of which
        // trigger CORS preflights.
        .allow_headers([
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-session-id"),
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
