use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vinxen_api::auth::password::Argon2Hasher;
use vinxen_api::config::ServerConfig;
use vinxen_api::router::build_app_router;
use vinxen_api::state::AppState;
use vinxen_db::store::PgUserStore;
use vinxen_gemini::{GeminiClient, GeminiConfig, ImageAnalyzer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vinxen_api=debug,vinxen_gemini=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        environment = ?config.environment,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vinxen_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vinxen_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    vinxen_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Image analysis ---
    let analyzer: Option<Arc<dyn ImageAnalyzer>> = match GeminiConfig::from_env() {
        Some(gemini) => {
            tracing::info!(model = %gemini.model, "Image analysis enabled");
            let client: Arc<dyn ImageAnalyzer> =
                Arc::new(GeminiClient::new(gemini).expect("Failed to build Gemini HTTP client"));
            Some(client)
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, image analysis disabled");
            None
        }
    };

    // --- App state ---
    let state = AppState {
        users: Arc::new(PgUserStore::new(pool.clone())),
        pool,
        config: Arc::new(config.clone()),
        hasher: Arc::new(Argon2Hasher),
        analyzer,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
