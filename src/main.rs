use site_cms::{
    AppState,
    auth::{JwksVerifier, VerifierState},
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    settings::SettingsState,
    storage::{DiskStorage, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, connects and migrates Postgres, prepares the
/// upload root and the token verifier, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing mandatory variables)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: pretty locally, JSON in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "site_cms=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database: pool, then schema migrations.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    // One repository serves both the content and the settings traits.
    let postgres = Arc::new(PostgresRepository::new(pool));
    let repo = postgres.clone() as RepositoryState;
    let settings = postgres as SettingsState;

    // 4. Upload root
    let disk = DiskStorage::new(&config.upload_dir);
    disk.ensure_root_exists()
        .await
        .expect("FATAL: Cannot create the upload directory. Check UPLOAD_DIR.");
    tracing::info!("Serving uploads from {}", disk.root().display());
    let storage = Arc::new(disk) as StorageState;

    // 5. Token verifier (keys are fetched lazily on first use)
    tracing::info!("Verifying admin tokens against {}", config.jwks_url);
    let verifier = Arc::new(JwksVerifier::new(config.jwks_url.clone())) as VerifierState;

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        settings,
        storage,
        verifier,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Cannot bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    // Peer addresses feed the ClientIp extractor when no proxy header is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("FATAL: HTTP server terminated unexpectedly.");
}
