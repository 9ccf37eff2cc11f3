use crop_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    mailer::{HttpMailer, Mailer, NoopMailer},
    repository::{PostgresRepository, RepositoryState},
    storage::{MediaState, MediaStore, S3MediaStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the database pool, the media store, the
/// mailer, and finally the HTTP server.
#[tokio::main]
async fn main() {
    // Fail-fast configuration: a missing production secret stops us here,
    // before anything binds.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crop_portal=debug,tower_http=info,axum=trace".into());

    // Pretty output for local debugging, JSON for log aggregation in prod.
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

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    let media_store = S3MediaStore::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // Development convenience for the Dockerized MinIO setup.
    if config.env == Env::Local {
        media_store.ensure_bucket_exists().await;
    }
    let media = Arc::new(media_store) as MediaState;

    // Outgoing mail runs through the HTTP relay when one is configured;
    // otherwise notifications are logged and dropped.
    let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        )),
        None => Arc::new(NoopMailer),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app_state = AppState {
        repo,
        media,
        mailer,
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind listener.");

    tracing::info!("Listening on {addr}");
    tracing::info!("API documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Server error.");
}
