use library_loans::{
    adapters::postgres::{PostgresCatalogGateway, PostgresLoanLedger, PostgresMemberDirectory},
    api::{handlers::AppState, router::create_router},
    application::request::ServiceDependencies,
    config::AppConfig,
    ports::SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_loans=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize adapters
    let service_deps = ServiceDependencies::new(
        Arc::new(PostgresLoanLedger::new(pool.clone())),
        Arc::new(PostgresCatalogGateway::new(pool.clone())),
        Arc::new(PostgresMemberDirectory::new(pool)),
        Arc::new(SystemClock),
        config.loan_policy(),
        config.retry_policy(),
    );

    // Deadline timers are not persisted; re-arm them for books still on loan
    service_deps.overdue_scheduler.restore().await?;

    let scheduler = Arc::clone(&service_deps.overdue_scheduler);

    // Create application state
    let app_state = Arc::new(AppState {
        service_deps,
        jwt_secret: config.auth.jwt_secret.clone(),
    });

    let app = create_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
