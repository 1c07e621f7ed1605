//! Circulation server - university library borrowing service

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config);

    tracing::info!("Starting circulation server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        daily_fine_rate = config.circulation.daily_fine_rate,
        loan_period_days = config.circulation.loan_period_days,
        "Borrowing policy loaded"
    );

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let sync_interval = config.circulation.overdue_sync_interval_secs;

    let services = Services::new(Repository::new(pool), &config)?;

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    if sync_interval > 0 {
        spawn_overdue_sync(state.clone(), Duration::from_secs(sync_interval));
    } else {
        tracing::warn!("Background overdue sync disabled");
    }

    let app = api::router(state);

    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "circulation_server={},tower_http=debug",
            config.logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically flip BORROWED loans past their due date to OVERDUE
fn spawn_overdue_sync(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = state.services.loans.sync_overdue().await {
                tracing::error!(error = %e, "Overdue sync failed");
            }
        }
    });
}
