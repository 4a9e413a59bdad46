mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use brewers_api::auth::{AppState, AppStateInner};
use brewers_api::mailer::{LogMailer, Mailer, SmtpMailer};
use brewers_api::routes;
use brewers_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewers=debug,brewers_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::load()?;

    // Init database
    let db = Database::open(&config.db_path)?;
    info!("Database ready at {}", config.db_path.display());

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(settings) => Arc::new(SmtpMailer::new(settings)?),
        None => Arc::new(LogMailer),
    };

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        token_secret: config.token_secret,
        base_url: config.base_url,
        mailer,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("BrewersBuddy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
