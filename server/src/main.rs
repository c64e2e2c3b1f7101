use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticket_server::config::Config;
use ticket_server::routes::create_routes;
use ticket_server::state::AppState;
use ticket_server::store::PgTicketStore;
use ticket_server::ticketing::{ArtifactRenderer, FsArtifactStore, TicketingService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ticket_server=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Successfully connected to database");

    sqlx::migrate!().run(&pool).await?;

    tracing::info!("Migrations run successfully");

    let artifacts = FsArtifactStore::open(&config.artifact_dir).await?;
    let renderer = ArtifactRenderer::with_template(config.ticket_template.as_deref());
    tracing::info!(
        artifact_dir = %config.artifact_dir.display(),
        template = renderer.has_template(),
        "Ticket artifacts configured"
    );

    let store = Arc::new(PgTicketStore::new(pool));
    let tickets = TicketingService::new(store, Arc::new(artifacts), renderer);
    let app: Router = create_routes(AppState::new(tickets));

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
