mod auth;
mod config;
mod entity;
mod error;
mod export;
mod server;
mod store;
mod survey;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = config::Config::load()?;

    let store = store::Store::open(&config.data_dir, &config.db_file).await?;
    let authorizer = auth::SharedSecret::new(config.admin_key.clone());
    let ctx = server::AppContext::new(store, authorizer);

    server::run(&config, ctx).await?;

    info!("Shutdown complete");
    Ok(())
}
