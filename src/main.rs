use std::sync::Arc;

use tokio::net::TcpListener;

mod cache;
mod config;
mod db;
mod error;
mod http;
mod models;
mod pagination;
mod seed;
mod services;
#[cfg(test)]
mod test_util;

use cache::{Cache, InMemoryCache};
use config::Config;
use db::Repository;
use error::Result;
use http::AppState;
use seed::SeedOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;

    // Check for --seed flag (generate fake data and exit)
    if args.len() >= 2 && args[1] == "--seed" {
        let options = SeedOptions::from_args(&args[2..])?;
        let report = seed::generate(&repository, options).await?;
        println!("Created {} users and {} entries", report.users, report.entries);
        return Ok(());
    }

    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let state = AppState::new(&config, repository, cache)?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Guest book listening on {}", listener.local_addr()?);

    axum::serve(listener, http::router(Arc::new(state))).await?;

    Ok(())
}
