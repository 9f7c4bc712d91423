use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod rfc2047;
mod routes;
mod services;

use services::{
    fetcher::{ConditionalObjectFetcher, FetcherOptions},
    s3_backend::S3Backend,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config; missing storage settings stop the process here ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting music-store with config: {:?}", cfg);

    // --- Storage client, built once and shared by every handler ---
    let backend = S3Backend::connect(&cfg).await;
    let fetcher = ConditionalObjectFetcher::new(
        Arc::new(backend),
        FetcherOptions {
            listing_concurrency: cfg.listing_concurrency,
            enrich_listing: cfg.enrich_listing,
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(fetcher);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
