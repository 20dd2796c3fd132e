// Web front-end for image analysis backed by Azure Computer Vision
//
// Reads VISION_KEY / VISION_ENDPOINT (from the environment or a local .env),
// then serves a single page where an uploaded JPEG can be sent for tags,
// caption, and color analysis.

mod config;
mod error;
mod page;
mod render;
mod server;
mod session;
mod upload;
mod vision;

use anyhow::Context;
use config::ConfigOutcome;
use server::AppState;
use session::Startup;
use tracing_subscriber::EnvFilter;
use vision::VisionClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let startup = Startup::resolve(ConfigOutcome::from_env(), VisionClient::connect);
    let app = server::router(AppState::new(startup));

    let addr = config::listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("🚀 Server running on http://{addr}");
    tracing::info!("📸 Open in your browser to start analyzing images!");

    axum::serve(listener, app).await?;
    Ok(())
}
