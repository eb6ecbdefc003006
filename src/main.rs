use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activity_board::api::HttpActivityApi;
use activity_board::board::{ActivityBoard, LoadOutcome};
use activity_board::config::Config;
use activity_board::web;

/// Server-rendered activity board
/// Cache lives in the board; the activities server stays the source of truth
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_board=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let api = HttpActivityApi::new(config.api_url.clone(), config.request_timeout)?;
    tracing::info!(api = %api.base(), "using activities server");

    let board = Arc::new(ActivityBoard::new(api));
    if let LoadOutcome::Loaded { activities } = board.load().await {
        tracing::info!(activities, "initial load complete");
    }

    let app = web::router(board);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("board running on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
