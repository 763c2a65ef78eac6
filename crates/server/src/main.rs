mod config;
mod error;
mod receipts;
mod routes;
mod state;

use anyhow::Context;
use basket_ocr::{default_backend, ParserVocabulary, ReceiptParser, ReceiptPipeline};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new("basket-server".into(), std::io::stdout))
        .init();

    let config = Config::from_env();

    let db = basket_storage::create_db(&config.db_path)
        .await
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;

    let parser = match &config.vocabulary_path {
        Some(path) => {
            let vocabulary = ParserVocabulary::from_file(path)
                .with_context(|| format!("loading vocabulary from {}", path.display()))?;
            tracing::info!(path = %path.display(), "custom parser vocabulary loaded");
            ReceiptParser::with_vocabulary(vocabulary)
        }
        None => ReceiptParser::default(),
    };

    let pipeline = ReceiptPipeline::new(default_backend(config.recognizer_config()), parser);
    let app = routes::router(AppState::new(db, pipeline), &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "basket server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
