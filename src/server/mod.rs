//! HTTP server hosting the extraction pipeline.
//!
//! One route does the work (POST /extract-bill-data); liveness and service
//! info are static and never touch the pipeline. The shared state is a
//! single [`BillProcessor`] that holds only read-only configuration, so
//! concurrent requests never share mutable state.

mod handlers;
pub mod response;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::llm;
use crate::ocr;
use crate::pipeline::BillProcessor;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<BillProcessor>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let text_source = ocr::create_text_source(&settings.ocr)?;
        let client = llm::create_completion_client(&settings.completion)?;
        let processor = BillProcessor::new(text_source, client, settings.completion.clone())
            .with_quality_threshold(settings.quality_threshold)
            .with_reconcile_policy(settings.reconcile_policy());
        Ok(Self {
            processor: Arc::new(processor),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
