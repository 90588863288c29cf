mod knowledge;
mod llm;
mod pipeline;
mod server;
mod session;
mod state;
mod tickets;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, Level};

use knowledge::PolicyIndex;
use llm::LlmClient;
use pipeline::QueryPipeline;
use session::SessionStore;
use state::AppState;
use tickets::TicketStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    // Load env
    let _ = dotenv::dotenv();

    let llm = Arc::new(LlmClient::from_env()?);
    info!("LLM client initialized");

    let index = Arc::new(PolicyIndex::build(llm.clone()).await);
    let pipeline = QueryPipeline::new(llm.clone(), index);

    let state = Arc::new(AppState {
        pipeline,
        sessions: SessionStore::from_env(),
        tickets: TicketStore::from_env(),
        start_time: Instant::now(),
    });

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "Policy assistant listening");

    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
