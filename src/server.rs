use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::state::AppState;
use crate::tickets::TicketRecord;

type AppStateArc = Arc<AppState>;

pub fn router(state: AppStateArc) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/generate_ticket_summary", post(generate_ticket_summary))
        .route("/create_ticket", post(create_ticket))
        .route("/health", get(health_check))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    "default_session".to_string()
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
    #[serde(skip_serializing_if = "is_false")]
    pub clarification_needed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub prompt_ticket: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

async fn handle_query(
    State(state): State<AppStateArc>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    if req.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    info!(query = %req.query, session = %req.session_id, "Received query");

    let session = state.sessions.get_or_create(&req.session_id).await;
    let mut session = session.lock().await;

    let reply = state
        .pipeline
        .handle(&mut session, &req.query)
        .await
        .map_err(|e| {
            error!(error = %e, "Query pipeline failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(QueryResponse {
        response: reply.response,
        clarification_needed: reply.clarification_needed,
        prompt_ticket: reply.prompt_ticket,
    }))
}

#[derive(Debug, Serialize)]
pub struct TicketSummaryResponse {
    pub ticket_summary: String,
}

async fn generate_ticket_summary(
    State(state): State<AppStateArc>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<TicketSummaryResponse>, (StatusCode, String)> {
    let recent = {
        let session = state.sessions.get_or_create(&req.session_id).await;
        let session = session.lock().await;
        session.recent_queries().to_vec()
    };

    let ticket_summary = state
        .pipeline
        .draft_ticket_summary(&req.query, &recent)
        .await
        .map_err(|e| {
            error!(error = %e, "Ticket summary generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(TicketSummaryResponse { ticket_summary }))
}

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub issue_summary: String,
    pub issue_category: String,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub response: String,
    pub ticket: TicketRecord,
}

async fn create_ticket(
    State(state): State<AppStateArc>,
    Json(req): Json<TicketRequest>,
) -> Result<Json<TicketResponse>, (StatusCode, String)> {
    let ticket = state
        .tickets
        .create(&req.issue_summary, &req.issue_category)
        .await
        .map_err(|e| {
            error!(error = %e, "Ticket creation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let response = format!(
        "Ticket Created: {} in category *{}*.",
        ticket.ticket_id, ticket.issue_category
    );
    Ok(Json(TicketResponse { response, ticket }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
