//! Public HTTP API: submit entries, read the journal and the agent's mind, chat.
//! Moderation and publishing are not reachable from here.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use blank_core::{Context, Entry, Error, InboundMessage, JournalEntry, Synthesis, WakingEntry};
use blank_store::JournalQuery;

use crate::pipeline::{CycleInfo, Pipeline};

const DEFAULT_WAKING_LIMIT: usize = 10;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::InsufficientTier { .. } | Error::CoreMemoryNotEligible { .. } => StatusCode::FORBIDDEN,
        Error::TextTooLong { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidTransition { .. } | Error::NothingToSynthesize(_) => StatusCode::CONFLICT,
        Error::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        Error::OracleUnavailable(_) | Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(code = self.0.code(), "request failed: {}", self.0);
        }
        let body = json!({ "error": self.0.to_string(), "code": self.0.code() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct SubmitBody {
    author_id: String,
    text: String,
    #[serde(default)]
    core_memory: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CycleParams {
    cycle: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct JournalParams {
    cycle: Option<u32>,
    #[serde(default)]
    core_only: bool,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct WakingParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/api/entries", post(submit_entry).get(list_journal))
        .route("/api/context", get(context))
        .route("/api/synthesis", get(synthesis))
        .route("/api/waking", get(waking))
        .route("/api/chat", post(chat))
        .route("/api/cycle", get(cycle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    pipeline: Pipeline,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("HTTP API listening on http://{addr}");
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("HTTP API shutting down gracefully");
        })
        .await
}

async fn submit_entry(
    State(pipeline): State<Pipeline>,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let Json(body) = body?;
    let entry = pipeline
        .submit_entry(&body.author_id, &body.text, body.core_memory)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_journal(
    State(pipeline): State<Pipeline>,
    params: Result<Query<JournalParams>, QueryRejection>,
) -> ApiResult<Vec<JournalEntry>> {
    let Query(params) = params?;
    let defaults = JournalQuery::default();
    let entries = pipeline
        .list_journal(JournalQuery {
            cycle_number: params.cycle,
            core_only: params.core_only,
            limit: params.limit.unwrap_or(defaults.limit),
            offset: params.offset.unwrap_or(defaults.offset),
        })
        .await?;
    Ok(Json(entries))
}

async fn context(
    State(pipeline): State<Pipeline>,
    params: Result<Query<CycleParams>, QueryRejection>,
) -> ApiResult<Context> {
    let Query(params) = params?;
    Ok(Json(pipeline.get_context(params.cycle).await?))
}

async fn synthesis(
    State(pipeline): State<Pipeline>,
    params: Result<Query<CycleParams>, QueryRejection>,
) -> ApiResult<Option<Synthesis>> {
    let Query(params) = params?;
    Ok(Json(pipeline.get_synthesis(params.cycle).await?))
}

async fn waking(
    State(pipeline): State<Pipeline>,
    params: Result<Query<WakingParams>, QueryRejection>,
) -> ApiResult<Vec<WakingEntry>> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_WAKING_LIMIT);
    Ok(Json(pipeline.list_waking(limit).await?))
}

async fn chat(
    State(pipeline): State<Pipeline>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(body) = body?;
    let reply = pipeline.chat(body.messages).await?;
    Ok(Json(json!({ "reply": reply })))
}

async fn cycle(State(pipeline): State<Pipeline>) -> Json<CycleInfo> {
    Json(pipeline.cycle_info())
}
