// src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::ledger::VoteLedger;
use crate::models::{ListQuery, PollDraft, StatusFilter};
use crate::poll::PollView;
use crate::services::PollService;
use crate::store::PollStore;

#[derive(Clone)]
pub struct AppState {
    pub polls: PollService,
    pub ledger: VoteLedger,
}

impl AppState {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self {
            polls: PollService::new(store.clone()),
            ledger: VoteLedger::new(store),
        }
    }
}

/// `Json` whose rejections render as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Numbers arrive as raw strings; anything unparseable falls back to the
/// default instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

impl ListParams {
    fn page(&self) -> i64 {
        parse_number(self.page.as_deref()).unwrap_or(1).max(1)
    }

    fn limit(&self) -> Option<i64> {
        parse_number(self.limit.as_deref())
    }
}

fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option_id: Uuid,
}

/// Create a poll; tallies always start at zero
pub async fn create_poll(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    AppJson(draft): AppJson<PollDraft>,
) -> Result<impl IntoResponse, AppError> {
    let poll = state.polls.create_poll(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Poll created successfully",
            "data": PollView::at(poll, Utc::now()),
        })),
    ))
}

/// Fetch a single poll with its options
pub async fn get_poll(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let poll = state.polls.get_poll(id).await?;
    Ok(Json(PollView::at(poll, Utc::now())))
}

/// Page through polls, optionally filtered by lifecycle state
pub async fn list_polls(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page();
    let status = params
        .status
        .as_deref()
        .map(StatusFilter::parse_lenient)
        .unwrap_or_default();

    let limit = ListQuery::new(0, params.limit(), status).limit;
    let query = ListQuery::new((page - 1).saturating_mul(limit), Some(limit), status);

    let now = Utc::now();
    let result = state.polls.list_polls_at(query, now).await?;
    let total_pages = result.total_pages(query.limit);

    let polls: Vec<PollView> = result
        .polls
        .into_iter()
        .map(|poll| PollView::at(poll, now))
        .collect();

    Ok(Json(json!({
        "polls": polls,
        "pagination": {
            "current_page": page,
            "per_page": query.limit,
            "total_items": result.total,
            "total_pages": total_pages,
        },
    })))
}

/// Cast the caller's single vote in a poll
pub async fn vote(
    State(state): State<AppState>,
    Caller(caller): Caller,
    AppPath(poll_id): AppPath<Uuid>,
    AppJson(request): AppJson<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let vote = state.ledger.cast_vote(poll_id, request.option_id, caller).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Vote recorded",
            "data": vote,
        })),
    ))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
