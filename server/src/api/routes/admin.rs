//! Problem administration
//!
//! Mutations commit to the store first and publish onto the problems
//! topic after, so a subscriber observing an event can rely on the
//! store already reflecting it. The admin stream is the contestant
//! stream plus the answer key.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Deserialize;
use sqlx::SqlitePool;

use super::competition::problem_stream;
use crate::api::types::ApiError;
use crate::data::repositories::problems;
use crate::events::{EventBus, ProblemEvent};

#[derive(Clone)]
pub struct AdminRoutesState {
    pub pool: SqlitePool,
    pub bus: Arc<EventBus>,
}

pub fn routes(pool: SqlitePool, bus: Arc<EventBus>) -> Router {
    let state = AdminRoutesState { pool, bus };

    Router::new()
        .route("/GetProblems", get(get_problems))
        .route("/CreateProblem", post(create_problem))
        .route("/UpdateProblem", post(update_problem))
        .route("/DeleteProblem", post(delete_problem))
        .route("/SwapProblem", post(swap_problem))
        .with_state(state)
}

pub async fn get_problems(
    State(state): State<AdminRoutesState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    problem_stream(state.pool, state.bus, true).await
}

#[derive(Debug, Deserialize)]
pub struct CreateProblemRequest {
    #[serde(default)]
    pub at: i64,
}

pub async fn create_problem(
    State(state): State<AdminRoutesState>,
    Json(request): Json<CreateProblemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.at < 0 {
        return Err(ApiError::InvalidPosition);
    }

    let problem = problems::insert_at(&state.pool, request.at).await?;
    state.bus.publish_problem(ProblemEvent::Create {
        at: request.at,
        problem,
    });

    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ProblemInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub solution: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProblemRequest {
    pub problem: ProblemInput,
}

pub async fn update_problem(
    State(state): State<AdminRoutesState>,
    Json(request): Json<UpdateProblemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let input = request.problem;
    if input.id.is_empty() {
        return Err(ApiError::InvalidId);
    }

    let problem = problems::update(&state.pool, &input.id, &input.body, &input.image, input.solution)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.bus.publish_problem(ProblemEvent::Change { problem });
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct DeleteProblemRequest {
    #[serde(default)]
    pub id: String,
}

pub async fn delete_problem(
    State(state): State<AdminRoutesState>,
    Json(request): Json<DeleteProblemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.id.is_empty() {
        return Err(ApiError::InvalidId);
    }

    let problem = problems::delete(&state.pool, &request.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.bus.publish_problem(ProblemEvent::Delete { problem });
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct SwapProblemRequest {
    #[serde(default)]
    pub a: String,
    #[serde(default)]
    pub b: String,
}

pub async fn swap_problem(
    State(state): State<AdminRoutesState>,
    Json(request): Json<SwapProblemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.a.is_empty() || request.b.is_empty() {
        return Err(ApiError::InvalidId);
    }

    let (a, b) = problems::swap(&state.pool, &request.a, &request.b)
        .await?
        .ok_or(ApiError::NotFound)?;

    state.bus.publish_problem(ProblemEvent::Swap { a, b });
    Ok(Json(serde_json::json!({})))
}
