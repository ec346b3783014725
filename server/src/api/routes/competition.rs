//! Live competition endpoints
//!
//! The three streams follow the same snapshot-then-tail shape: attach
//! to the bus first, send the store state, then forward events until
//! the client disconnects. A client may therefore see a mutation both
//! in its snapshot and as an event; frames are keyed by problem id so
//! clients apply them idempotently.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::api::auth::Access;
use crate::api::types::ApiError;
use crate::core::constants::SSE_KEEP_ALIVE;
use crate::data::repositories::{history, info, problems, solutions};
use crate::data::types::ProblemRow;
use crate::events::{EventBus, ProblemEvent, SolutionEvent, SolutionKind, SolutionScope};

#[derive(Clone)]
pub struct CompetitionRoutesState {
    pub pool: SqlitePool,
    pub bus: Arc<EventBus>,
}

/// Endpoints behind the contestant gate (team + contest start)
pub fn gated_routes(pool: SqlitePool, bus: Arc<EventBus>) -> Router {
    let state = CompetitionRoutesState { pool, bus };

    Router::new()
        .route("/GetProblems", get(get_problems))
        .route("/GetSolutions", get(get_solutions))
        .route("/SetSolutions", post(set_solutions))
        .with_state(state)
}

/// GetTimes is deliberately anonymous; the allow-list is this separate
/// router rather than a claim-absence inference.
pub fn public_routes(pool: SqlitePool, bus: Arc<EventBus>) -> Router {
    let state = CompetitionRoutesState { pool, bus };

    Router::new()
        .route("/GetTimes", get(get_times))
        .with_state(state)
}

// =============================================================================
// Stream frames
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProblemDto {
    pub id: String,
    pub body: String,
    pub image: String,
    /// Answer key, present only on the admin stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<i64>,
}

impl ProblemDto {
    fn from_row(row: &ProblemRow, with_solution: bool) -> Self {
        Self {
            id: row.id.clone(),
            body: row.body.clone(),
            image: row.image.clone(),
            solution: with_solution.then_some(row.solution),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum ProblemFrameType {
    #[serde(rename = "k_INITIAL")]
    Initial,
    #[serde(rename = "k_UPDATE")]
    Update,
    #[serde(rename = "k_DELETE")]
    Delete,
    #[serde(rename = "k_SWAP")]
    Swap,
    #[serde(rename = "k_CREATE")]
    Create,
}

#[derive(Debug, Serialize)]
pub struct InitialPayload {
    pub problem: ProblemDto,
    pub at: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdatePayload {
    pub problem: ProblemDto,
}

#[derive(Debug, Serialize)]
pub struct DeletePayload {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SwapPayload {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePayload {
    pub at: i64,
    pub problem: ProblemDto,
}

/// Tagged union: exactly one payload field is populated, matching the
/// tag.
#[derive(Debug, Serialize)]
pub struct ProblemStreamFrame {
    #[serde(rename = "type")]
    pub frame_type: ProblemFrameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<InitialPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdatePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<DeletePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<SwapPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<CreatePayload>,
}

impl ProblemStreamFrame {
    fn empty(frame_type: ProblemFrameType) -> Self {
        Self {
            frame_type,
            initial: None,
            update: None,
            delete: None,
            swap: None,
            create: None,
        }
    }

    pub fn initial(row: &ProblemRow, with_solution: bool) -> Self {
        Self {
            initial: Some(InitialPayload {
                problem: ProblemDto::from_row(row, with_solution),
                at: row.position,
            }),
            ..Self::empty(ProblemFrameType::Initial)
        }
    }

    pub fn from_event(event: &ProblemEvent, with_solution: bool) -> Self {
        match event {
            ProblemEvent::Change { problem } => Self {
                update: Some(UpdatePayload {
                    problem: ProblemDto::from_row(problem, with_solution),
                }),
                ..Self::empty(ProblemFrameType::Update)
            },
            ProblemEvent::Delete { problem } => Self {
                delete: Some(DeletePayload {
                    id: problem.id.clone(),
                }),
                ..Self::empty(ProblemFrameType::Delete)
            },
            ProblemEvent::Swap { a, b } => Self {
                swap: Some(SwapPayload {
                    a: a.id.clone(),
                    b: b.id.clone(),
                }),
                ..Self::empty(ProblemFrameType::Swap)
            },
            ProblemEvent::Create { at, problem } => Self {
                create: Some(CreatePayload {
                    at: *at,
                    problem: ProblemDto::from_row(problem, with_solution),
                }),
                ..Self::empty(ProblemFrameType::Create)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum SolutionFrameType {
    #[serde(rename = "k_CHANGE")]
    Change,
    #[serde(rename = "k_DELETE")]
    Delete,
}

#[derive(Debug, Serialize)]
pub struct SolutionFrame {
    #[serde(rename = "type")]
    pub frame_type: SolutionFrameType,
    pub id: String,
    pub value: i64,
}

impl SolutionFrame {
    fn from_event(event: &SolutionEvent) -> Self {
        Self {
            frame_type: match event.kind {
                SolutionKind::Change => SolutionFrameType::Change,
                SolutionKind::Delete => SolutionFrameType::Delete,
            },
            id: event.problem_id.clone(),
            value: event.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimesFrame {
    pub start: String,
    pub end: String,
}

impl TimesFrame {
    /// From stored unix seconds to RFC3339 on the wire
    pub fn from_timestamps(start: i64, end: i64) -> Self {
        Self {
            start: rfc3339(start),
            end: rfc3339(end),
        }
    }
}

pub fn rfc3339(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serialize one frame into an SSE event; a failure is logged and the
/// frame skipped rather than tearing the stream down.
pub(crate) fn frame_event<T: Serialize>(frame: &T) -> Option<Event> {
    match serde_json::to_string(frame) {
        Ok(data) => Some(Event::default().data(data)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize stream frame");
            None
        }
    }
}

pub(crate) fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(SSE_KEEP_ALIVE).text("keep-alive")
}

// =============================================================================
// Streams
// =============================================================================

/// Snapshot-then-tail over the problems topic, shared by the contestant
/// and admin variants; only the latter sees the answer key.
pub(crate) async fn problem_stream(
    pool: SqlitePool,
    bus: Arc<EventBus>,
    with_solution: bool,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // attach before the snapshot read so a mutation committed in
    // between is not lost (a duplicate is fine, a gap is not)
    let mut subscription = bus.subscribe_problems();
    let snapshot = problems::all(&pool).await?;

    let stream = async_stream::stream! {
        for row in &snapshot {
            if let Some(event) = frame_event(&ProblemStreamFrame::initial(row, with_solution)) {
                yield Ok(event);
            }
        }

        while let Some(problem_event) = subscription.recv().await {
            let frame = ProblemStreamFrame::from_event(&problem_event, with_solution);
            if let Some(event) = frame_event(&frame) {
                yield Ok(event);
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

pub async fn get_problems(
    State(state): State<CompetitionRoutesState>,
    Access(_claims): Access,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    problem_stream(state.pool, state.bus, false).await
}

pub async fn get_solutions(
    State(state): State<CompetitionRoutesState>,
    Access(claims): Access,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if claims.team.is_empty() {
        return Err(ApiError::NoTeam);
    }

    let mut subscription = state
        .bus
        .subscribe_solutions(SolutionScope::Team(claims.team.clone()));
    let snapshot = solutions::for_team(&state.pool, &claims.team).await?;

    let stream = async_stream::stream! {
        for row in &snapshot {
            let frame = SolutionFrame {
                frame_type: SolutionFrameType::Change,
                id: row.problem_id.clone(),
                value: row.value,
            };
            if let Some(event) = frame_event(&frame) {
                yield Ok(event);
            }
        }

        while let Some(solution_event) = subscription.recv().await {
            if let Some(event) = frame_event(&SolutionFrame::from_event(&solution_event)) {
                yield Ok(event);
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

pub async fn get_times(
    State(state): State<CompetitionRoutesState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut subscription = state.bus.subscribe_times();
    let current = info::get(&state.pool).await?.ok_or(ApiError::Database)?;

    let stream = async_stream::stream! {
        let frame = TimesFrame::from_timestamps(current.start_time, current.end_time);
        if let Some(event) = frame_event(&frame) {
            yield Ok(event);
        }

        while let Some(time_event) = subscription.recv().await {
            let frame = TimesFrame::from_timestamps(
                time_event.start.timestamp(),
                time_event.end.timestamp(),
            );
            if let Some(event) = frame_event(&frame) {
                yield Ok(event);
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

// =============================================================================
// Mutations
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SetSolutionsRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub delete: bool,
}

/// Upsert or delete the caller team's answer for one problem. The
/// history append is best-effort: the authoritative row was already
/// written, so a failure is logged instead of surfaced.
pub async fn set_solutions(
    State(state): State<CompetitionRoutesState>,
    Access(claims): Access,
    Json(request): Json<SetSolutionsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.id.is_empty() {
        return Err(ApiError::InvalidId);
    }
    if claims.team.is_empty() {
        return Err(ApiError::NoTeam);
    }

    if request.delete {
        solutions::delete(&state.pool, &claims.team, &request.id).await?;
        state.bus.publish_solution(SolutionEvent {
            kind: SolutionKind::Delete,
            problem_id: request.id,
            team_id: claims.team,
            value: 0,
        });
        return Ok(Json(serde_json::json!({})));
    }

    solutions::upsert(&state.pool, &claims.team, &request.id, request.value).await?;
    state.bus.publish_solution(SolutionEvent {
        kind: SolutionKind::Change,
        problem_id: request.id.clone(),
        team_id: claims.team.clone(),
        value: request.value,
    });

    if let Err(e) = history::append(
        &state.pool,
        &claims.team,
        &request.id,
        request.value,
        Utc::now().timestamp_millis(),
    )
    .await
    {
        tracing::error!(error = %e, "failed to append history entry");
    }

    Ok(Json(serde_json::json!({})))
}
