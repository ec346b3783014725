//! Super-admin endpoints: the contest window and the results stream

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::competition::{TimesFrame, frame_event, keep_alive};
use crate::api::types::ApiError;
use crate::data::repositories::{history, info, problems};
use crate::domain::results::{BucketClock, Scoreboard, TeamScore};
use crate::events::{EventBus, SolutionScope, TimeEvent};

#[derive(Clone)]
pub struct SuperAdminRoutesState {
    pub pool: SqlitePool,
    pub bus: Arc<EventBus>,
}

pub fn routes(pool: SqlitePool, bus: Arc<EventBus>) -> Router {
    let state = SuperAdminRoutesState { pool, bus };

    Router::new()
        .route("/SetTime", post(set_time))
        .route("/GetTime", get(get_time))
        .route("/GetResults", get(get_results))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SetTimeRequest {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

pub async fn set_time(
    State(state): State<SuperAdminRoutesState>,
    Json(request): Json<SetTimeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let start = DateTime::parse_from_rfc3339(&request.start)
        .map_err(|_| ApiError::InvalidTime)?
        .with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(&request.end)
        .map_err(|_| ApiError::InvalidTime)?
        .with_timezone(&Utc);

    info::set(&state.pool, start.timestamp(), end.timestamp()).await?;
    state.bus.publish_time(TimeEvent { start, end });

    Ok(Json(serde_json::json!({})))
}

pub async fn get_time(
    State(state): State<SuperAdminRoutesState>,
) -> Result<Json<TimesFrame>, ApiError> {
    let current = info::get(&state.pool).await?.ok_or(ApiError::Database)?;
    Ok(Json(TimesFrame::from_timestamps(
        current.start_time,
        current.end_time,
    )))
}

#[derive(Debug, Serialize)]
pub struct ResultsFrame {
    pub timestamp: i64,
    pub results: HashMap<String, TeamScore>,
}

/// Time-bucketed leaderboards from contest start to the live edge.
///
/// History is replayed first, then the live solution tail; one frame is
/// emitted per bucket. Any problem mutation ends the stream: the answer
/// key changed and everything already emitted is stale, so the client
/// reconnects and re-scores. That closure is a protocol signal, not a
/// failure.
pub async fn get_results(
    State(state): State<SuperAdminRoutesState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut solution_sub = state.bus.subscribe_solutions(SolutionScope::All);
    let mut problem_sub = state.bus.subscribe_problems();

    let current = info::get(&state.pool).await?.ok_or(ApiError::Database)?;
    let start = DateTime::from_timestamp(current.start_time, 0).ok_or(ApiError::Database)?;
    let answer_key = problems::all(&state.pool).await?;
    let entries = history::all_ordered(&state.pool).await?;

    let stream = async_stream::stream! {
        let mut board = Scoreboard::new(&answer_key);
        let mut clock = BucketClock::new(start);

        for entry in &entries {
            if problem_sub.try_recv().is_some() {
                return;
            }

            let Some(entry_time) = DateTime::from_timestamp_millis(entry.time) else {
                tracing::error!(time = entry.time, "history entry with invalid time");
                continue;
            };
            for timestamp in clock.due_before(entry_time) {
                let frame = ResultsFrame { timestamp, results: board.scores() };
                if let Some(event) = frame_event(&frame) {
                    yield Ok(event);
                }
            }

            board.record(&entry.team_id, &entry.problem_id, entry.value);
        }

        loop {
            tokio::select! {
                biased;
                _ = problem_sub.recv() => {
                    // answer key changed (or this subscriber was
                    // disconnected): stop and let the client re-score
                    return;
                }
                received = solution_sub.recv() => {
                    let Some(solution_event) = received else { return };

                    for timestamp in clock.due_before(Utc::now()) {
                        let frame = ResultsFrame { timestamp, results: board.scores() };
                        if let Some(event) = frame_event(&frame) {
                            yield Ok(event);
                        }
                    }

                    board.apply(&solution_event);
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    async fn state() -> SuperAdminRoutesState {
        SuperAdminRoutesState {
            pool: test_pool().await,
            bus: Arc::new(EventBus::new()),
        }
    }

    #[tokio::test]
    async fn test_set_time_then_get_time_round_trips() {
        let state = state().await;

        set_time(
            State(state.clone()),
            Json(SetTimeRequest {
                start: "2021-10-30T00:03:04Z".to_string(),
                end: "2021-10-30T02:49:44Z".to_string(),
            }),
        )
        .await
        .unwrap();

        let times = get_time(State(state)).await.unwrap();
        assert_eq!(times.0.start, "2021-10-30T00:03:04Z");
        assert_eq!(times.0.end, "2021-10-30T02:49:44Z");
    }

    #[tokio::test]
    async fn test_set_time_rejects_bad_input() {
        let state = state().await;
        let err = set_time(
            State(state),
            Json(SetTimeRequest {
                start: "yesterday".to_string(),
                end: "2021-10-30T02:49:44Z".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ApiError::InvalidTime);
    }

    #[tokio::test]
    async fn test_set_time_publishes_window() {
        let state = state().await;
        let mut sub = state.bus.subscribe_times();

        set_time(
            State(state),
            Json(SetTimeRequest {
                start: "2021-10-30T00:03:04Z".to_string(),
                end: "2021-10-30T02:49:44Z".to_string(),
            }),
        )
        .await
        .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.start.timestamp(), 1635552184);
    }

    #[tokio::test]
    async fn test_get_time_without_window_is_database_error() {
        let state = state().await;
        assert_eq!(get_time(State(state)).await.unwrap_err(), ApiError::Database);
    }

    #[tokio::test]
    async fn test_get_results_requires_window() {
        let state = state().await;
        assert!(get_results(State(state)).await.is_err());
    }
}
