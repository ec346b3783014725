//! Event payloads carried by the bus

use chrono::{DateTime, Utc};

use crate::data::types::ProblemRow;

/// Problem plane mutation. Create/Change/Delete carry the affected row;
/// Swap carries both rows as they were when the swap was issued (stream
/// frames only use their ids).
#[derive(Debug, Clone)]
pub enum ProblemEvent {
    Create { at: i64, problem: ProblemRow },
    Change { problem: ProblemRow },
    Delete { problem: ProblemRow },
    Swap { a: ProblemRow, b: ProblemRow },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionKind {
    Change,
    Delete,
}

/// Solution plane mutation, routed by `team_id`
#[derive(Debug, Clone)]
pub struct SolutionEvent {
    pub kind: SolutionKind,
    pub problem_id: String,
    pub team_id: String,
    pub value: i64,
}

/// Contest window change
#[derive(Debug, Clone, Copy)]
pub struct TimeEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
