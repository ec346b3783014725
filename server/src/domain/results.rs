//! Results aggregation
//!
//! The super-admin results stream downsamples the contest into
//! fixed-width buckets: replaying history and then the live tail, it
//! emits one leaderboard per bucket, scoring each team's latest values
//! against the answer key as it was when the stream started. The stream
//! itself lives in the superadmin routes; this module owns the state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::core::constants::RESULTS_PERIOD;
use crate::data::types::ProblemRow;
use crate::events::{SolutionEvent, SolutionKind};

/// One team's standing in a results frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TeamScore {
    pub total_answered: u32,
    pub successfully_answered: u32,
}

/// Answer key plus each team's latest submitted values
pub struct Scoreboard {
    correct: HashMap<String, i64>,
    current: HashMap<String, HashMap<String, i64>>,
}

impl Scoreboard {
    pub fn new(problems: &[ProblemRow]) -> Self {
        Self {
            correct: problems
                .iter()
                .map(|p| (p.id.clone(), p.solution))
                .collect(),
            current: HashMap::new(),
        }
    }

    /// Fold a historical entry or live change into the board
    pub fn record(&mut self, team_id: &str, problem_id: &str, value: i64) {
        self.current
            .entry(team_id.to_string())
            .or_default()
            .insert(problem_id.to_string(), value);
    }

    pub fn apply(&mut self, event: &SolutionEvent) {
        match event.kind {
            SolutionKind::Change => self.record(&event.team_id, &event.problem_id, event.value),
            SolutionKind::Delete => {
                if let Some(team) = self.current.get_mut(&event.team_id) {
                    team.remove(&event.problem_id);
                }
            }
        }
    }

    /// Current standings: every known team, with the count of values
    /// matching the answer key
    pub fn scores(&self) -> HashMap<String, TeamScore> {
        self.current
            .iter()
            .map(|(team, answers)| {
                let successfully_answered = answers
                    .iter()
                    .filter(|(problem, value)| {
                        match self.correct.get(*problem) {
                            Some(correct) => correct == *value,
                            None => {
                                tracing::warn!(%problem, "no answer key for problem");
                                false
                            }
                        }
                    })
                    .count() as u32;

                (
                    team.clone(),
                    TeamScore {
                        total_answered: answers.len() as u32,
                        successfully_answered,
                    },
                )
            })
            .collect()
    }
}

/// Bucket cursor, starting at the contest start instant
pub struct BucketClock {
    bucket: DateTime<Utc>,
    period: Duration,
}

impl BucketClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            bucket: start,
            period: Duration::from_std(RESULTS_PERIOD).unwrap_or(Duration::seconds(30)),
        }
    }

    /// Unix timestamps of every bucket that must be emitted before an
    /// observation at `instant` can be folded in; advances the cursor
    /// past them.
    pub fn due_before(&mut self, instant: DateTime<Utc>) -> Vec<i64> {
        let mut due = Vec::new();
        while instant > self.bucket {
            due.push(self.bucket.timestamp());
            self.bucket += self.period;
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn problem(id: &str, solution: i64) -> ProblemRow {
        ProblemRow {
            id: id.to_string(),
            body: String::new(),
            image: String::new(),
            position: 0,
            solution,
        }
    }

    fn change(team: &str, problem: &str, value: i64) -> SolutionEvent {
        SolutionEvent {
            kind: SolutionKind::Change,
            problem_id: problem.to_string(),
            team_id: team.to_string(),
            value,
        }
    }

    #[test]
    fn test_scores_count_matches_against_answer_key() {
        let mut board = Scoreboard::new(&[problem("p1", 42), problem("p2", 7)]);

        board.record("t1", "p1", 42);
        board.record("t1", "p2", 0);
        board.record("t2", "p1", 1);

        let scores = board.scores();
        assert_eq!(
            scores["t1"],
            TeamScore { total_answered: 2, successfully_answered: 1 }
        );
        // a team with only wrong answers is still present
        assert_eq!(
            scores["t2"],
            TeamScore { total_answered: 1, successfully_answered: 0 }
        );
    }

    #[test]
    fn test_latest_value_wins() {
        let mut board = Scoreboard::new(&[problem("p1", 42)]);

        board.record("t1", "p1", 42);
        board.record("t1", "p1", 1);
        assert_eq!(board.scores()["t1"].successfully_answered, 0);

        board.record("t1", "p1", 42);
        assert_eq!(board.scores()["t1"].successfully_answered, 1);
    }

    #[test]
    fn test_delete_event_clears_answer() {
        let mut board = Scoreboard::new(&[problem("p1", 42)]);
        board.apply(&change("t1", "p1", 42));

        board.apply(&SolutionEvent {
            kind: SolutionKind::Delete,
            problem_id: "p1".to_string(),
            team_id: "t1".to_string(),
            value: 0,
        });
        assert_eq!(board.scores()["t1"].total_answered, 0);
    }

    #[test]
    fn test_unknown_problem_never_scores() {
        let mut board = Scoreboard::new(&[problem("p1", 42)]);
        board.record("t1", "ghost", 42);
        assert_eq!(board.scores()["t1"].successfully_answered, 0);
    }

    #[test]
    fn test_bucket_clock_advances_in_periods() {
        let start = Utc.with_ymd_and_hms(2021, 10, 30, 0, 3, 4).unwrap();
        let mut clock = BucketClock::new(start);

        // an observation before or at the first bucket emits nothing
        assert!(clock.due_before(start).is_empty());

        // 31 s later: the start bucket and the +30 s bucket are due
        let due = clock.due_before(start + Duration::seconds(31));
        assert_eq!(
            due,
            vec![start.timestamp(), (start + Duration::seconds(30)).timestamp()]
        );

        // nothing further due until the next boundary passes
        assert!(clock.due_before(start + Duration::seconds(59)).is_empty());
        assert_eq!(
            clock.due_before(start + Duration::seconds(61)),
            vec![(start + Duration::seconds(60)).timestamp()]
        );
    }

    /// History replay: T1 answers p1 correctly at the start, T2 answers
    /// wrongly 31 s in. The first two frames show only T1 with one
    /// correct answer; once T2's entry is folded in it appears with
    /// zero correct.
    #[test]
    fn test_replay_buckets_leaderboards() {
        let start = Utc.with_ymd_and_hms(2021, 10, 30, 0, 0, 0).unwrap();
        let mut board = Scoreboard::new(&[problem("p1", 42)]);
        let mut clock = BucketClock::new(start);

        let history = [
            ("t1", 42i64, start),
            ("t2", 7i64, start + Duration::seconds(31)),
        ];

        let mut frames: Vec<(i64, HashMap<String, TeamScore>)> = Vec::new();
        for (team, value, time) in history {
            for ts in clock.due_before(time) {
                frames.push((ts, board.scores()));
            }
            board.record(team, "p1", value);
        }
        // flush past the live edge
        for ts in clock.due_before(start + Duration::seconds(61)) {
            frames.push((ts, board.scores()));
        }

        assert_eq!(frames.len(), 3);

        assert_eq!(frames[0].0, start.timestamp());
        assert_eq!(frames[0].1["t1"].successfully_answered, 1);
        assert!(!frames[0].1.contains_key("t2"));

        assert_eq!(frames[1].0, (start + Duration::seconds(30)).timestamp());
        assert_eq!(frames[1].1["t1"].successfully_answered, 1);
        assert!(!frames[1].1.contains_key("t2"));

        assert_eq!(frames[2].0, (start + Duration::seconds(60)).timestamp());
        assert_eq!(frames[2].1["t1"].successfully_answered, 1);
        assert_eq!(
            frames[2].1["t2"],
            TeamScore { total_answered: 1, successfully_answered: 0 }
        );
    }
}
