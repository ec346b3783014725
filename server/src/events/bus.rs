//! Typed topics with per-subscriber bounded channels
//!
//! Each topic keeps an ordered subscriber list behind its own mutex; a
//! publish walks the list under the lock and `try_send`s, so delivery
//! order per subscriber equals publish order. The send never blocks: a
//! subscriber whose buffer is full is disconnected on the spot (its
//! channel closes, the stream ends, the client reconnects and
//! re-snapshots). Dropping a [`Subscription`] removes its entry with a
//! swap-with-last erase; removal is idempotent.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use uuid::Uuid;

use super::types::{ProblemEvent, SolutionEvent, TimeEvent};
use crate::core::constants::SUBSCRIBER_BUFFER;

struct Subscriber<T> {
    id: Uuid,
    /// Routing key; `None` receives everything on the topic
    key: Option<String>,
    tx: mpsc::Sender<T>,
}

struct Topic<T> {
    name: &'static str,
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

impl<T> Topic<T> {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            subscribers: Mutex::new(Vec::new()),
        })
    }

    fn subscribe(self: &Arc<Self>, key: Option<String>) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = Uuid::new_v4();

        self.subscribers.lock().push(Subscriber { id, key, tx });
        tracing::trace!(topic = self.name, %id, "Subscriber attached");

        Subscription {
            id,
            rx,
            topic: Arc::clone(self),
        }
    }

    fn remove(&self, id: Uuid) {
        let mut subscribers = self.subscribers.lock();
        if let Some(index) = subscribers.iter().position(|s| s.id == id) {
            subscribers.swap_remove(index);
            tracing::trace!(topic = self.name, %id, "Subscriber removed");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T: Clone> Topic<T> {
    /// Deliver to every subscriber whose routing key matches. Slow and
    /// closed subscribers are dropped from the list while iterating.
    fn publish_where(&self, event: &T, matches: impl Fn(&Option<String>) -> bool) {
        let mut subscribers = self.subscribers.lock();
        let mut index = 0;
        while index < subscribers.len() {
            let subscriber = &subscribers[index];
            if !matches(&subscriber.key) {
                index += 1;
                continue;
            }

            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => index += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        topic = self.name,
                        id = %subscriber.id,
                        "Disconnecting slow subscriber"
                    );
                    subscribers.swap_remove(index);
                }
                Err(TrySendError::Closed(_)) => {
                    subscribers.swap_remove(index);
                }
            }
        }
    }

    fn publish(&self, event: &T) {
        self.publish_where(event, |_| true);
    }
}

/// Receive end of a topic subscription. Dropping it detaches the
/// subscriber from the topic.
pub struct Subscription<T> {
    id: Uuid,
    rx: mpsc::Receiver<T>,
    topic: Arc<Topic<T>>,
}

impl<T> Subscription<T> {
    /// Next event, or `None` once the subscriber was disconnected
    /// (publisher saw a full buffer).
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking variant used where a stream only needs to know
    /// whether anything arrived since the last check.
    pub fn try_recv(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.topic.remove(self.id);
    }
}

/// Delivery restriction for the solutions topic
#[derive(Debug, Clone)]
pub enum SolutionScope {
    /// Only events for this team
    Team(String),
    /// Every team (admin and results subscriptions)
    All,
}

/// The process-wide fan-out bus
pub struct EventBus {
    problems: Arc<Topic<ProblemEvent>>,
    solutions: Arc<Topic<SolutionEvent>>,
    times: Arc<Topic<TimeEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            problems: Topic::new("problems"),
            solutions: Topic::new("solutions"),
            times: Topic::new("times"),
        }
    }

    pub fn subscribe_problems(&self) -> Subscription<ProblemEvent> {
        self.problems.subscribe(None)
    }

    pub fn publish_problem(&self, event: ProblemEvent) {
        self.problems.publish(&event);
    }

    pub fn subscribe_solutions(&self, scope: SolutionScope) -> Subscription<SolutionEvent> {
        let key = match scope {
            SolutionScope::Team(team) => Some(team),
            SolutionScope::All => None,
        };
        self.solutions.subscribe(key)
    }

    pub fn publish_solution(&self, event: SolutionEvent) {
        self.solutions.publish_where(&event, |key| match key {
            Some(team) => *team == event.team_id,
            None => true,
        });
    }

    pub fn subscribe_times(&self) -> Subscription<TimeEvent> {
        self.times.subscribe(None)
    }

    pub fn publish_time(&self, event: TimeEvent) {
        self.times.publish(&event);
    }

    #[cfg(test)]
    fn solution_subscriber_count(&self) -> usize {
        self.solutions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::ProblemRow;
    use crate::events::SolutionKind;

    fn problem(id: &str) -> ProblemRow {
        ProblemRow {
            id: id.to_string(),
            body: String::new(),
            image: String::new(),
            position: 0,
            solution: 0,
        }
    }

    fn solution(team: &str, value: i64) -> SolutionEvent {
        SolutionEvent {
            kind: SolutionKind::Change,
            problem_id: "p1".to_string(),
            team_id: team.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_fanout_preserves_publish_order() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe_problems();
        let mut sub_b = bus.subscribe_problems();

        for id in ["p1", "p2", "p3"] {
            bus.publish_problem(ProblemEvent::Change { problem: problem(id) });
        }

        for sub in [&mut sub_a, &mut sub_b] {
            for expected in ["p1", "p2", "p3"] {
                match sub.recv().await.unwrap() {
                    ProblemEvent::Change { problem } => assert_eq!(problem.id, expected),
                    other => panic!("unexpected event: {:?}", other),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_solution_routing_key() {
        let bus = EventBus::new();
        let mut team_sub = bus.subscribe_solutions(SolutionScope::Team("t1".to_string()));
        let mut wildcard = bus.subscribe_solutions(SolutionScope::All);

        bus.publish_solution(solution("t1", 1));
        bus.publish_solution(solution("t2", 2));

        let event = team_sub.recv().await.unwrap();
        assert_eq!(event.value, 1);
        assert!(team_sub.try_recv().is_none());

        assert_eq!(wildcard.recv().await.unwrap().value, 1);
        assert_eq!(wildcard.recv().await.unwrap().value, 2);
    }

    #[tokio::test]
    async fn test_drop_detaches_subscriber() {
        let bus = EventBus::new();
        let sub = bus.subscribe_solutions(SolutionScope::All);
        assert_eq!(bus.solution_subscriber_count(), 1);

        drop(sub);
        assert_eq!(bus.solution_subscriber_count(), 0);

        // publishing to an empty topic is a no-op
        bus.publish_solution(solution("t1", 1));
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_disconnected() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe_solutions(SolutionScope::All);

        for i in 0..(SUBSCRIBER_BUFFER as i64 + 1) {
            bus.publish_solution(solution("t1", i));
        }

        // the overflowing publish dropped the subscriber from the topic
        assert_eq!(bus.solution_subscriber_count(), 0);

        // buffered events are still readable, then the channel reports
        // the disconnect
        for i in 0..SUBSCRIBER_BUFFER as i64 {
            assert_eq!(sub.recv().await.unwrap().value, i);
        }
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_skips_removed_subscriber() {
        let bus = EventBus::new();
        let mut keep = bus.subscribe_solutions(SolutionScope::All);
        let dropped = bus.subscribe_solutions(SolutionScope::All);
        drop(dropped);

        bus.publish_solution(solution("t1", 7));
        assert_eq!(keep.recv().await.unwrap().value, 7);
    }
}
