//! In-process event fan-out
//!
//! Three typed topics (problems, solutions, times) connect the mutation
//! endpoints to the streaming endpoints. Subscriptions are ephemeral:
//! nothing survives a restart, and clients are expected to reconnect
//! and re-snapshot.

mod bus;
mod types;

pub use bus::{EventBus, SolutionScope, Subscription};
pub use types::{ProblemEvent, SolutionEvent, SolutionKind, TimeEvent};
