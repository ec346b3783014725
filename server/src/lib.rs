//! Backend for a timed, team-based mathematics competition.
//!
//! Clients authenticate with signed bearer tokens, form teams, and follow
//! the live competition through long-lived server-sent event streams fed
//! by an in-process event bus.

pub mod api;
mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod events;
pub mod utils;
