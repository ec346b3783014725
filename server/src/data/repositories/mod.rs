//! Repositories, one per collection

pub mod history;
pub mod info;
pub mod password_resets;
pub mod problems;
pub mod solutions;
pub mod teams;
pub mod users;
