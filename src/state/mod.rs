//! Shared crawl state: per-domain accounting, run phase, dynamic inbox

mod fetch_controller;
mod inbox;
mod run_state;

pub use fetch_controller::{DomainSnapshot, FetchController};
pub use inbox::DomainInbox;
pub use run_state::{RunPhase, RunState};
