#![forbid(unsafe_code)]

//! Assignment progression and availability engine.
//!
//! Everything here is a pure function of a curriculum snapshot, learner
//! answers and an evaluation instant. Nothing is cached between calls.

pub mod aggregate;
pub mod eligibility;
pub mod journey;
pub mod leaderboard;
pub mod model;
pub mod overview;
pub mod progress;
pub mod temporal;
pub mod time;

pub use time::Clock;
