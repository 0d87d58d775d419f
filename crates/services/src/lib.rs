#![forbid(unsafe_code)]

pub mod authoring_service;
pub mod error;
pub mod journey_service;
pub mod leaderboard_service;
pub mod overview_service;
pub mod submission_service;

pub use journey_core::Clock;

pub use authoring_service::AuthoringService;
pub use error::{AuthoringError, JourneyError, SubmissionError};
pub use journey_service::JourneyService;
pub use leaderboard_service::LeaderboardService;
pub use overview_service::OverviewService;
pub use submission_service::SubmissionService;
