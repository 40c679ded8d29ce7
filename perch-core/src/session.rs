//! Training session: the simulate-collect-train loop.
mod base;
mod config;
mod mode;
mod stats;
pub use base::TrainingSession;
pub use config::SessionConfig;
pub use mode::{ControlMode, LearningMode, SessionState, Speed, TickOutcome};
pub use stats::EpisodeStats;
