#![warn(missing_docs)]
//! Core of the perch cart-pole balancing trainer.
//!
//! This crate owns everything that does not depend on a tensor backend:
//! the physics environment ([`CartPoleEnv`]), the transition types, the
//! experience buffer used by off-policy learning, the training session
//! state machine ([`TrainingSession`]) and the model persistence contract
//! ([`ModelStore`]). Learning agents implement the [`Policy`] and [`Agent`]
//! traits and live in a backend crate (`perch-candle-agent`).

pub mod error;
pub mod record;
pub use error::PerchError;

mod base;
pub use base::{Agent, Obs, Policy, Push, Trajectory, Transition};

mod env;
pub use env::{CartPoleConfig, CartPoleEnv, PhysicalState, StepOutcome};

mod replay;
pub use replay::{ExperienceBuffer, ExperienceBufferConfig};

mod session;
pub use session::{
    ControlMode, EpisodeStats, LearningMode, SessionConfig, SessionState, Speed, TickOutcome,
    TrainingSession,
};

mod store;
pub use store::ModelStore;
