//! Cart-pole environment.
mod base;
mod config;
pub use base::{CartPoleEnv, PhysicalState, StepOutcome};
pub use config::CartPoleConfig;
