//! Core types and traits.
mod agent;
mod policy;
mod transition;
pub use agent::Agent;
pub use policy::Policy;
pub use transition::{Obs, Push, Trajectory, Transition};
