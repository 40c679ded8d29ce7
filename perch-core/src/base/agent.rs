//! Agent.
use super::{Policy, Trajectory};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// A trainable policy.
///
/// The session hands an agent the transitions of each completed episode
/// through [`Agent::update`]. An on-policy agent consumes the trajectory
/// directly and discards it; an off-policy agent ingests the transitions
/// into its replay buffer and samples minibatches from there.
pub trait Agent: Policy {
    /// Set the agent to training mode.
    fn train(&mut self);

    /// Set the agent to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs one training pass on the transitions of a completed episode.
    ///
    /// Returns `None` when the agent skipped the pass, for example during
    /// the warmup period of a replay buffer. Skipping is not an error.
    fn update(&mut self, trajectory: Trajectory) -> Option<Record>;

    /// Save the parameters of the agent in the given directory.
    ///
    /// This method commonly creates a number of files consisting the agent
    /// in the directory. For example, the actor-critic agent saves its
    /// policy and value networks as two files forming one logical unit.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    ///
    /// Implementations must not partially overwrite live parameters: when
    /// loading fails, the in-memory parameters are left unchanged.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
