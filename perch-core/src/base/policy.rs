//! Policy.
use super::{Obs, Push};

/// A policy mapping observations to actions.
///
/// The mapping can be either deterministic or stochastic.
pub trait Policy {
    /// Sample an action given an observation.
    fn sample(&mut self, obs: &Obs) -> Push;
}
