//! Epsilon-greedy exploration.
use crate::util::argmax_action;
use candle_core::Tensor;
use perch_core::Push;
use rand::{rngs::SmallRng, Rng};
use serde::{Deserialize, Serialize};

/// Epsilon-greedy action selection with multiplicative decay.
///
/// Epsilon decays once per training pass, not per action, so the
/// exploration schedule follows learning progress rather than wall time.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    eps: f64,
    eps_final: f64,
    eps_decay: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            eps: 1.0,
            eps_final: 0.01,
            eps_decay: 0.995,
        }
    }
}

impl EpsilonGreedy {
    /// Takes an action based on action values.
    ///
    /// * `a` - action values of shape `[1, n_actions]`.
    pub fn action(&self, a: &Tensor, rng: &mut SmallRng) -> Push {
        if rng.gen::<f64>() < self.eps {
            let n_actions = a.dims()[1];
            Push::from_index(rng.gen_range(0..n_actions)).unwrap()
        } else {
            argmax_action(a).unwrap()
        }
    }

    /// Applies one multiplicative decay step, clamped at the floor.
    pub fn decay(&mut self) {
        self.eps = (self.eps * self.eps_decay).max(self.eps_final);
    }

    /// Current exploration rate.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Sets the initial epsilon value.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps = v;
        self
    }

    /// Sets the epsilon floor.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Sets the multiplicative decay factor.
    pub fn eps_decay(mut self, v: f64) -> Self {
        self.eps_decay = v;
        self
    }
}
