//! Observations, actions and transitions.
use serde::{Deserialize, Serialize};

/// Observation of the cart-pole state: `[x, x_velocity, angle, angle_velocity]`.
///
/// The angle is in radians, measured from upright (0 = perfectly vertical).
pub type Obs = [f32; 4];

/// Discrete action: push the cart to the left or to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Push {
    /// Push the cart to the left.
    Left,

    /// Push the cart to the right.
    Right,
}

impl Push {
    /// Index of the action in the network output, in {0, 1}.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Action corresponding to an output index.
    pub fn from_index(ix: usize) -> Option<Self> {
        match ix {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    /// Sign of the force applied to the cart.
    pub fn force_sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// A single environment transition `(o_t, a_t, r_t, o_t+1, done)`.
///
/// Immutable once created. Produced by the session per step and consumed
/// exactly once by an agent, either as part of a trajectory (on-policy) or
/// by insertion into an [`ExperienceBuffer`](crate::ExperienceBuffer)
/// (off-policy).
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observation before the step.
    pub obs: Obs,

    /// Action taken.
    pub act: Push,

    /// Reward received.
    pub reward: f32,

    /// Observation after the step.
    pub next_obs: Obs,

    /// Whether the episode ended with this step.
    pub is_done: bool,
}

/// Ordered transitions of exactly one episode.
pub type Trajectory = Vec<Transition>;
