//! Cart-pole physics and shaped reward.
use super::CartPoleConfig;
use crate::base::{Obs, Push};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Physical state of the pendulum-cart system.
///
/// Owned exclusively by [`CartPoleEnv`]; mutated only through
/// [`CartPoleEnv::step`] and [`CartPoleEnv::reset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalState {
    /// Cart position.
    pub x: f32,

    /// Cart velocity.
    pub x_dot: f32,

    /// Pole angle in radians, 0 = perfectly vertical.
    pub theta: f32,

    /// Pole angular velocity.
    pub theta_dot: f32,
}

impl PhysicalState {
    fn zero() -> Self {
        Self {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
        }
    }
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the step.
    pub obs: Obs,

    /// Shaped reward, or -10 on failure.
    pub reward: f32,

    /// Whether the pole left the safe zone or the cart left the track.
    pub is_done: bool,
}

/// Cart-pole environment with a shaped reward.
///
/// The state advances under the standard coupled cart-pole equations with
/// forward Euler integration (velocities first, then positions) at a fixed
/// timestep. An external one-shot impulse can be injected with
/// [`CartPoleEnv::apply_force`]; it is combined additively with the push
/// force of the next step and cleared afterwards.
pub struct CartPoleEnv {
    config: CartPoleConfig,
    state: PhysicalState,
    external_force: f32,
    rng: StdRng,
}

impl CartPoleEnv {
    /// Builds an environment with a given random seed.
    ///
    /// A fixed seed and a fixed action sequence reproduce the exact same
    /// state trajectory.
    pub fn build(config: &CartPoleConfig, seed: u64) -> Self {
        Self {
            config: config.clone(),
            state: PhysicalState::zero(),
            external_force: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Read-only snapshot of the physical state.
    pub fn state(&self) -> &PhysicalState {
        &self.state
    }

    /// The state as a 4-element observation vector.
    pub fn observe(&self) -> Obs {
        [
            self.state.x,
            self.state.x_dot,
            self.state.theta,
            self.state.theta_dot,
        ]
    }

    /// Reinitializes the state with small uniform perturbations and clears
    /// the external force accumulator.
    pub fn reset(&mut self) -> Obs {
        let a = self.config.reset_amplitude;
        self.state = PhysicalState {
            x: self.rng.gen_range(-a..=a),
            x_dot: self.rng.gen_range(-a..=a),
            theta: self.rng.gen_range(-a..=a),
            theta_dot: self.rng.gen_range(-a..=a),
        };
        self.external_force = 0.0;
        self.observe()
    }

    /// Adds an impulse to the external force accumulator.
    ///
    /// The accumulated force is consumed exactly once by the next step.
    pub fn apply_force(&mut self, f: f32) {
        self.external_force += f;
    }

    /// Advances the physics by one timestep under the given action.
    pub fn step(&mut self, act: Push) -> StepOutcome {
        let c = &self.config;
        let force = act.force_sign() * c.force_mag + self.external_force;
        self.external_force = 0.0;

        let total_mass = c.cart_mass + c.pole_mass;
        let polemass_length = c.pole_mass * c.half_pole_length;
        let (sin_theta, cos_theta) = self.state.theta.sin_cos();

        let temp =
            (force + polemass_length * self.state.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (c.gravity * sin_theta - cos_theta * temp)
            / (c.half_pole_length
                * (4.0 / 3.0 - c.pole_mass * cos_theta.powi(2) / total_mass));
        let x_acc = temp - polemass_length * theta_acc * cos_theta / total_mass;

        // Forward Euler, velocities before positions.
        self.state.x_dot += c.tau * x_acc;
        self.state.x += c.tau * self.state.x_dot;
        self.state.theta_dot += c.tau * theta_acc;
        self.state.theta += c.tau * self.state.theta_dot;

        let (reward, is_done) = self.reward_and_done();

        StepOutcome {
            obs: self.observe(),
            reward,
            is_done,
        }
    }

    /// Shaped reward of the current state.
    ///
    /// The angle is converted to degrees relative to upright with 90 being
    /// perfectly vertical. The safe zone is 70..=139 degrees; leaving it or
    /// the track (`|x| >= x_bound`) terminates the episode with reward -10.
    /// Within the safe zone the reward grows towards 5.0 as the pole is
    /// more upright and the cart closer to center; positions beyond
    /// `edge_bound` take a flat penalty of 2.0 to discourage edge-hugging.
    fn reward_and_done(&self) -> (f32, bool) {
        let degrees = self.state.theta.to_degrees() + 90.0;
        let safe = (70.0..=139.0).contains(&degrees);
        let in_bounds =
            self.state.x > -self.config.x_bound && self.state.x < self.config.x_bound;

        if !safe || !in_bounds {
            return (-10.0, true);
        }

        let angle_error = (degrees - 90.0).abs() / 49.0;
        let position_error = self.state.x.abs() / self.config.x_bound;
        let mut reward = 1.0 + 2.0 * (1.0 - angle_error) + 2.0 * (1.0 - position_error);
        if self.state.x.abs() > self.config.edge_bound {
            reward -= 2.0;
        }

        (reward, false)
    }
}
