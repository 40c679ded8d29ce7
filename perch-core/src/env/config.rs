//! Configuration of the cart-pole environment.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`CartPoleEnv`](super::CartPoleEnv).
///
/// The defaults are the classic cart-pole constants: gravity 9.8, cart mass
/// 1.0, pole mass 0.1, half pole length 0.5, force magnitude 10.0 and a
/// fixed integration timestep of 0.02 seconds.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CartPoleConfig {
    /// Gravitational acceleration.
    pub gravity: f32,

    /// Mass of the cart.
    pub cart_mass: f32,

    /// Mass of the pole.
    pub pole_mass: f32,

    /// Half of the pole length.
    pub half_pole_length: f32,

    /// Magnitude of the force applied by a push action.
    pub force_mag: f32,

    /// Integration timestep in seconds.
    pub tau: f32,

    /// The episode fails when `|x| >= x_bound`.
    pub x_bound: f32,

    /// Positions with `|x| > edge_bound` incur a flat reward penalty.
    pub edge_bound: f32,

    /// Amplitude of the uniform perturbation applied on reset.
    pub reset_amplitude: f32,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            cart_mass: 1.0,
            pole_mass: 0.1,
            half_pole_length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            x_bound: 2.4,
            edge_bound: 1.5,
            reset_amplitude: 0.05,
        }
    }
}

impl CartPoleConfig {
    /// Sets the force magnitude of a push action.
    pub fn force_mag(mut self, v: f32) -> Self {
        self.force_mag = v;
        self
    }

    /// Sets the integration timestep.
    pub fn tau(mut self, v: f32) -> Self {
        self.tau = v;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
