//! Configuration of [`Ppo`](super::Ppo) agent.
use crate::{model::NetModelConfig, util::OutDim, Device};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Ppo`](super::Ppo) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig<P, V>
where
    P: OutDim,
    V: OutDim,
{
    /// Configuration of the policy network and its optimizer.
    pub policy_model_config: NetModelConfig<P>,

    /// Configuration of the value network and its optimizer.
    pub value_model_config: NetModelConfig<V>,

    /// Discount factor.
    pub discount_factor: f64,

    /// Decay of the advantage recursion.
    pub gae_lambda: f64,

    /// Width of the probability-ratio clip band around 1.
    pub clip_eps: f64,

    /// Number of optimization epochs over the trajectory per training pass.
    pub opt_epochs: usize,

    /// Device on which the networks live.
    pub device: Device,

    /// Seed of the action sampling RNG.
    pub seed: u64,
}

impl<P, V> Default for PpoConfig<P, V>
where
    P: OutDim,
    V: OutDim,
{
    fn default() -> Self {
        Self {
            policy_model_config: NetModelConfig::default(),
            value_model_config: NetModelConfig::default(),
            discount_factor: 0.99,
            gae_lambda: 0.95,
            clip_eps: 0.2,
            opt_epochs: 10,
            device: Device::Cpu,
            seed: 42,
        }
    }
}

impl<P, V> PpoConfig<P, V>
where
    P: DeserializeOwned + Serialize + OutDim + Clone,
    V: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Sets the policy network configuration.
    pub fn policy_model_config(mut self, v: NetModelConfig<P>) -> Self {
        self.policy_model_config = v;
        self
    }

    /// Sets the value network configuration.
    pub fn value_model_config(mut self, v: NetModelConfig<V>) -> Self {
        self.value_model_config = v;
        self
    }

    /// Overrides the learning rate of both optimizers.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.policy_model_config.opt_config =
            self.policy_model_config.opt_config.clone().learning_rate(lr);
        self.value_model_config.opt_config =
            self.value_model_config.opt_config.clone().learning_rate(lr);
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the decay of the advantage recursion.
    pub fn gae_lambda(mut self, v: f64) -> Self {
        self.gae_lambda = v;
        self
    }

    /// Sets the clip band width.
    pub fn clip_eps(mut self, v: f64) -> Self {
        self.clip_eps = v;
        self
    }

    /// Sets the number of optimization epochs per training pass.
    pub fn opt_epochs(mut self, v: usize) -> Self {
        self.opt_epochs = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Sets the seed of the action sampling RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`PpoConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PpoConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
