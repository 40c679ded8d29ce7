//! Configuration of [`Dqn`](super::Dqn) agent.
use super::EpsilonGreedy;
use crate::{
    model::NetModelConfig,
    opt::OptimizerConfig,
    util::OutDim,
    Device,
};
use anyhow::Result;
use perch_core::ExperienceBufferConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Dqn`](super::Dqn) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig<Q>
where
    Q: OutDim,
{
    /// Configuration of the action-value network and its optimizer.
    pub model_config: NetModelConfig<Q>,

    /// Configuration of the experience buffer.
    pub buffer_config: ExperienceBufferConfig,

    /// Exploration strategy.
    pub explorer: EpsilonGreedy,

    /// Number of gradient steps per training pass.
    pub n_updates_per_opt: usize,

    /// Minimum number of stored transitions before training starts.
    pub min_transitions_warmup: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// Number of training passes between hard target network syncs.
    pub sync_interval: usize,

    /// Device on which the networks live.
    pub device: Device,

    /// Seed of the exploration RNG.
    pub seed: u64,
}

impl<Q> Default for DqnConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            model_config: NetModelConfig::default(),
            buffer_config: ExperienceBufferConfig::default(),
            explorer: EpsilonGreedy::default(),
            n_updates_per_opt: 5,
            min_transitions_warmup: 64,
            batch_size: 64,
            discount_factor: 0.99,
            sync_interval: 10,
            device: Device::Cpu,
            seed: 42,
        }
    }
}

impl<Q> DqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Sets the network configuration.
    pub fn model_config(mut self, v: NetModelConfig<Q>) -> Self {
        self.model_config = v;
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.model_config = self.model_config.opt_config(v);
        self
    }

    /// Overrides the learning rate of the optimizer.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.model_config.opt_config = self.model_config.opt_config.clone().learning_rate(lr);
        self
    }

    /// Sets the experience buffer configuration.
    pub fn buffer_config(mut self, v: ExperienceBufferConfig) -> Self {
        self.buffer_config = v;
        self
    }

    /// Sets the exploration strategy.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the number of gradient steps per training pass.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Sets the warmup threshold.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the target sync interval.
    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Sets the seed of the exploration RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`DqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::MlpConfig;
    use tempdir::TempDir;

    #[test]
    fn yaml_roundtrip() {
        let dir = TempDir::new("perch-dqn-config").unwrap();
        let path = dir.path().join("dqn.yaml");

        let config = DqnConfig::<MlpConfig>::default()
            .model_config(NetModelConfig::default().net_config(MlpConfig::new(4, vec![32], 2)))
            .learning_rate(1e-4)
            .batch_size(128)
            .sync_interval(20);
        config.save(&path).unwrap();
        assert_eq!(DqnConfig::<MlpConfig>::load(&path).unwrap(), config);
    }
}
