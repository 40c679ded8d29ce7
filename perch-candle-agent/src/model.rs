//! Trainable function approximator wrapper.
use crate::{
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Neural network module trained inside a [`NetModel`].
///
/// Implementations own their layers but not their variables; those live in
/// the [`VarMap`] behind the given [`VarBuilder`], which lets [`NetModel`]
/// persist and copy parameters without knowing the architecture.
pub trait SubModel {
    /// Configuration from which the module is built.
    type Config;

    /// Builds the module, registering its variables through `vb`.
    fn build(vb: VarBuilder, config: Self::Config) -> Self;

    /// Outputs a batched prediction for a batched input.
    fn forward(&self, input: &Tensor) -> Tensor;
}

/// Configuration of [`NetModel`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NetModelConfig<N>
where
    N: OutDim,
{
    pub(crate) net_config: Option<N>,
    pub(crate) opt_config: OptimizerConfig,
}

impl<N> Default for NetModelConfig<N>
where
    N: OutDim,
{
    fn default() -> Self {
        Self {
            net_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<N> NetModelConfig<N>
where
    N: DeserializeOwned + Serialize + OutDim,
{
    /// Sets the network configuration.
    pub fn net_config(mut self, v: N) -> Self {
        self.net_config = Some(v);
        self
    }

    /// Sets the output dimension of the network.
    pub fn out_dim(mut self, v: usize) -> Self {
        match &mut self.net_config {
            None => {}
            Some(net_config) => net_config.set_out_dim(v),
        };
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`NetModelConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`NetModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// A [`SubModel`] bundled with its variables and optimizer.
///
/// The agents treat this as an opaque trainable function: forward for
/// predictions, [`backward_step`](Self::backward_step) for one gradient
/// update, save/load for persistence via the underlying [`VarMap`].
pub struct NetModel<N>
where
    N: SubModel,
    N::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the output vector.
    pub(crate) out_dim: usize,

    net: N,

    opt_config: OptimizerConfig,
    net_config: N::Config,
    opt: Optimizer,
}

impl<N> NetModel<N>
where
    N: SubModel,
    N::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`NetModel`].
    pub fn build(config: NetModelConfig<N::Config>, device: Device) -> Result<Self> {
        let net_config = config.net_config.context("net_config is not set.")?;
        let out_dim = net_config.get_out_dim();
        let opt_config = config.opt_config;
        let varmap = VarMap::new();
        let net = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            N::build(vb, net_config.clone())
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            out_dim,
            net,
            opt_config,
            net_config,
            opt,
        })
    }

    /// Outputs the network's prediction for the given input.
    pub fn forward(&self, input: &Tensor) -> Tensor {
        self.net.forward(input)
    }

    /// Applies one gradient step on the given loss.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// The variables of the network.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the variables to a safetensors file.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save netmodel to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the variables from a safetensors file.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load netmodel from {:?}", path.as_ref());
        Ok(())
    }

    /// Checks that `path` holds a complete parameter set for this network
    /// without mutating any variable.
    ///
    /// Agents call this on every file of a multi-file parameter set before
    /// loading any of them, so a corrupt or mismatched file cannot leave a
    /// half-overwritten model behind.
    pub fn verify<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let tensors = candle_core::safetensors::load(&path, &self.device)?;
        let data = self.varmap.data().lock().unwrap();
        for (name, var) in data.iter() {
            let tensor = tensors
                .get(name)
                .with_context(|| format!("variable {} is missing in {:?}", name, path.as_ref()))?;
            if tensor.shape() != var.shape() {
                bail!(
                    "variable {} has shape {:?}, expected {:?}",
                    name,
                    tensor.shape(),
                    var.shape()
                );
            }
        }
        Ok(())
    }

    /// A freshly initialized model with the same architecture and optimizer.
    pub fn fresh(&self, device: Device) -> Result<Self> {
        let config = NetModelConfig {
            net_config: Some(self.net_config.clone()),
            opt_config: self.opt_config.clone(),
        };
        Self::build(config, device)
    }
}
