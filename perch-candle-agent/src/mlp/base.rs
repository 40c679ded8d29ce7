use super::{mlp_forward, MlpConfig};
use crate::model::SubModel;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
///
/// Empty `units` yields a single input-to-output linear layer.
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let dims: Vec<usize> = std::iter::once(config.in_dim)
        .chain(config.units.iter().copied())
        .chain(std::iter::once(config.out_dim))
        .collect();
    let vs = vs.pp(prefix);

    Ok(dims
        .windows(2)
        .enumerate()
        .map(|(i, pair)| linear(pair[0], pair[1], vs.pp(format!("ln{}", i))).unwrap())
        .collect())
}

/// Multilayer perceptron with ReLU activation function.
pub struct Mlp {
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel for Mlp {
    type Config = MlpConfig;

    fn build(vs: VarBuilder, config: Self::Config) -> Self {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config).unwrap();

        Mlp { device, layers }
    }

    fn forward(&self, xs: &Tensor) -> Tensor {
        let xs = xs.to_device(&self.device).unwrap();
        mlp_forward(xs, &self.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn output_shape_follows_config() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let mlp = Mlp::build(vb, MlpConfig::new(4, vec![16, 16], 2));

        let input = Tensor::zeros((5, 4), DType::F32, &device).unwrap();
        let out = mlp.forward(&input);
        assert_eq!(out.dims(), &[5, 2]);
    }

    #[test]
    fn no_hidden_units_builds_a_single_linear_layer() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let mlp = Mlp::build(vb, MlpConfig::new(4, vec![], 2));
        assert_eq!(mlp.layers.len(), 1);

        let input = Tensor::zeros((3, 4), DType::F32, &device).unwrap();
        assert_eq!(mlp.forward(&input).dims(), &[3, 2]);
    }
}
