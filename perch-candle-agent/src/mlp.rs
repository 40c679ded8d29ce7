//! Multilayer perceptron.
mod base;
mod config;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

fn mlp_forward(xs: Tensor, layers: &[Linear]) -> Tensor {
    let (last, hidden) = layers.split_last().unwrap();
    let mut xs = xs;

    for layer in hidden {
        xs = layer.forward(&xs).unwrap().relu().unwrap();
    }

    last.forward(&xs).unwrap()
}
