//! RL agents for perch implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The two learners required by the training session live here: [`Ppo`],
//! the on-policy clipped-surrogate actor-critic, and [`Dqn`], the
//! off-policy double-bootstrap value learner. Both are generic over a
//! [`SubModel`] function approximator and never inspect the network's
//! internals; [`Mlp`] is the bundled default.
//!
//! [`Ppo`]: ppo::Ppo
//! [`Dqn`]: dqn::Dqn
//! [`SubModel`]: model::SubModel
//! [`Mlp`]: mlp::Mlp
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod ppo;
pub mod util;
use serde::{Deserialize, Serialize};

/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support
/// serialization.
#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl From<Device> for candle_core::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => candle_core::Device::Cpu,
            Device::Cuda(n) => candle_core::Device::new_cuda(n).unwrap(),
        }
    }
}
