//! Tensor utilities shared by the agents.
use anyhow::{Context, Result};
use candle_core::{shape::D, DType, Device, Tensor};
use candle_nn::VarMap;
use perch_core::{Obs, Push};
use std::convert::TryFrom;

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// Overwrites `dest`'s variables with `src`'s.
///
/// Variables are identified by their names; both varmaps must hold the same
/// architecture.
pub fn copy_params(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = dest.data().lock().unwrap();
    let src = src.data().lock().unwrap();

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .with_context(|| format!("variable {} is missing in source", k_dest))?;
        v_dest.set(v_src.as_tensor())?;
    }

    Ok(())
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let device = x.device();
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?.to_device(&device)?;
    let m2 = Tensor::try_from(1f32)?
        .to_device(&device)?
        .broadcast_sub(&m1)?;
    (((0.5 * m1)? * d.powf(2.0)?)? + m2 * (d - 0.5)?)?.mean_all()
}

/// A single observation as a `[1, 4]` batch tensor.
pub fn obs_to_tensor(obs: &Obs, device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_slice(&obs[..], (1, obs.len()), device)?)
}

/// A batch of observations as an `[n, 4]` tensor.
pub fn obs_batch_to_tensor(obs: &[Obs], device: &Device) -> Result<Tensor> {
    let n = obs.len();
    let flat = obs.iter().flatten().copied().collect::<Vec<f32>>();
    Ok(Tensor::from_slice(&flat[..], (n, flat.len() / n.max(1)), device)?)
}

/// A batch of action indices as an `[n, 1]` u32 tensor, for `gather`.
pub fn act_batch_to_tensor(acts: &[Push], device: &Device) -> Result<Tensor> {
    let ixs = acts.iter().map(|a| a.index() as u32).collect::<Vec<_>>();
    Ok(Tensor::from_slice(&ixs[..], (acts.len(), 1), device)?)
}

/// The greedy action of a `[1, n_actions]` prediction.
pub fn argmax_action(a: &Tensor) -> Result<Push> {
    let ix = a
        .argmax(D::Minus1)?
        .flatten_all()?
        .to_vec1::<u32>()?[0] as usize;
    Push::from_index(ix).context("action index out of range")
}
