//! Clipped-surrogate actor-critic agent.
use super::{config::PpoConfig, gae::gae};
use crate::{
    model::{NetModel, SubModel},
    util::{act_batch_to_tensor, argmax_action, obs_batch_to_tensor, obs_to_tensor, OutDim},
};
use anyhow::{bail, Result};
use candle_core::{shape::D, Device, Tensor};
use candle_nn::{loss::mse, ops::softmax};
use perch_core::{
    record::{Record, RecordValue},
    Agent, Obs, Policy, Push, Trajectory,
};
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// The pessimistic surrogate objective, elementwise over a trajectory.
///
/// Takes the minimum of the raw importance-weighted advantage and the
/// advantage weighted by the ratio clamped into `[1 - eps, 1 + eps]`, so a
/// single training pass cannot move the policy far from the one that
/// collected the data.
fn clipped_surrogate(
    ratio: &Tensor,
    advantage: &Tensor,
    clip_eps: f64,
) -> Result<Tensor, candle_core::Error> {
    let unclipped = (ratio * advantage)?;
    let clipped = (ratio.clamp(1.0 - clip_eps, 1.0 + clip_eps)? * advantage)?;
    unclipped.minimum(&clipped)
}

/// On-policy actor-critic trained on whole episodes.
///
/// Each training pass consumes exactly one trajectory: advantages come from
/// [`gae`] over the critic's value estimates, the action probabilities at
/// collection time are frozen, and both networks then take one gradient
/// step per epoch on the same data. The policy and value networks form one
/// logical parameter set and are saved and loaded together.
pub struct Ppo<P, V>
where
    P: SubModel,
    V: SubModel,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    pub(in crate::ppo) policy: NetModel<P>,
    pub(in crate::ppo) value: NetModel<V>,
    pub(in crate::ppo) discount_factor: f64,
    pub(in crate::ppo) gae_lambda: f64,
    pub(in crate::ppo) clip_eps: f64,
    pub(in crate::ppo) opt_epochs: usize,
    pub(in crate::ppo) train: bool,
    pub(in crate::ppo) device: Device,
    rng: SmallRng,
}

impl<P, V> Ppo<P, V>
where
    P: SubModel,
    V: SubModel,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs the agent.
    pub fn build(config: PpoConfig<P::Config, V::Config>) -> Result<Self> {
        let device: Device = config.device.into();
        let policy = NetModel::build(config.policy_model_config, device.clone())?;
        let value = NetModel::build(config.value_model_config, device.clone())?;

        Ok(Self {
            policy,
            value,
            discount_factor: config.discount_factor,
            gae_lambda: config.gae_lambda,
            clip_eps: config.clip_eps,
            opt_epochs: config.opt_epochs,
            train: true,
            device,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    fn state_values(&self, obs: &Tensor) -> Vec<f32> {
        self.value
            .forward(obs)
            .squeeze(D::Minus1)
            .unwrap()
            .to_vec1()
            .unwrap()
    }

    fn opt_(&mut self, trajectory: &Trajectory) -> Record {
        let n = trajectory.len();
        let obs: Vec<Obs> = trajectory.iter().map(|tr| tr.obs).collect();
        let next_obs: Vec<Obs> = trajectory.iter().map(|tr| tr.next_obs).collect();
        let act: Vec<Push> = trajectory.iter().map(|tr| tr.act).collect();
        let rewards: Vec<f32> = trajectory.iter().map(|tr| tr.reward).collect();
        let dones: Vec<bool> = trajectory.iter().map(|tr| tr.is_done).collect();

        let obs = obs_batch_to_tensor(&obs, &self.device).unwrap();
        let next_obs = obs_batch_to_tensor(&next_obs, &self.device).unwrap();
        let act = act_batch_to_tensor(&act, &self.device).unwrap();

        let values = self.state_values(&obs);
        let next_values = self.state_values(&next_obs);
        let (advantages, returns) = gae(
            &rewards,
            &values,
            &next_values,
            &dones,
            self.discount_factor as f32,
            self.gae_lambda as f32,
        );
        let advantages = Tensor::from_slice(&advantages[..], (n,), &self.device).unwrap();
        let returns = Tensor::from_slice(&returns[..], (n,), &self.device).unwrap();

        // Action probabilities under the policy that collected the episode.
        let old_probs = softmax(&self.policy.forward(&obs), D::Minus1)
            .unwrap()
            .gather(&act, D::Minus1)
            .unwrap()
            .squeeze(D::Minus1)
            .unwrap()
            .detach();

        let mut loss_actor = 0f32;
        let mut loss_critic = 0f32;

        for _ in 0..self.opt_epochs {
            let probs = softmax(&self.policy.forward(&obs), D::Minus1)
                .unwrap()
                .gather(&act, D::Minus1)
                .unwrap()
                .squeeze(D::Minus1)
                .unwrap();
            let ratio = (probs / &old_probs).unwrap();
            let surrogate = clipped_surrogate(&ratio, &advantages, self.clip_eps).unwrap();
            let loss_a = surrogate.mean_all().unwrap().neg().unwrap();
            self.policy.backward_step(&loss_a).unwrap();

            let pred = self.value.forward(&obs).squeeze(D::Minus1).unwrap();
            let loss_c = mse(&pred, &returns).unwrap();
            self.value.backward_step(&loss_c).unwrap();

            loss_actor = loss_a.to_scalar().unwrap();
            loss_critic = loss_c.to_scalar().unwrap();
        }

        Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor)),
            ("loss_critic", RecordValue::Scalar(loss_critic)),
        ])
    }
}

impl<P, V> Policy for Ppo<P, V>
where
    P: SubModel,
    V: SubModel,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Samples from the action distribution in training mode, takes the
    /// mode in evaluation mode.
    fn sample(&mut self, obs: &Obs) -> Push {
        let obs = obs_to_tensor(obs, &self.device).unwrap();
        let logits = self.policy.forward(&obs);

        if self.train {
            let probs = softmax(&logits, D::Minus1)
                .unwrap()
                .to_vec2::<f32>()
                .unwrap();
            let ix = self.rng.sample(WeightedIndex::new(&probs[0]).unwrap());
            Push::from_index(ix).unwrap()
        } else {
            argmax_action(&logits).unwrap()
        }
    }
}

impl<P, V> Agent for Ppo<P, V>
where
    P: SubModel,
    V: SubModel,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn update(&mut self, trajectory: Trajectory) -> Option<Record> {
        if trajectory.is_empty() {
            return None;
        }
        Some(self.opt_(&trajectory))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.policy.save(path.join("policy.safetensors"))?;
        self.value.save(path.join("value.safetensors"))?;
        Ok(())
    }

    /// Loads the actor-critic pair as one unit; nothing is overwritten
    /// unless both parameter files are present, readable and complete.
    fn load_params(&mut self, path: &Path) -> Result<()> {
        let policy_file = path.join("policy.safetensors");
        let value_file = path.join("value.safetensors");
        if !policy_file.is_file() || !value_file.is_file() {
            bail!("incomplete parameter set in {:?}", path);
        }
        self.policy.verify(&policy_file)?;
        self.value.verify(&value_file)?;
        self.policy.load(&policy_file)?;
        self.value.load(&value_file)?;
        Ok(())
    }
}
