//! Double DQN agent.
use super::{config::DqnConfig, explorer::EpsilonGreedy};
use crate::{
    model::{NetModel, SubModel},
    util::{
        act_batch_to_tensor, argmax_action, copy_params, obs_batch_to_tensor, obs_to_tensor,
        smooth_l1_loss, OutDim,
    },
};
use anyhow::{bail, Result};
use candle_core::{shape::D, Device, Tensor};
use perch_core::{
    record::{Record, RecordValue},
    Agent, ExperienceBuffer, Obs, Policy, Push, Trajectory, Transition,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Value-based agent with a replay buffer and a periodically synced
/// target network.
///
/// Incoming trajectories are flattened into the buffer; each training pass
/// then runs a fixed number of gradient steps on uniformly sampled batches.
/// Bootstrap targets use the double estimator: the online network selects
/// the next action, the target network evaluates it. The target network is
/// overwritten with the online parameters every `sync_interval` passes.
pub struct Dqn<Q>
where
    Q: SubModel,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    pub(in crate::dqn) qnet: NetModel<Q>,
    pub(in crate::dqn) qnet_tgt: NetModel<Q>,
    pub(in crate::dqn) buffer: ExperienceBuffer,
    pub(in crate::dqn) explorer: EpsilonGreedy,
    pub(in crate::dqn) n_updates_per_opt: usize,
    pub(in crate::dqn) min_transitions_warmup: usize,
    pub(in crate::dqn) batch_size: usize,
    pub(in crate::dqn) discount_factor: f64,
    pub(in crate::dqn) sync_interval: usize,
    pub(in crate::dqn) sync_counter: usize,
    pub(in crate::dqn) train: bool,
    pub(in crate::dqn) device: Device,
    rng: SmallRng,
}

impl<Q> Dqn<Q>
where
    Q: SubModel,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs the agent; the target network starts as an exact copy of
    /// the online network.
    pub fn build(config: DqnConfig<Q::Config>) -> Result<Self> {
        let device: Device = config.device.into();
        let qnet = NetModel::build(config.model_config, device.clone())?;
        let qnet_tgt = qnet.fresh(device.clone())?;
        copy_params(qnet_tgt.get_varmap(), qnet.get_varmap())?;
        let buffer = ExperienceBuffer::build(&config.buffer_config);

        Ok(Self {
            qnet,
            qnet_tgt,
            buffer,
            explorer: config.explorer,
            n_updates_per_opt: config.n_updates_per_opt,
            min_transitions_warmup: config.min_transitions_warmup,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            sync_interval: config.sync_interval,
            sync_counter: 0,
            train: true,
            device,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    /// Current exploration rate.
    pub fn eps(&self) -> f64 {
        self.explorer.eps()
    }

    /// Number of transitions currently stored in the replay buffer.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bootstrap targets `r + gamma * Q_tgt(o', argmax_a Q(o', a))` of a
    /// batch, with the bootstrap term dropped on terminal transitions.
    fn bootstrap_targets(&self, batch: &[Transition]) -> Tensor {
        let n = batch.len();
        let next_obs: Vec<Obs> = batch.iter().map(|tr| tr.next_obs).collect();
        let reward: Vec<f32> = batch.iter().map(|tr| tr.reward).collect();
        let is_not_done: Vec<f32> = batch
            .iter()
            .map(|tr| if tr.is_done { 0.0 } else { 1.0 })
            .collect();

        let next_obs = obs_batch_to_tensor(&next_obs, &self.device).unwrap();
        let reward = Tensor::from_slice(&reward[..], (n,), &self.device).unwrap();
        let is_not_done = Tensor::from_slice(&is_not_done[..], (n,), &self.device).unwrap();

        let q = {
            let sel = self
                .qnet
                .forward(&next_obs)
                .argmax_keepdim(D::Minus1)
                .unwrap();
            self.qnet_tgt
                .forward(&next_obs)
                .gather(&sel, D::Minus1)
                .unwrap()
                .squeeze(D::Minus1)
                .unwrap()
        };

        (reward + is_not_done * self.discount_factor * q)
            .unwrap()
            .detach()
    }

    fn update_critic(&mut self, batch: &[Transition]) -> f32 {
        let obs: Vec<Obs> = batch.iter().map(|tr| tr.obs).collect();
        let act: Vec<Push> = batch.iter().map(|tr| tr.act).collect();
        let obs = obs_batch_to_tensor(&obs, &self.device).unwrap();
        let act = act_batch_to_tensor(&act, &self.device).unwrap();

        let pred = self
            .qnet
            .forward(&obs)
            .gather(&act, D::Minus1)
            .unwrap()
            .squeeze(D::Minus1)
            .unwrap();
        let tgt = self.bootstrap_targets(batch);

        let loss = smooth_l1_loss(&pred, &tgt).unwrap();
        self.qnet.backward_step(&loss).unwrap();

        loss.to_scalar::<f32>().unwrap()
    }

    fn opt_(&mut self) -> Record {
        let mut loss_critic = 0f32;

        for _ in 0..self.n_updates_per_opt {
            let batch = self.buffer.sample(self.batch_size).unwrap();
            loss_critic += self.update_critic(&batch);
        }

        self.sync_counter += 1;
        if self.sync_counter == self.sync_interval {
            self.sync_counter = 0;
            let _ = copy_params(self.qnet_tgt.get_varmap(), self.qnet.get_varmap());
        }

        self.explorer.decay();
        loss_critic /= self.n_updates_per_opt as f32;

        Record::from_slice(&[
            ("loss_critic", RecordValue::Scalar(loss_critic)),
            ("eps", RecordValue::Scalar(self.explorer.eps() as f32)),
        ])
    }
}

impl<Q> Policy for Dqn<Q>
where
    Q: SubModel,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    fn sample(&mut self, obs: &Obs) -> Push {
        let obs = obs_to_tensor(obs, &self.device).unwrap();
        let q = self.qnet.forward(&obs);
        if self.train {
            self.explorer.action(&q, &mut self.rng)
        } else {
            argmax_action(&q).unwrap()
        }
    }
}

impl<Q> Agent for Dqn<Q>
where
    Q: SubModel,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
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

    /// Absorbs the trajectory into the replay buffer, then trains if warmup
    /// is over. Epsilon only decays when a training pass actually runs.
    fn update(&mut self, trajectory: Trajectory) -> Option<Record> {
        for tr in trajectory {
            self.buffer.push(tr);
        }

        if self.buffer.len() >= self.min_transitions_warmup {
            Some(self.opt_())
        } else {
            None
        }
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.qnet.save(path.join("qnet.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let file = path.join("qnet.safetensors");
        if !file.is_file() {
            bail!("missing parameter file {:?}", file);
        }
        self.qnet.verify(&file)?;
        self.qnet.load(&file)?;
        copy_params(self.qnet_tgt.get_varmap(), self.qnet.get_varmap())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Mlp, MlpConfig},
        model::NetModelConfig,
    };
    use candle_nn::VarMap;
    use tempdir::TempDir;

    fn config() -> DqnConfig<MlpConfig> {
        let model_config =
            NetModelConfig::default().net_config(MlpConfig::new(4, vec![8], 2));
        DqnConfig::default()
            .model_config(model_config)
            .min_transitions_warmup(4)
            .batch_size(4)
            .n_updates_per_opt(2)
    }

    fn transition(reward: f32, is_done: bool) -> Transition {
        Transition {
            obs: [0.1, 0.0, 0.05, 0.0],
            act: Push::Right,
            reward,
            next_obs: [0.2, 0.1, 0.04, -0.1],
            is_done,
        }
    }

    fn varmap_flat(varmap: &VarMap) -> Vec<f32> {
        let data = varmap.data().lock().unwrap();
        let mut keys: Vec<_> = data.keys().cloned().collect();
        keys.sort();
        keys.iter()
            .flat_map(|k| {
                data[k]
                    .as_tensor()
                    .flatten_all()
                    .unwrap()
                    .to_vec1::<f32>()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn terminal_transitions_do_not_bootstrap() {
        let agent = Dqn::<Mlp>::build(config()).unwrap();
        let tgt = agent.bootstrap_targets(&[transition(-10.0, true)]);
        assert_eq!(tgt.to_vec1::<f32>().unwrap(), vec![-10.0]);
    }

    #[test]
    fn zero_discount_reduces_targets_to_rewards() {
        let agent = Dqn::<Mlp>::build(config().discount_factor(0.0)).unwrap();
        let tgt = agent.bootstrap_targets(&[transition(3.5, false)]);
        assert_eq!(tgt.to_vec1::<f32>().unwrap(), vec![3.5]);
    }

    #[test]
    fn warmup_skips_training_and_keeps_eps() {
        let mut agent = Dqn::<Mlp>::build(config().min_transitions_warmup(64)).unwrap();
        let record = agent.update(vec![transition(1.0, false); 3]);

        assert!(record.is_none());
        assert_eq!(agent.buffer_len(), 3);
        assert_eq!(agent.eps(), 1.0);
    }

    #[test]
    fn training_pass_decays_eps_and_reports_loss() {
        let mut agent = Dqn::<Mlp>::build(config()).unwrap();
        let record = agent.update(vec![transition(1.0, false); 8]).unwrap();

        assert!(record.get_scalar("loss_critic").is_some());
        assert!(record.get_scalar("eps").is_some());
        assert_eq!(agent.eps(), 0.995);
    }

    #[test]
    fn target_syncs_every_interval() {
        let mut agent = Dqn::<Mlp>::build(config().sync_interval(2)).unwrap();
        agent.update(vec![transition(1.0, false); 8]).unwrap();
        assert_ne!(
            varmap_flat(agent.qnet.get_varmap()),
            varmap_flat(agent.qnet_tgt.get_varmap())
        );

        agent.update(vec![transition(1.0, false); 8]).unwrap();
        assert_eq!(
            varmap_flat(agent.qnet.get_varmap()),
            varmap_flat(agent.qnet_tgt.get_varmap())
        );
    }

    #[test]
    fn load_resyncs_the_target_network() {
        let dir = TempDir::new("perch-dqn").unwrap();
        let mut agent = Dqn::<Mlp>::build(config().sync_interval(1000)).unwrap();
        agent.update(vec![transition(1.0, false); 8]).unwrap();
        agent.save_params(dir.path()).unwrap();

        let mut loaded = Dqn::<Mlp>::build(config()).unwrap();
        loaded.load_params(dir.path()).unwrap();

        let online = varmap_flat(loaded.qnet.get_varmap());
        assert_eq!(online, varmap_flat(agent.qnet.get_varmap()));
        assert_eq!(online, varmap_flat(loaded.qnet_tgt.get_varmap()));
    }

    #[test]
    fn corrupt_parameter_file_is_rejected_untouched() {
        let dir = TempDir::new("perch-dqn").unwrap();
        let agent = Dqn::<Mlp>::build(config()).unwrap();
        agent.save_params(dir.path()).unwrap();
        std::fs::write(dir.path().join("qnet.safetensors"), b"garbage").unwrap();

        let mut loaded = Dqn::<Mlp>::build(config()).unwrap();
        let online_before = varmap_flat(loaded.qnet.get_varmap());
        let target_before = varmap_flat(loaded.qnet_tgt.get_varmap());

        assert!(loaded.load_params(dir.path()).is_err());
        assert_eq!(varmap_flat(loaded.qnet.get_varmap()), online_before);
        assert_eq!(varmap_flat(loaded.qnet_tgt.get_varmap()), target_before);
    }

    #[test]
    fn load_from_empty_dir_fails_without_touching_params() {
        let dir = TempDir::new("perch-dqn").unwrap();
        let mut agent = Dqn::<Mlp>::build(config()).unwrap();
        let before = varmap_flat(agent.qnet.get_varmap());

        assert!(agent.load_params(dir.path()).is_err());
        assert_eq!(varmap_flat(agent.qnet.get_varmap()), before);
    }
}
