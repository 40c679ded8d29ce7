//! The training session state machine.
use super::{
    ControlMode, EpisodeStats, LearningMode, SessionConfig, SessionState, Speed, TickOutcome,
};
use crate::{
    base::{Agent, Push, Trajectory, Transition},
    env::{CartPoleConfig, CartPoleEnv},
    error::PerchError,
    record::{Record, RecordValue},
    store::ModelStore,
};
use anyhow::{bail, Result};
use log::info;

/// Signal of a single inner step, used to break the per-tick repetition
/// loop explicitly rather than by observing counter resets.
enum StepSignal {
    Continue,
    EpisodeEnded,
    TrainingRequested,
}

/// Drives the simulate → collect → train → reset loop.
///
/// The host environment is single-threaded and cooperative: it calls
/// [`TrainingSession::tick`] at its own cadence (nominally 60 times per
/// second). A tick advances the physics by the configured [`Speed`] unless
/// human override is active, in which case exactly one step is taken. When
/// an episode under [`LearningMode::Learning`] ends, the tick returns
/// [`TickOutcome::TrainingRequested`] and the session suspends stepping
/// until the host calls [`TrainingSession::complete_training`]; no physics
/// step can interleave with a training pass.
pub struct TrainingSession<A: Agent> {
    env: CartPoleEnv,
    agent: A,
    config: SessionConfig,
    state: SessionState,
    control: ControlMode,
    learning: LearningMode,
    speed: Speed,
    trajectory: Trajectory,
    episode_steps: usize,
    episode_reward: f32,
    stats: EpisodeStats,
    pause_requested: bool,
}

impl<A: Agent> TrainingSession<A> {
    /// Builds an idle session around an agent.
    pub fn build(config: SessionConfig, env_config: &CartPoleConfig, agent: A) -> Self {
        let mut env = CartPoleEnv::build(env_config, config.seed);
        env.reset();
        let stats = EpisodeStats::new(config.history_capacity);

        Self {
            env,
            agent,
            config,
            state: SessionState::Idle,
            control: ControlMode::Autonomous,
            learning: LearningMode::Learning,
            speed: Speed::X1,
            trajectory: Vec::new(),
            episode_steps: 0,
            episode_reward: 0.0,
            stats,
            pause_requested: false,
        }
    }

    /// Starts the simulation loop.
    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            self.agent.train();
            self.state = SessionState::Running;
        }
    }

    /// Requests a pause.
    ///
    /// Takes effect immediately while running. A training pass already
    /// started cannot be interrupted: when the session is awaiting
    /// training, the pause is applied after the pass completes.
    pub fn request_pause(&mut self) {
        match self.state {
            SessionState::Running => self.state = SessionState::Paused,
            SessionState::AwaitingTraining => self.pause_requested = true,
            _ => {}
        }
    }

    /// Resumes a paused session.
    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.state = SessionState::Running;
        }
    }

    /// Advances the simulation by one tick.
    ///
    /// Runs up to [`Speed::repetitions`] physics+policy steps; human
    /// override forces the factor to 1, since a human cannot react to
    /// super-real-time ticks. Returns [`TickOutcome::TrainingRequested`]
    /// as soon as a finished episode needs a training pass.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::Idle;
        }

        let repetitions = match self.control {
            ControlMode::HumanOverride(_) => 1,
            ControlMode::Autonomous => self.speed.repetitions(),
        };

        for _ in 0..repetitions {
            if let StepSignal::TrainingRequested = self.step_once() {
                return TickOutcome::TrainingRequested;
            }
        }

        TickOutcome::Stepped
    }

    /// Runs the pending training pass and resumes the session.
    ///
    /// Exactly one pass executes per completed episode. Afterwards the
    /// session returns to `Running`, or to `Paused` when a pause was
    /// requested while the pass was in flight.
    pub fn complete_training(&mut self) -> Result<Record> {
        if self.state != SessionState::AwaitingTraining {
            bail!("no training pass is pending");
        }

        let trajectory = std::mem::take(&mut self.trajectory);
        let mut record = self.agent.update(trajectory).unwrap_or_else(Record::empty);
        record.insert(
            "episode",
            RecordValue::Scalar(self.stats.episodes() as f32),
        );

        self.state = if std::mem::take(&mut self.pause_requested) {
            SessionState::Paused
        } else {
            SessionState::Running
        };

        Ok(record)
    }

    fn step_once(&mut self) -> StepSignal {
        let obs = self.env.observe();
        let (act, from_policy) = match self.control {
            ControlMode::HumanOverride(act) => (act, false),
            ControlMode::Autonomous => (self.agent.sample(&obs), true),
        };

        let outcome = self.env.step(act);
        self.episode_steps += 1;
        self.episode_reward += outcome.reward;

        let truncated = self.episode_steps >= self.config.max_episode_steps;
        let is_done = outcome.is_done || truncated;

        if from_policy && self.learning == LearningMode::Learning {
            self.trajectory.push(Transition {
                obs,
                act,
                reward: outcome.reward,
                next_obs: outcome.obs,
                is_done,
            });
        }

        if is_done {
            self.finish_episode()
        } else {
            StepSignal::Continue
        }
    }

    fn finish_episode(&mut self) -> StepSignal {
        self.stats.record_episode(self.episode_reward);
        self.episode_reward = 0.0;
        self.episode_steps = 0;
        self.env.reset();

        if self.learning == LearningMode::Learning && !self.trajectory.is_empty() {
            self.state = SessionState::AwaitingTraining;
            StepSignal::TrainingRequested
        } else {
            self.trajectory.clear();
            StepSignal::EpisodeEnded
        }
    }

    /// Saves the agent's parameters under `name`.
    ///
    /// Forces a pause first and leaves the session paused; rejected with
    /// [`PerchError::SessionBusy`] while a training pass is pending.
    pub fn save_model(&mut self, store: &ModelStore, name: &str) -> Result<()> {
        if self.state == SessionState::AwaitingTraining {
            return Err(PerchError::SessionBusy.into());
        }
        self.state = SessionState::Paused;
        store.save(name, &self.agent)?;
        info!("saved model '{}'", name);
        Ok(())
    }

    /// Replaces the agent's parameters with the set saved under `name`.
    ///
    /// Forces a pause first and leaves the session paused. When the load
    /// fails the in-memory parameters are unchanged.
    pub fn load_model(&mut self, store: &ModelStore, name: &str) -> Result<()> {
        if self.state == SessionState::AwaitingTraining {
            return Err(PerchError::SessionBusy.into());
        }
        self.state = SessionState::Paused;
        store.load(name, &mut self.agent)?;
        info!("loaded model '{}'", name);
        Ok(())
    }

    /// Injects a one-shot impulse into the environment.
    pub fn apply_force(&mut self, f: f32) {
        self.env.apply_force(f);
    }

    /// Routes subsequent actions from the given human input.
    pub fn set_override(&mut self, act: Push) {
        self.control = ControlMode::HumanOverride(act);
    }

    /// Returns action selection to the agent's policy.
    pub fn clear_override(&mut self) {
        self.control = ControlMode::Autonomous;
    }

    /// Switches between learning and inference.
    ///
    /// Entering inference drops any partially collected trajectory, so a
    /// later switch back to learning cannot train on stale data.
    pub fn set_learning_mode(&mut self, mode: LearningMode) {
        if mode == LearningMode::Inference {
            self.trajectory.clear();
            self.agent.eval();
        } else {
            self.agent.train();
        }
        self.learning = mode;
    }

    /// Sets the per-tick repetition factor.
    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current control mode.
    pub fn control_mode(&self) -> ControlMode {
        self.control
    }

    /// Current learning mode.
    pub fn learning_mode(&self) -> LearningMode {
        self.learning
    }

    /// Episode telemetry.
    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// Steps taken in the current episode.
    pub fn episode_steps(&self) -> usize {
        self.episode_steps
    }

    /// The agent driving this session.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Observation of the environment, for display purposes.
    pub fn observe(&self) -> crate::base::Obs {
        self.env.observe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Counts update calls and remembers what it was given.
    struct StubAgent {
        updates: usize,
        last_trajectory_len: usize,
        train: bool,
    }

    impl StubAgent {
        fn new() -> Self {
            Self {
                updates: 0,
                last_trajectory_len: 0,
                train: false,
            }
        }
    }

    impl crate::base::Policy for StubAgent {
        fn sample(&mut self, _obs: &crate::base::Obs) -> Push {
            Push::Left
        }
    }

    impl Agent for StubAgent {
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
            self.updates += 1;
            self.last_trajectory_len = trajectory.len();
            Some(Record::from_scalar("loss", 0.0))
        }

        fn save_params(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load_params(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn session(max_steps: usize) -> TrainingSession<StubAgent> {
        let config = SessionConfig::default()
            .max_episode_steps(max_steps)
            .seed(3);
        TrainingSession::build(config, &CartPoleConfig::default(), StubAgent::new())
    }

    fn run_to_training(session: &mut TrainingSession<StubAgent>) -> usize {
        for ticks in 1..10_000 {
            if session.tick() == TickOutcome::TrainingRequested {
                return ticks;
            }
        }
        panic!("no episode finished");
    }

    #[test]
    fn tick_is_noop_unless_running() {
        let mut s = session(500);
        assert_eq!(s.tick(), TickOutcome::Idle);
        s.start();
        assert_eq!(s.tick(), TickOutcome::Stepped);
        s.request_pause();
        assert_eq!(s.tick(), TickOutcome::Idle);
        s.resume();
        assert_eq!(s.tick(), TickOutcome::Stepped);
    }

    #[test]
    fn episode_end_requests_training_then_resumes() {
        let mut s = session(4);
        s.start();

        run_to_training(&mut s);
        assert_eq!(s.state(), SessionState::AwaitingTraining);

        // Stepping is suspended until the pass completes.
        assert_eq!(s.tick(), TickOutcome::Idle);
        assert_eq!(s.agent().updates, 0);

        let record = s.complete_training().unwrap();
        assert_eq!(s.agent().updates, 1);
        assert_eq!(s.agent().last_trajectory_len, 4);
        assert!(record.get_scalar("loss").is_some());
        assert_eq!(s.state(), SessionState::Running);
    }

    #[test]
    fn one_training_pass_per_episode() {
        let mut s = session(3);
        s.start();

        for _ in 0..5 {
            run_to_training(&mut s);
            s.complete_training().unwrap();
        }
        assert_eq!(s.agent().updates, 5);
        assert!(s.complete_training().is_err());
    }

    #[test]
    fn truncation_marks_transition_done() {
        let mut s = session(2);
        s.start();
        run_to_training(&mut s);

        assert!(s.trajectory.last().unwrap().is_done);
    }

    #[test]
    fn override_steps_are_excluded_from_training_data() {
        let mut s = session(3);
        s.start();
        s.set_override(Push::Right);

        // Whole episodes under override never request training.
        for _ in 0..20 {
            assert_ne!(s.tick(), TickOutcome::TrainingRequested);
        }
        assert_eq!(s.agent().updates, 0);
        assert!(s.stats().episodes() > 0);

        // Mixed episodes train only on the autonomous steps.
        s.clear_override();
        let mut s = session(4);
        s.start();
        s.tick();
        s.set_override(Push::Right);
        s.tick();
        s.clear_override();
        run_to_training(&mut s);
        s.complete_training().unwrap();
        assert_eq!(s.agent().last_trajectory_len, 3);
    }

    #[test]
    fn override_forces_single_step_per_tick() {
        let mut s = session(500);
        s.start();
        s.set_speed(Speed::X10);

        s.tick();
        assert_eq!(s.episode_steps(), 10);

        s.set_override(Push::Left);
        s.tick();
        assert_eq!(s.episode_steps(), 11);
    }

    #[test]
    fn inference_never_calls_update() {
        let mut s = session(3);
        s.start();
        s.set_learning_mode(LearningMode::Inference);

        for _ in 0..50 {
            assert_ne!(s.tick(), TickOutcome::TrainingRequested);
        }
        assert_eq!(s.agent().updates, 0);
        assert!(s.stats().episodes() > 0);
        assert!(!s.agent().is_train());
    }

    #[test]
    fn pause_during_training_pass_is_deferred() {
        let mut s = session(3);
        s.start();
        run_to_training(&mut s);

        s.request_pause();
        assert_eq!(s.state(), SessionState::AwaitingTraining);

        s.complete_training().unwrap();
        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(s.agent().updates, 1);
    }

    #[test]
    fn save_load_force_pause_and_reject_when_busy() {
        let dir = tempdir::TempDir::new("perch-session").unwrap();
        let store = ModelStore::new(dir.path());

        let mut s = session(3);
        s.start();
        s.save_model(&store, "cartpole").unwrap();
        assert_eq!(s.state(), SessionState::Paused);

        s.resume();
        run_to_training(&mut s);
        let err = s.save_model(&store, "cartpole").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PerchError>(),
            Some(PerchError::SessionBusy)
        ));
        assert_eq!(s.state(), SessionState::AwaitingTraining);
    }

    #[test]
    fn speed_multiplier_advances_multiple_steps() {
        let mut s = session(500);
        s.start();
        s.set_speed(Speed::X50);
        s.tick();
        assert_eq!(s.episode_steps(), 50);
    }
}
