//! End-to-end runs of both agents inside a training session.
use perch_candle_agent::{
    dqn::{Dqn, DqnConfig},
    mlp::{Mlp, MlpConfig},
    model::NetModelConfig,
    ppo::{Ppo, PpoConfig},
};
use perch_core::{
    Agent, CartPoleConfig, ModelStore, PerchError, SessionConfig, SessionState, Speed,
    TickOutcome, TrainingSession,
};
use tempdir::TempDir;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ticks the session until `passes` training passes have completed.
fn run_training_passes<A: Agent>(session: &mut TrainingSession<A>, passes: usize) {
    let mut done = 0;
    for _ in 0..100_000 {
        if session.tick() == TickOutcome::TrainingRequested {
            session.complete_training().unwrap();
            done += 1;
            if done == passes {
                return;
            }
        }
    }
    panic!("training was never requested");
}

#[test]
fn dqn_trains_in_a_session_and_roundtrips_through_the_store() {
    init();
    let model_config = NetModelConfig::default().net_config(MlpConfig::new(4, vec![16], 2));
    let config = DqnConfig::default()
        .model_config(model_config)
        .min_transitions_warmup(16)
        .batch_size(16)
        .n_updates_per_opt(1)
        .sync_interval(2);
    let agent = Dqn::<Mlp>::build(config).unwrap();

    let mut session = TrainingSession::build(
        SessionConfig::default().max_episode_steps(50),
        &CartPoleConfig::default(),
        agent,
    );
    session.start();
    session.set_speed(Speed::X50);
    run_training_passes(&mut session, 6);

    assert!(session.stats().episodes() >= 6);
    assert!(session.stats().high_score().is_some());
    // At least one pass survived warmup and decayed epsilon.
    assert!(session.agent().eps() < 1.0);

    let dir = TempDir::new("perch-e2e").unwrap();
    let store = ModelStore::new(dir.path());
    session.save_model(&store, "dqn").unwrap();
    assert_eq!(session.state(), SessionState::Paused);
    assert_eq!(store.list_models().unwrap(), vec!["dqn"]);

    session.load_model(&store, "dqn").unwrap();
    assert_eq!(session.state(), SessionState::Paused);

    let err = session.load_model(&store, "missing").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PerchError>(),
        Some(PerchError::ModelNotFound(_))
    ));

    // The session keeps going after persistence detours.
    session.resume();
    run_training_passes(&mut session, 1);
}

#[test]
fn ppo_trains_in_a_session_and_roundtrips_through_the_store() {
    init();
    let config = PpoConfig::default()
        .policy_model_config(
            NetModelConfig::default().net_config(MlpConfig::new(4, vec![16], 2)),
        )
        .value_model_config(
            NetModelConfig::default().net_config(MlpConfig::new(4, vec![16], 1)),
        )
        .learning_rate(1e-3)
        .opt_epochs(4);
    let agent = Ppo::<Mlp, Mlp>::build(config).unwrap();

    let mut session = TrainingSession::build(
        SessionConfig::default().max_episode_steps(50),
        &CartPoleConfig::default(),
        agent,
    );
    session.start();
    session.set_speed(Speed::X50);
    run_training_passes(&mut session, 4);

    assert!(session.stats().episodes() >= 4);

    let dir = TempDir::new("perch-e2e").unwrap();
    let store = ModelStore::new(dir.path());
    session.save_model(&store, "ppo-a").unwrap();
    session.save_model(&store, "ppo-b").unwrap();
    assert_eq!(store.list_models().unwrap(), vec!["ppo-a", "ppo-b"]);

    store.delete("ppo-a").unwrap();
    assert_eq!(store.list_models().unwrap(), vec!["ppo-b"]);

    session.load_model(&store, "ppo-b").unwrap();
    session.resume();
    run_training_passes(&mut session, 1);
}
