//! Session states and control modes.
use crate::base::Push;
use serde::{Deserialize, Serialize};

/// State of the training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built but not started.
    Idle,

    /// Simulation ticks advance the environment.
    Running,

    /// An episode finished and its training pass has not completed yet.
    /// No simulation step may interleave with it.
    AwaitingTraining,

    /// Suspended by the user or by a save/load operation.
    Paused,
}

/// Who chooses the action each step.
///
/// The override variant carries the commanded action, so an active override
/// always has one; transitions generated under override are excluded from
/// training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// The agent's policy selects actions.
    Autonomous,

    /// A human input bypasses the policy entirely.
    HumanOverride(Push),
}

/// Whether completed episodes feed the agent.
///
/// In [`LearningMode::Inference`] transitions are still generated for
/// action selection but are never stored or learned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningMode {
    /// Completed episodes trigger a training pass.
    Learning,

    /// Test mode: no transition is recorded and no update path is called.
    Inference,
}

/// Per-tick repetition factor used to accelerate wall-clock training.
///
/// Forced to 1 while human override is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Speed {
    /// One physics step per tick.
    X1,

    /// Five physics steps per tick.
    X5,

    /// Ten physics steps per tick.
    X10,

    /// Fifty physics steps per tick.
    X50,
}

impl Speed {
    /// Number of physics+policy steps per tick.
    pub fn repetitions(self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X5 => 5,
            Self::X10 => 10,
            Self::X50 => 50,
        }
    }
}

/// Outcome of one tick, returned instead of leaving the caller to infer
/// session state from counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing happened.
    Idle,

    /// One or more physics steps were taken.
    Stepped,

    /// An episode finished and a training pass is pending; the caller must
    /// invoke [`TrainingSession::complete_training`] before stepping resumes.
    ///
    /// [`TrainingSession::complete_training`]: crate::TrainingSession::complete_training
    TrainingRequested,
}
