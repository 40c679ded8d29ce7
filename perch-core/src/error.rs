//! Errors of the crate.
use thiserror::Error;

/// Errors surfaced by session and persistence operations.
///
/// Physics and reward computation are pure arithmetic and have no failure
/// modes; sampling an empty buffer or training on too few transitions are
/// no-ops rather than errors.
#[derive(Error, Debug)]
pub enum PerchError {
    /// No saved model exists under the given name.
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// Writing model parameters failed; live parameters are unaffected.
    #[error("failed to save model '{0}'")]
    SaveFailed(String),

    /// Reading model parameters failed; live parameters are unchanged.
    #[error("failed to load model '{0}'")]
    LoadFailed(String),

    /// The session has a training pass in flight and cannot serve the call.
    #[error("session is awaiting a training pass")]
    SessionBusy,
}
