//! Clipped-surrogate actor-critic agent.
mod base;
mod config;
mod gae;
pub use base::Ppo;
pub use config::PpoConfig;
pub use gae::gae;
