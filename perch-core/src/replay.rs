//! Experience replay buffer for off-policy learning.
mod base;
mod config;
pub use base::ExperienceBuffer;
pub use config::ExperienceBufferConfig;
