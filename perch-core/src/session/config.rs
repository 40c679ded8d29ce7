//! Configuration of the training session.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`TrainingSession`](super::TrainingSession).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SessionConfig {
    /// Episodes are forcibly ended after this many steps even if the
    /// physics alone would continue.
    pub max_episode_steps: usize,

    /// Number of `(episode, reward)` pairs kept in the rolling history.
    pub history_capacity: usize,

    /// Random seed of the environment.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: 500,
            history_capacity: 200,
            seed: 42,
        }
    }
}

impl SessionConfig {
    /// Sets the step ceiling per episode.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = v;
        self
    }

    /// Sets the rolling history capacity.
    pub fn history_capacity(mut self, v: usize) -> Self {
        self.history_capacity = v;
        self
    }

    /// Sets the random seed of the environment.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn yaml_roundtrip() {
        let dir = TempDir::new("perch-session-config").unwrap();
        let path = dir.path().join("session.yaml");

        let config = SessionConfig::default().max_episode_steps(100).seed(7);
        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);
    }
}
