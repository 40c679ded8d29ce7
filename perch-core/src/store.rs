//! Directory-backed model persistence.
use crate::{base::Agent, error::PerchError};
use anyhow::{Context, Result};
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Stores named parameter sets on disk, one directory per name.
///
/// The store only manages the directory layout; what lands inside a model
/// directory is the agent's own business through
/// [`Agent::save_params`]/[`Agent::load_params`]. Coupled parameter sets
/// (such as an actor-critic pair) therefore live and die as one logical
/// unit under one name.
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory is created lazily on the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Saves the agent's parameters under `name`, overwriting any previous
    /// set with that name.
    pub fn save<A: Agent>(&self, name: &str, agent: &A) -> Result<()> {
        let dir = self.model_dir(name);
        fs::create_dir_all(&dir)
            .with_context(|| PerchError::SaveFailed(name.to_string()))?;
        agent
            .save_params(&dir)
            .with_context(|| PerchError::SaveFailed(name.to_string()))?;
        info!("saved parameters under {:?}", dir);
        Ok(())
    }

    /// Loads the parameter set saved under `name` into the agent.
    ///
    /// The agent's contract guarantees its live parameters are untouched
    /// when this fails.
    pub fn load<A: Agent>(&self, name: &str, agent: &mut A) -> Result<()> {
        let dir = self.model_dir(name);
        if !dir.is_dir() {
            return Err(PerchError::ModelNotFound(name.to_string()).into());
        }
        agent
            .load_params(&dir)
            .with_context(|| PerchError::LoadFailed(name.to_string()))?;
        info!("loaded parameters from {:?}", dir);
        Ok(())
    }

    /// Names of all saved models, sorted.
    pub fn list_models(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes the model saved under `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.model_dir(name);
        if !dir.is_dir() {
            return Err(PerchError::ModelNotFound(name.to_string()).into());
        }
        fs::remove_dir_all(&dir)?;
        info!("deleted model {:?}", dir);
        Ok(())
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
