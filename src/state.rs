//! Applied state: what each declared resource last converged to

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resource::Kind;

/// Current state file format
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Everything crmform has applied, in apply order
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Applied resources, oldest first
    #[serde(default)]
    pub resources: Vec<ResourceState>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

/// One applied resource
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResourceState {
    /// Name from the stack file
    pub name: String,

    pub kind: Kind,

    /// Declaration as last applied (normalized)
    pub inputs: Value,

    /// Remote state as last materialized
    pub output: Value,

    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Resolve a state path, expanding `~` and environment variables
    pub fn resolve_path(raw: &str) -> PathBuf {
        crate::paths::expand(raw)
    }

    /// Load state from disk, or return empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: State = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this crmform understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk
    ///
    /// Writes a sibling temp file first and renames it over the target, so a
    /// crash mid-write never leaves a truncated state file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Look up a resource by name
    pub fn get(&self, name: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Record the result of applying a resource
    ///
    /// An existing entry keeps its position; a new one is appended.
    pub fn upsert(&mut self, name: &str, kind: Kind, inputs: Value, output: Value) {
        let now = Utc::now();
        let entry = ResourceState {
            name: name.to_string(),
            kind,
            inputs,
            output,
            updated_at: now,
        };
        match self.resources.iter_mut().find(|r| r.name == name) {
            Some(existing) => *existing = entry,
            None => self.resources.push(entry),
        }
        self.last_updated = now;
    }

    /// Replace only the recorded output (after a refresh)
    pub fn set_output(&mut self, name: &str, output: Value) -> bool {
        let Some(existing) = self.resources.iter_mut().find(|r| r.name == name) else {
            return false;
        };
        existing.output = output;
        existing.updated_at = Utc::now();
        self.last_updated = existing.updated_at;
        true
    }

    /// Forget a resource, returning it if it was recorded
    pub fn remove(&mut self, name: &str) -> Option<ResourceState> {
        let index = self.resources.iter().position(|r| r.name == name)?;
        self.last_updated = Utc::now();
        Some(self.resources.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
