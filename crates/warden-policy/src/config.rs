// config.rs — Policy files under `.warden/`.
//
// A project declares its policy in `.warden/policy.yaml` (TOML and JSON
// are accepted too, picked by file extension):
//
// ```yaml
// restricted:
//   - secretlib
// allowed:
//   - app.trusted
// match_mode: segment
// ```
//
// Anything that is not a list of strings under `restricted` / `allowed`
// is rejected as a TypeError-category configuration error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::origin::MatchMode;
use crate::policy::AccessPolicy;

/// File names probed, in order, when no explicit path is given.
const POLICY_FILE_NAMES: &[&str] = &["policy.yaml", "policy.yml", "policy.toml", "policy.json"];

/// On-disk form of an access policy, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    /// Identifiers whose loads are provenance-checked.
    pub restricted: Vec<String>,
    /// Trusted origins, dotted or path-like.
    pub allowed: Vec<String>,
    /// Origin comparison rule.
    #[serde(default)]
    pub match_mode: MatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl PolicyFile {
    /// A starter policy written by `warden init`.
    pub fn starter() -> Self {
        Self {
            restricted: vec!["secretlib".to_string()],
            allowed: vec!["app.trusted".to_string()],
            match_mode: MatchMode::Segment,
        }
    }

    /// Read and validate a policy file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let data = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data, path)
    }

    /// Parse policy text; `origin` picks the format and labels errors.
    pub fn parse(data: &str, origin: &Path) -> Result<Self, PolicyError> {
        let invalid = |reason: String| PolicyError::InvalidConfig {
            path: origin.to_path_buf(),
            reason,
        };
        match Format::for_path(origin) {
            Format::Yaml => serde_yaml::from_str(data).map_err(|e| invalid(e.to_string())),
            Format::Toml => toml::from_str(data).map_err(|e| invalid(e.to_string())),
            Format::Json => serde_json::from_str(data).map_err(|e| invalid(e.to_string())),
        }
    }

    /// Write this policy file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), PolicyError> {
        let invalid = |reason: String| PolicyError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        };
        let text = match Format::for_path(path) {
            Format::Yaml => serde_yaml::to_string(self).map_err(|e| invalid(e.to_string()))?,
            Format::Toml => toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?,
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?
            }
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PolicyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Normalize into a live policy.
    pub fn into_policy(self) -> AccessPolicy {
        AccessPolicy::new(self.restricted, self.allowed).with_match_mode(self.match_mode)
    }
}

/// Locates the policy file of a project (`.warden/` under the root).
pub struct PolicyStore {
    dir: PathBuf,
}

impl PolicyStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Construct a store from a project root (uses `.warden/`).
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".warden"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The first existing policy file, or the default YAML location.
    pub fn policy_path(&self) -> PathBuf {
        POLICY_FILE_NAMES
            .iter()
            .map(|name| self.dir.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| self.dir.join(POLICY_FILE_NAMES[0]))
    }

    /// Load the project policy. Returns None if no policy file exists.
    pub fn load(&self) -> Result<Option<AccessPolicy>, PolicyError> {
        let path = self.policy_path();
        if !path.exists() {
            return Ok(None);
        }
        let policy = PolicyFile::load(&path)?.into_policy();
        tracing::debug!(
            path = %path.display(),
            policy_id = %policy.policy_id,
            restricted = policy.restricted().len(),
            "loaded access policy"
        );
        Ok(Some(policy))
    }

    /// Save a policy file at the default location.
    pub fn save(&self, file: &PolicyFile) -> Result<PathBuf, PolicyError> {
        let path = self.policy_path();
        file.save(&path)?;
        Ok(path)
    }
}
