//! TOML plan files.

use super::{
    DEFAULT_ARCHITECTURES, DEFAULT_NAMESPACE, DEFAULT_REGISTRY, PublishPlan, SpecialArtifact,
};
use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// On-disk shape of a publish plan
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Registry host, defaults to `ghcr.io`
    #[serde(default)]
    pub registry: Option<String>,
    /// Organization namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Architectures in publish order
    #[serde(default)]
    pub architectures: Option<Vec<String>>,
    /// Explicit `latest` release names; derived from `artifacts` when absent
    #[serde(default)]
    pub latest: Option<BTreeSet<String>>,
    /// Staged name to release name
    pub artifacts: BTreeMap<String, String>,
    /// Staged name to tag prefix
    #[serde(default)]
    pub tag_prefixes: BTreeMap<String, String>,
    /// Single-architecture artifact
    #[serde(default)]
    pub special: Option<SpecialArtifactFile>,
}

/// On-disk shape of the special artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecialArtifactFile {
    /// Staged artifact name
    pub staged: String,
    /// Release artifact name
    pub release: String,
    /// Tag prefix
    #[serde(default)]
    pub tag_prefix: String,
    /// Architecture; the first configured architecture when absent
    #[serde(default)]
    pub architecture: Option<String>,
}

impl PlanFile {
    /// Turn the file contents into a validated plan
    pub fn into_plan(self) -> Result<PublishPlan> {
        let architectures = self
            .architectures
            .unwrap_or_else(|| DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect());

        let special = self.special.map(|s| SpecialArtifact {
            architecture: s
                .architecture
                .or_else(|| architectures.first().cloned())
                .unwrap_or_default(),
            staged: s.staged,
            release: s.release,
            tag_prefix: s.tag_prefix,
        });

        PublishPlan::new(
            self.registry.unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            architectures,
            self.artifacts,
            self.tag_prefixes,
            self.latest,
            special,
        )
    }
}

impl PublishPlan {
    /// Parse a plan from TOML text. `origin` is only used in error messages.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self> {
        let file: PlanFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        file.into_plan()
    }

    /// Load and validate a plan file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("loaded publish plan from {}", path.display());
        Self::from_toml_str(&contents, path)
    }
}
