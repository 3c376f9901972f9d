//! Publish plan: which staged images become which release images.
//!
//! A plan is built once at startup (built-in defaults or a TOML plan file),
//! validated, and never mutated afterwards.

mod config;

pub use config::{PlanFile, SpecialArtifactFile};

use crate::error::{ConfigError, Result};
use crate::registry::ImageRef;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Default registry host
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

/// Default organization namespace
pub const DEFAULT_NAMESPACE: &str = "confidential-containers";

/// Default architecture set, in publish order
pub const DEFAULT_ARCHITECTURES: &[&str] = &["x86_64", "s390x"];

/// Tag of the unprefixed alias manifest
pub const LATEST_TAG: &str = "latest";

const DEFAULT_ARTIFACTS: &[(&str, &str)] = &[
    ("staged-images/kbs", "key-broker-service"),
    ("staged-images/kbs-grpc-as", "key-broker-service"),
    ("staged-images/kbs-ita-as", "key-broker-service"),
    ("staged-images/coco-as-grpc", "attestation-service"),
    ("staged-images/coco-as-restful", "attestation-service"),
    ("staged-images/rvps", "reference-value-provider-service"),
];

const DEFAULT_TAG_PREFIXES: &[(&str, &str)] = &[
    ("staged-images/kbs", "built-in-as-"),
    ("staged-images/kbs-ita-as", "ita-as-"),
    ("staged-images/coco-as-restful", "rest-"),
];

/// Single-architecture artifact published without a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialArtifact {
    /// Staged artifact name
    pub staged: String,
    /// Release artifact name
    pub release: String,
    /// Prefix prepended to the release tag
    pub tag_prefix: String,
    /// The one architecture the artifact is built for
    pub architecture: String,
}

impl Default for SpecialArtifact {
    fn default() -> Self {
        Self {
            staged: "staged-images/kbs-client".to_string(),
            release: "kbs-client".to_string(),
            tag_prefix: "sample_only-".to_string(),
            architecture: DEFAULT_ARCHITECTURES[0].to_string(),
        }
    }
}

/// Immutable description of everything a release publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    registry: String,
    namespace: String,
    architectures: Vec<String>,
    artifacts: BTreeMap<String, String>,
    tag_prefixes: BTreeMap<String, String>,
    latest: BTreeSet<String>,
    special: Option<SpecialArtifact>,
}

impl Default for PublishPlan {
    fn default() -> Self {
        let artifacts: BTreeMap<String, String> = DEFAULT_ARTIFACTS
            .iter()
            .map(|(staged, release)| (staged.to_string(), release.to_string()))
            .collect();
        let latest = artifacts.values().cloned().collect();

        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            architectures: DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect(),
            artifacts,
            tag_prefixes: DEFAULT_TAG_PREFIXES
                .iter()
                .map(|(staged, prefix)| (staged.to_string(), prefix.to_string()))
                .collect(),
            latest,
            special: Some(SpecialArtifact::default()),
        }
    }
}

impl PublishPlan {
    /// Build and validate a plan.
    ///
    /// When `latest` is `None` the release name set is derived from the
    /// mapping's values.
    pub fn new(
        registry: String,
        namespace: String,
        architectures: Vec<String>,
        artifacts: BTreeMap<String, String>,
        tag_prefixes: BTreeMap<String, String>,
        latest: Option<BTreeSet<String>>,
        special: Option<SpecialArtifact>,
    ) -> Result<Self> {
        let latest = latest.unwrap_or_else(|| artifacts.values().cloned().collect());
        let plan = Self {
            registry,
            namespace,
            architectures,
            artifacts,
            tag_prefixes,
            latest,
            special,
        };
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> Result<()> {
        if self.registry.trim().is_empty() {
            return Err(invalid("registry host is empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(invalid("registry namespace is empty"));
        }
        if self.architectures.is_empty() {
            return Err(invalid("at least one architecture is required"));
        }

        let mut seen = HashSet::new();
        for arch in &self.architectures {
            if arch.trim().is_empty() {
                return Err(invalid("architecture names must not be empty"));
            }
            if !seen.insert(arch.as_str()) {
                return Err(ConfigError::DuplicateArchitecture { arch: arch.clone() }.into());
            }
        }

        if self.artifacts.is_empty() {
            return Err(invalid("no staged artifacts are mapped"));
        }
        for (staged, release) in &self.artifacts {
            if staged.trim().is_empty() || release.trim().is_empty() {
                return Err(invalid("artifact names must not be empty"));
            }
        }

        for staged in self.tag_prefixes.keys() {
            if !self.artifacts.contains_key(staged) {
                return Err(ConfigError::UnmappedArtifact {
                    name: staged.clone(),
                }
                .into());
            }
        }

        let released: BTreeSet<&String> = self.artifacts.values().collect();
        for name in &self.latest {
            if !released.contains(name) {
                return Err(ConfigError::UnknownReleaseName { name: name.clone() }.into());
            }
        }

        if let Some(special) = &self.special {
            if special.staged.trim().is_empty() || special.release.trim().is_empty() {
                return Err(invalid("special artifact names must not be empty"));
            }
            if !self.architectures.contains(&special.architecture) {
                return Err(ConfigError::UnknownArchitecture {
                    arch: special.architecture.clone(),
                    supported: self.architectures.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Registry host
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Organization namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Architectures in publish order
    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    /// `(staged, release)` pairs in staged-name order
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.artifacts
            .iter()
            .map(|(staged, release)| (staged.as_str(), release.as_str()))
    }

    /// Staged artifact names in publish order
    pub fn staged_names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Release name a staged artifact is published as
    pub fn release_name(&self, staged: &str) -> Result<&str> {
        self.artifacts
            .get(staged)
            .map(String::as_str)
            .ok_or_else(|| {
                ConfigError::UnmappedArtifact {
                    name: staged.to_string(),
                }
                .into()
            })
    }

    /// Tag prefix for a staged artifact, empty when none is configured
    pub fn tag_prefix(&self, staged: &str) -> &str {
        self.tag_prefixes.get(staged).map_or("", String::as_str)
    }

    /// Prefixed release tag for a staged artifact
    pub fn full_release_tag(&self, staged: &str, release_tag: &str) -> String {
        format!("{}{release_tag}", self.tag_prefix(staged))
    }

    /// Release names that receive a `latest` manifest
    pub fn latest_release_names(&self) -> impl Iterator<Item = &str> {
        self.latest.iter().map(String::as_str)
    }

    /// The single-architecture artifact, if any
    pub fn special(&self) -> Option<&SpecialArtifact> {
        self.special.as_ref()
    }

    /// Reference to `repository:tag` in this plan's registry location
    pub fn image(&self, repository: &str, tag: impl Into<String>) -> ImageRef {
        ImageRef::new(&self.registry, &self.namespace, repository, tag)
    }
}

fn invalid(reason: &str) -> crate::error::ReleaseError {
    ConfigError::Invalid {
        reason: reason.to_string(),
    }
    .into()
}
