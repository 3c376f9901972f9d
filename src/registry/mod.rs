//! Container registry operations used by the release publisher.
//!
//! This module defines the `RegistryOperations` trait covering every registry
//! interaction a release needs. Implementations:
//!
//! - `docker` - drives the `docker` CLI
//! - `dry_run` - prints the operations without executing anything

mod docker;
mod dry_run;

pub use docker::DockerRegistry;
pub use dry_run::DryRunRegistry;

use crate::error::Result;
use std::fmt;
use std::future::Future;

/// Fully qualified image reference: `{registry}/{namespace}/{repository}:{tag}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Registry host, e.g. `ghcr.io`
    pub registry: String,
    /// Organization namespace inside the registry
    pub namespace: String,
    /// Repository path below the namespace, e.g. `staged-images/kbs`
    pub repository: String,
    /// Tag
    pub tag: String,
}

impl ImageRef {
    /// Create a reference from its parts
    pub fn new(
        registry: impl Into<String>,
        namespace: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            namespace: namespace.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// `repository:tag` without the registry location
    pub fn short_name(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.registry, self.namespace, self.repository, self.tag
        )
    }
}

/// Registry credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, only for handing to the container tool over stdin
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Credential {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Every registry interaction needed to publish a release
pub trait RegistryOperations {
    /// Authenticate against `registry`. The credential must not be passed
    /// on a command line.
    fn login(
        &self,
        registry: &str,
        identity: &str,
        credential: &Credential,
    ) -> impl Future<Output = Result<()>>;

    /// Pull an image into local storage
    fn pull(&self, image: &ImageRef) -> impl Future<Output = Result<()>>;

    /// Create a local tag `target` pointing at `source`
    fn tag(&self, source: &ImageRef, target: &ImageRef) -> impl Future<Output = Result<()>>;

    /// Push a local tag to the registry
    fn push(&self, image: &ImageRef) -> impl Future<Output = Result<()>>;

    /// Create a multi-architecture manifest list amending `members`
    fn create_manifest(
        &self,
        manifest: &ImageRef,
        members: &[ImageRef],
    ) -> impl Future<Output = Result<()>>;

    /// Push a previously created manifest list
    fn push_manifest(&self, manifest: &ImageRef) -> impl Future<Output = Result<()>>;
}
