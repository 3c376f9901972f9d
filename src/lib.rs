//! # staged_image_release
//!
//! Republishes the staged container images of a tested commit under their
//! public release names.
//!
//! For every staged artifact the per-architecture images
//! `{staged}:{commit}-{arch}` are pulled, re-tagged as
//! `{release}:{prefix}{version}-{arch}` and pushed, followed by a
//! multi-architecture manifest `{release}:{prefix}{version}`. Each release
//! name then gets a `latest` manifest over the unprefixed version, and one
//! single-architecture artifact is published without a manifest.
//!
//! ## Usage
//!
//! ```bash
//! staged_image_release -u bot -k "$TOKEN" -c abcd123 -r v1.2.0
//! staged_image_release -u bot -k "$TOKEN" -c abcd123 -r v1.2.0 --dry-run
//! staged_image_release -u bot -k "$TOKEN" -c abcd123 -r v1.2.0 --config plan.toml
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod plan;
pub mod publish;
pub mod registry;

// Re-export main types for public API
pub use cli::{Args, OutputManager};
pub use error::{CliError, ConfigError, RegistryError, ReleaseError, Result};
pub use plan::{PublishPlan, SpecialArtifact};
pub use publish::{PublishSummary, Publisher, ReleaseParameters};
pub use registry::{Credential, DockerRegistry, DryRunRegistry, ImageRef, RegistryOperations};
