//! Command line argument parsing and validation.

use crate::error::CliError;
use crate::publish::ReleaseParameters;
use crate::registry::Credential;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Republish staged container images as a release
#[derive(Parser, Debug)]
#[command(
    name = "staged_image_release",
    version,
    about = "Republish staged container images under their release names",
    long_about = "Pull the staged images built from a commit, re-tag them under their public
release names for every architecture, push them, and publish the
multi-architecture manifests.

Usage:
  staged_image_release -u <user> -k <token> -c <commit-sha> -r <release-tag>
  staged_image_release -u bot -k \"$TOKEN\" -c abcd123 -r v1.2.0 --dry-run"
)]
pub struct Args {
    /// Registry user name
    #[arg(short = 'u', long = "user", value_name = "IDENTITY")]
    pub user: String,

    /// Registry token, sent to the container tool on stdin
    #[arg(short = 'k', long = "key", value_name = "CREDENTIAL")]
    pub key: Credential,

    /// Commit SHA the staged images were built from
    #[arg(short = 'c', long = "commit", value_name = "SHA")]
    pub commit: String,

    /// Release tag to publish, e.g. v1.2.0
    #[arg(short = 'r', long = "release", value_name = "TAG")]
    pub release: String,

    /// TOML publish plan replacing the built-in artifact tables
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the registry operations without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Echo every registry operation
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    /// Parse process arguments without exiting on error
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Parse an explicit argument list without exiting on error
    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Usage line for error reports
    pub fn usage() -> String {
        Self::command().render_usage().to_string()
    }

    /// Validate arguments and turn them into release parameters.
    /// Empty values count as missing.
    pub fn release_parameters(&self) -> Result<ReleaseParameters, CliError> {
        let required = [
            ("-u <IDENTITY>", self.user.trim().is_empty()),
            ("-k <CREDENTIAL>", self.key.is_empty()),
            ("-c <SHA>", self.commit.trim().is_empty()),
            ("-r <TAG>", self.release.trim().is_empty()),
        ];
        if let Some((argument, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(CliError::MissingArgument {
                argument: argument.to_string(),
            });
        }

        if self.release.chars().any(char::is_whitespace)
            || self.commit.chars().any(char::is_whitespace)
        {
            return Err(CliError::InvalidArguments {
                reason: "commit and release tag must not contain whitespace".to_string(),
            });
        }

        Ok(ReleaseParameters {
            identity: self.user.clone(),
            credential: self.key.clone(),
            source_reference: self.commit.clone(),
            release_tag: self.release.clone(),
        })
    }

    /// Whether the release tag parses as a semantic version, with or
    /// without a leading `v`
    pub fn release_is_semver(&self) -> bool {
        let version = self.release.strip_prefix('v').unwrap_or(&self.release);
        semver::Version::parse(version).is_ok()
    }
}
