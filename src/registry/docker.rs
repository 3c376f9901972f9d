//! `docker` CLI backend for registry operations.
//!
//! Every operation spawns the docker executable and waits for it to finish.
//! Stdout is captured and logged, stderr becomes the failure reason.

use super::{Credential, ImageRef, RegistryOperations};
use crate::error::{RegistryError, Result};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Name of the container tool executable
pub const DOCKER_PROGRAM: &str = "docker";

/// Registry operations backed by the `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerRegistry {
    program: PathBuf,
}

impl DockerRegistry {
    /// Locate `docker` on `PATH`
    pub fn locate() -> Result<Self> {
        let program = which::which(DOCKER_PROGRAM).map_err(|e| RegistryError::ToolNotFound {
            tool: DOCKER_PROGRAM.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("using container tool at {}", program.display());
        Ok(Self { program })
    }

    /// Use an explicit executable path
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the executable in use
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run docker with `args`, mapping a spawn failure or non-zero exit to
    /// `OperationFailed`.
    async fn run(&self, operation: &str, image: &ImageRef, args: &[String]) -> Result<()> {
        log::debug!("{} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RegistryError::OperationFailed {
                operation: operation.to_string(),
                image: image.to_string(),
                reason: format!("failed to spawn {}: {e}", self.program.display()),
            })?;

        log_stdout(&output);

        if !output.status.success() {
            return Err(RegistryError::OperationFailed {
                operation: operation.to_string(),
                image: image.to_string(),
                reason: failure_reason(&output),
            }
            .into());
        }

        Ok(())
    }
}

impl RegistryOperations for DockerRegistry {
    async fn login(&self, registry: &str, identity: &str, credential: &Credential) -> Result<()> {
        let args = login_args(registry, identity);
        log::debug!("{} {}", self.program.display(), args.join(" "));

        let auth_failed = |reason: String| RegistryError::AuthenticationFailed {
            registry: registry.to_string(),
            identity: identity.to_string(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| auth_failed(format!("failed to spawn {}: {e}", self.program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(credential.expose().as_bytes())
                .await
                .map_err(|e| auth_failed(format!("failed to write credential: {e}")))?;
            // Closing stdin lets docker read EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| auth_failed(e.to_string()))?;

        log_stdout(&output);

        if !output.status.success() {
            return Err(auth_failed(failure_reason(&output)).into());
        }

        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<()> {
        self.run("pull", image, &["pull".to_string(), image.to_string()])
            .await
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.run(
            "tag",
            target,
            &["tag".to_string(), source.to_string(), target.to_string()],
        )
        .await
    }

    async fn push(&self, image: &ImageRef) -> Result<()> {
        self.run("push", image, &["push".to_string(), image.to_string()])
            .await
    }

    async fn create_manifest(&self, manifest: &ImageRef, members: &[ImageRef]) -> Result<()> {
        self.run("manifest create", manifest, &manifest_create_args(manifest, members))
            .await
    }

    async fn push_manifest(&self, manifest: &ImageRef) -> Result<()> {
        self.run(
            "manifest push",
            manifest,
            &[
                "manifest".to_string(),
                "push".to_string(),
                manifest.to_string(),
            ],
        )
        .await
    }
}

fn login_args(registry: &str, identity: &str) -> Vec<String> {
    vec![
        "login".to_string(),
        registry.to_string(),
        "-u".to_string(),
        identity.to_string(),
        "--password-stdin".to_string(),
    ]
}

fn manifest_create_args(manifest: &ImageRef, members: &[ImageRef]) -> Vec<String> {
    let mut args = vec![
        "manifest".to_string(),
        "create".to_string(),
        "--amend".to_string(),
        manifest.to_string(),
    ];
    args.extend(members.iter().map(ToString::to_string));
    args
}

fn log_stdout(output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        log::trace!("{line}");
    }
}

fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let code = output.status.code().unwrap_or(-1);
    if stderr.is_empty() {
        format!("exit code {code}")
    } else {
        format!("{stderr} (exit code {code})")
    }
}
