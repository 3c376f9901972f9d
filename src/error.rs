//! Error types for staged image release operations.
//!
//! Every error here is fatal: the run stops at the first failure and the CLI
//! reports it together with recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Registry and container tool errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Publish plan errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

/// Errors raised while talking to the registry through the container tool
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry rejected the supplied credential
    #[error("Authentication to '{registry}' as '{identity}' failed: {reason}")]
    AuthenticationFailed {
        /// Registry host
        registry: String,
        /// Identity used for the login
        identity: String,
        /// Reason reported by the container tool
        reason: String,
    },

    /// A pull, tag, push or manifest operation failed
    #[error("{operation} failed for '{image}': {reason}")]
    OperationFailed {
        /// Operation that failed (pull, tag, push, ...)
        operation: String,
        /// Image reference the operation was applied to
        image: String,
        /// Reason reported by the container tool
        reason: String,
    },

    /// The container tool executable could not be located
    #[error("Container tool '{tool}' not found: {reason}")]
    ToolNotFound {
        /// Tool name
        tool: String,
        /// Lookup failure
        reason: String,
    },
}

/// Publish plan errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A staged name is referenced but has no release mapping
    #[error("Staged artifact '{name}' has no release name mapping")]
    UnmappedArtifact {
        /// Staged artifact name
        name: String,
    },

    /// A `latest` release name that no staged artifact maps to
    #[error("Release name '{name}' is not produced by any staged artifact")]
    UnknownReleaseName {
        /// Release artifact name
        name: String,
    },

    /// Architecture outside the configured architecture set
    #[error("Architecture '{arch}' is not one of the supported architectures {supported:?}")]
    UnknownArchitecture {
        /// Offending architecture
        arch: String,
        /// Configured architectures
        supported: Vec<String>,
    },

    /// Architecture listed twice
    #[error("Architecture '{arch}' is listed more than once")]
    DuplicateArchitecture {
        /// Offending architecture
        arch: String,
    },

    /// Structurally invalid plan
    #[error("Invalid publish plan: {reason}")]
    Invalid {
        /// Reason for the error
        reason: String,
    },

    /// Plan file could not be parsed
    #[error("Failed to parse plan file {path}: {source}")]
    Parse {
        /// Plan file path
        path: PathBuf,
        /// TOML parse error
        #[source]
        source: toml::de::Error,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Cli(_) => vec![
                "Pass all of -u <user> -k <key> -c <commit> -r <release>".to_string(),
                "Run with --help for the full usage".to_string(),
            ],
            ReleaseError::Registry(RegistryError::AuthenticationFailed { registry, .. }) => vec![
                format!("Verify the token has write:packages scope on {registry}"),
                "Check that the user name matches the token owner".to_string(),
            ],
            ReleaseError::Registry(RegistryError::OperationFailed { operation, .. })
                if operation == "manifest create" =>
            {
                vec![
                    "Every architecture tag must exist in the registry before the manifest"
                        .to_string(),
                    "Release names published only under a prefixed tag get no latest manifest"
                        .to_string(),
                ]
            }
            ReleaseError::Registry(RegistryError::OperationFailed { .. }) => vec![
                "Confirm the staged images exist for the given commit and every architecture"
                    .to_string(),
                "Tags pushed before the failure are left in place; rerun once fixed".to_string(),
            ],
            ReleaseError::Registry(RegistryError::ToolNotFound { tool, .. }) => vec![
                format!("Install {tool} and make sure it is on PATH"),
                "Use --dry-run to preview the operations without it".to_string(),
            ],
            ReleaseError::Config(_) => vec![
                "Check the plan file against the documented format".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
