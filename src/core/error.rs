//! Error kinds raised by configs, toolchains and builders.
//!
//! None of these are retried: external tools are assumed deterministic, so
//! the only recovery is to change inputs and run again.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::Variant;

/// A config was asked for something its family cannot produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{property}` is not defined for {family} configs")]
    Unsupported {
        property: &'static str,
        family: &'static str,
    },

    #[error("unknown host os `{0}`")]
    UnknownHost(String),

    #[error("unknown architecture `{0}`")]
    UnknownArch(String),

    #[error("unknown build variant `{0}`")]
    UnknownVariant(String),

    #[error("builder `{builder}` does not accept variant `{variant}` (accepted: {accepted})")]
    InvalidVariant {
        builder: String,
        variant: Variant,
        accepted: String,
    },

    #[error("failed to read sdk environment from {}: {message}", path.display())]
    SdkEnvironment { path: PathBuf, message: String },
}

/// A toolchain reference could not resolve part of its layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolchainError {
    #[error("no clang version found under {}", path.display())]
    VersionNotFound { path: PathBuf },

    #[error("multiple clang versions under {}: {}", path.display(), found.join(", "))]
    AmbiguousVersion { path: PathBuf, found: Vec<String> },

    #[error("invalid clang version `{0}`")]
    InvalidVersion(String),
}

/// Failure of a single `build()` call.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("`{command}` failed with exit code {code:?}\n{stderr}")]
    ExternalTool {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to spawn `{}`", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected artifact is missing: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("builder `{0}` has already been built")]
    AlreadyBuilt(String),

    #[error("builder `{0}` has not been built yet")]
    NotBuilt(String),

    #[error("builder `{0}` does not produce a toolchain")]
    NoToolchain(String),

    #[error("builder `{builder}`: {message}")]
    Invariant { builder: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Exit code of the failing external tool, if that is what failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildError::ExternalTool { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this error is a wiring mistake rather than an environment problem.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BuildError::AlreadyBuilt(_)
                | BuildError::NotBuilt(_)
                | BuildError::NoToolchain(_)
                | BuildError::Invariant { .. }
        )
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
