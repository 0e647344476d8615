//! Core data model for toolstage.
//!
//! This module contains the types every builder is parameterized over:
//! - Host operating systems and architectures
//! - Per-target configs and their derived flags
//! - Toolchain references handed between stages
//! - Library descriptions for already-built dependencies

pub mod config;
pub mod error;
pub mod host;
pub mod lib_info;
pub mod toolchain;

pub use config::{Config, ConfigKind, Variant};
pub use error::{BuildError, BuildResult, ConfigError, ToolchainError};
pub use host::{Arch, Host};
pub use lib_info::LibInfo;
pub use toolchain::{Toolchain, ToolchainOrigin, ToolchainRef};
