//! toolstage - staged builds of a compiler toolchain
//!
//! This crate provides the core library functionality for toolstage:
//! target configs, toolchain references, the builder lifecycle, and the
//! pipeline that chains the stages together.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for toolstage unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a recording process runner and fake toolchain trees.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildEnv, Builder, BuildStep};
pub use core::{BuildError, Config, Host, Toolchain};
