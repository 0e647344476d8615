//! Shared utilities

pub mod config;
pub mod fs;
pub mod hash;
pub mod process;
pub mod timer;

pub use config::Settings;
pub use process::{Invocation, ProcessOutput, ProcessRunner};
