//! Host operating systems and CPU architectures.
//!
//! The set of operating systems is closed: anything that is not listed here
//! fails to parse instead of being mapped onto a "close enough" OS.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// A target (or build host) operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Host {
    Linux,
    Darwin,
    Windows,
    Android,
}

impl Host {
    /// The OS the orchestration itself is running on.
    #[cfg(target_os = "macos")]
    pub const fn build_host() -> Self {
        Host::Darwin
    }

    #[cfg(target_os = "windows")]
    pub const fn build_host() -> Self {
        Host::Windows
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    pub const fn build_host() -> Self {
        Host::Linux
    }

    /// Lowercase name, also used for output directory suffixes.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Host::Linux => "linux",
            Host::Darwin => "darwin",
            Host::Windows => "windows",
            Host::Android => "android",
        }
    }

    pub fn is_linux(&self) -> bool {
        *self == Host::Linux
    }

    pub fn is_darwin(&self) -> bool {
        *self == Host::Darwin
    }

    pub fn is_windows(&self) -> bool {
        *self == Host::Windows
    }

    pub fn is_android(&self) -> bool {
        *self == Host::Android
    }

    /// Tag used by prebuilt directories (`linux-x86`, `darwin-x86`, ...).
    ///
    /// Android never hosts a build, so it has no tag.
    pub fn os_tag(&self) -> Result<&'static str, ConfigError> {
        match self {
            Host::Linux => Ok("linux-x86"),
            Host::Darwin => Ok("darwin-x86"),
            Host::Windows => Ok("windows-x86"),
            Host::Android => Err(ConfigError::Unsupported {
                property: "os_tag",
                family: "android",
            }),
        }
    }

    /// Value for `CMAKE_SYSTEM_NAME` when cross compiling.
    pub const fn cmake_system_name(&self) -> &'static str {
        match self {
            Host::Linux => "Linux",
            Host::Darwin => "Darwin",
            Host::Windows => "Windows",
            Host::Android => "Android",
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Host {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Host::Linux),
            "darwin" | "macos" => Ok(Host::Darwin),
            "windows" => Ok(Host::Windows),
            "android" => Ok(Host::Android),
            _ => Err(ConfigError::UnknownHost(s.to_string())),
        }
    }
}

/// A CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Arm,
    Aarch64,
    I386,
    X86_64,
    Riscv64,
}

impl Arch {
    /// The CPU the orchestration itself is running on.
    #[cfg(target_arch = "aarch64")]
    pub const fn build_arch() -> Self {
        Arch::Aarch64
    }

    #[cfg(not(target_arch = "aarch64"))]
    pub const fn build_arch() -> Self {
        Arch::X86_64
    }

    /// Triple of the host GCC that ships crt objects and libgcc.
    pub fn gnu_triple(&self) -> String {
        format!("{}-linux-gnu", self.as_str())
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm => "arm",
            Arch::Aarch64 => "aarch64",
            Arch::I386 => "i386",
            Arch::X86_64 => "x86_64",
            Arch::Riscv64 => "riscv64",
        }
    }

    /// Spelling used inside LLVM triples and runtime library names.
    pub const fn llvm_arch(&self) -> &'static str {
        match self {
            Arch::I386 => "i686",
            other => other.as_str(),
        }
    }

    pub fn is_32_bit(&self) -> bool {
        matches!(self, Arch::Arm | Arch::I386)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" | "armv7" => Ok(Arch::Arm),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            "i386" | "i686" | "x86" => Ok(Arch::I386),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "riscv64" => Ok(Arch::Riscv64),
            _ => Err(ConfigError::UnknownArch(s.to_string())),
        }
    }
}
