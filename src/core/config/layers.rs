//! Flag layers.
//!
//! Each config family folds a fixed chain of layers, base first. A layer only
//! appends flags, or overrides env/define entries by key. Every hook defaults
//! to contributing nothing.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::config::{Config, ConfigKind};
use crate::core::error::ConfigError;
use crate::core::host::Arch;

/// One capability contributing to a config's derived flags.
pub trait FlagLayer: Sync {
    fn name(&self) -> &'static str;

    fn bin_dirs(&self, _config: &Config, _dirs: &mut Vec<PathBuf>) {}

    fn lib_dirs(&self, _config: &Config, _dirs: &mut Vec<PathBuf>) {}

    fn compiler_flags(&self, _config: &Config, _flags: &mut Vec<String>) {}

    fn cxx_flags(&self, _config: &Config, _flags: &mut Vec<String>) {}

    fn linker_flags(&self, _config: &Config, _flags: &mut Vec<String>) {}

    fn env(&self, _config: &Config, _env: &mut BTreeMap<String, String>) -> Result<(), ConfigError> {
        Ok(())
    }

    fn cmake_defines(&self, _config: &Config, _defines: &mut BTreeMap<String, String>) {}
}

/// What a single layer adds to a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerContribution {
    pub layer: &'static str,
    pub compiler_flags: Vec<String>,
    pub cxx_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    pub cmake_defines: BTreeMap<String, String>,
}

impl LayerContribution {
    pub fn collect(layer: &dyn FlagLayer, config: &Config) -> Self {
        let mut contribution = LayerContribution {
            layer: layer.name(),
            compiler_flags: Vec::new(),
            cxx_flags: Vec::new(),
            linker_flags: Vec::new(),
            cmake_defines: BTreeMap::new(),
        };
        layer.compiler_flags(config, &mut contribution.compiler_flags);
        layer.cxx_flags(config, &mut contribution.cxx_flags);
        layer.linker_flags(config, &mut contribution.linker_flags);
        layer.cmake_defines(config, &mut contribution.cmake_defines);
        contribution
    }
}

/// Root of every chain.
pub struct BaseLayer;

impl FlagLayer for BaseLayer {
    fn name(&self) -> &'static str {
        "base"
    }
}

/// GNU-style drivers: prefix maps, search directories and lld.
pub struct GnuLayer;

impl FlagLayer for GnuLayer {
    fn name(&self) -> &'static str {
        "gnu"
    }

    fn compiler_flags(&self, config: &Config, flags: &mut Vec<String>) {
        if let Some(root) = &config.file_prefix_map {
            flags.push(format!("-ffile-prefix-map={}/=", root.display()));
        }
        flags.extend(config.bin_dirs().iter().map(|d| format!("-B{}", d.display())));
    }

    fn linker_flags(&self, config: &Config, flags: &mut Vec<String>) {
        for dir in config.lib_dirs() {
            flags.push(format!("-B{}", dir.display()));
            flags.push(format!("-L{}", dir.display()));
        }
        if config.use_lld() {
            flags.push("-fuse-ld=lld".to_string());
        }
    }
}

pub struct DarwinLayer;

impl FlagLayer for DarwinLayer {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn compiler_flags(&self, _config: &Config, flags: &mut Vec<String>) {
        // Fail when an API newer than -mmacosx-version-min is used.
        flags.push("-Werror=unguarded-availability".to_string());
    }
}

/// GCC-provided crt objects and libgcc.
pub struct GccLayer;

impl FlagLayer for GccLayer {
    fn name(&self) -> &'static str {
        "gcc"
    }

    fn bin_dirs(&self, config: &Config, dirs: &mut Vec<PathBuf>) {
        if let Ok(gcc) = config.gcc_install() {
            dirs.extend(gcc.bin_dirs());
        }
    }

    fn lib_dirs(&self, config: &Config, dirs: &mut Vec<PathBuf>) {
        if let Ok(gcc) = config.gcc_install() {
            dirs.extend(gcc.lib_dirs());
        }
    }
}

pub struct LinuxLayer;

impl FlagLayer for LinuxLayer {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn linker_flags(&self, _config: &Config, flags: &mut Vec<String>) {
        flags.push("-Wl,--hash-style=both".to_string());
    }
}

pub struct MinGwLayer;

impl FlagLayer for MinGwLayer {
    fn name(&self) -> &'static str {
        "mingw"
    }

    fn compiler_flags(&self, _config: &Config, flags: &mut Vec<String>) {
        flags.extend(
            [
                "--target=x86_64-pc-windows-gnu",
                "-D_LARGEFILE_SOURCE",
                "-D_FILE_OFFSET_BITS=64",
                "-D_WIN32_WINNT=0x0600",
                "-DWINVER=0x0600",
                "-D__MSVCRT_VERSION__=0x1400",
            ]
            .map(String::from),
        );
    }
}

pub struct MsvcLayer;

impl FlagLayer for MsvcLayer {
    fn name(&self) -> &'static str {
        "msvc"
    }

    fn compiler_flags(&self, _config: &Config, flags: &mut Vec<String>) {
        flags.extend(
            [
                "-w",
                "-fuse-ld=lld",
                "--target=x86_64-pc-windows-msvc",
                "-fms-compatibility-version=19.10",
                "-D_HAS_EXCEPTIONS=1",
                "-D_CRT_STDIO_ISO_WIDE_SPECIFIERS",
            ]
            .map(String::from),
        );
    }

    fn linker_flags(&self, _config: &Config, flags: &mut Vec<String>) {
        flags.push("/MANIFEST:NO".to_string());
    }

    fn env(&self, config: &Config, env: &mut BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let ConfigKind::Msvc(sdk) = &config.kind {
            env.extend(sdk.read_env()?);
        }
        Ok(())
    }

    fn cmake_defines(&self, _config: &Config, defines: &mut BTreeMap<String, String>) {
        defines.insert("CMAKE_POLICY_DEFAULT_CMP0091".to_string(), "NEW".to_string());
        defines.insert("CMAKE_MSVC_RUNTIME_LIBRARY".to_string(), "MultiThreaded".to_string());
    }
}

/// Android target triple, linker policy and platform headers.
pub struct AndroidLayer;

impl FlagLayer for AndroidLayer {
    fn name(&self) -> &'static str {
        "android"
    }

    fn compiler_flags(&self, config: &Config, flags: &mut Vec<String>) {
        let Ok(android) = config.android() else {
            return;
        };
        if let Ok(triple) = config.llvm_triple() {
            flags.push(format!("--target={}", triple));
        }
        if let Some(gcc) = &android.gcc_toolchain {
            flags.push(format!("-B{}", gcc.join("bin").display()));
        }
        flags.push("-ffunction-sections".to_string());
        flags.push("-fdata-sections".to_string());
    }

    fn cxx_flags(&self, config: &Config, flags: &mut Vec<String>) {
        let Ok(android) = config.android() else {
            return;
        };
        // NDK sysroots carry the C++ headers, the platform does not.
        if !android.platform {
            return;
        }
        flags.push("-nostdinc++".to_string());
        if android.suppress_libcxx_headers {
            return;
        }
        for dir in &android.libcxx_headers {
            flags.push("-isystem".to_string());
            flags.push(dir.display().to_string());
        }
    }

    fn linker_flags(&self, config: &Config, flags: &mut Vec<String>) {
        let Ok(android) = config.android() else {
            return;
        };
        flags.extend(
            [
                "-rtlib=compiler-rt",
                "-Wl,-z,defs",
                "-Wl,--gc-sections",
                "-Wl,--build-id=sha1",
                "-pie",
            ]
            .map(String::from),
        );
        if android.static_link {
            flags.push("-static".to_string());
        }
    }
}

/// Per-architecture Android tweaks.
pub struct AndroidArchLayer;

impl FlagLayer for AndroidArchLayer {
    fn name(&self) -> &'static str {
        "android-arch"
    }

    fn compiler_flags(&self, config: &Config, flags: &mut Vec<String>) {
        match config.target_arch {
            Arch::Arm => flags.push("-march=armv7-a".to_string()),
            Arch::Aarch64 => flags.push("-mbranch-protection=standard".to_string()),
            Arch::I386 => flags.push("-m32".to_string()),
            Arch::X86_64 | Arch::Riscv64 => {}
        }
    }
}

static DARWIN_CHAIN: [&dyn FlagLayer; 3] = [&BaseLayer, &GnuLayer, &DarwinLayer];
static LINUX_CHAIN: [&dyn FlagLayer; 4] = [&BaseLayer, &GnuLayer, &GccLayer, &LinuxLayer];
static MINGW_CHAIN: [&dyn FlagLayer; 4] = [&BaseLayer, &GnuLayer, &GccLayer, &MinGwLayer];
static MSVC_CHAIN: [&dyn FlagLayer; 2] = [&BaseLayer, &MsvcLayer];
static ANDROID_CHAIN: [&dyn FlagLayer; 4] =
    [&BaseLayer, &GnuLayer, &AndroidLayer, &AndroidArchLayer];

pub(crate) fn chain_for(kind: &ConfigKind) -> &'static [&'static dyn FlagLayer] {
    match kind {
        ConfigKind::Darwin(_) => &DARWIN_CHAIN,
        ConfigKind::Linux(_) => &LINUX_CHAIN,
        ConfigKind::MinGw(_) => &MINGW_CHAIN,
        ConfigKind::Msvc(_) => &MSVC_CHAIN,
        ConfigKind::Android(_) => &ANDROID_CHAIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{linux_config, TargetPaths};

    #[test]
    fn test_base_contributes_nothing() {
        let config = linux_config(&TargetPaths::default());
        let base = LayerContribution::collect(&BaseLayer, &config);
        assert!(base.compiler_flags.is_empty());
        assert!(base.linker_flags.is_empty());
        assert!(base.cmake_defines.is_empty());
    }

    #[test]
    fn test_gnu_search_dirs_come_from_gcc_layer() {
        let config = linux_config(&TargetPaths::default());
        let gnu = LayerContribution::collect(&GnuLayer, &config);
        let lib_dirs = config.lib_dirs();
        assert_eq!(lib_dirs.len(), 2);
        assert_eq!(gnu.linker_flags.len(), lib_dirs.len() * 2 + 1);
        assert_eq!(gnu.linker_flags[0], format!("-B{}", lib_dirs[0].display()));
        assert_eq!(gnu.linker_flags[1], format!("-L{}", lib_dirs[0].display()));
    }

    #[test]
    fn test_file_prefix_map_comes_first() {
        let config = linux_config(&TargetPaths::default()).with_file_prefix_map("/src/root");
        assert_eq!(config.compiler_flags()[0], "-ffile-prefix-map=/src/root/=");
    }
}
