//! Per-target build configurations.
//!
//! A [`Config`] stores a handful of facts about a target (OS, architecture,
//! sysroot, family payload) and derives everything else: compiler and linker
//! flags, environment, CMake defines, triples and output suffixes. Derivations
//! are pure, so asking twice gives the same answer.
//!
//! Flags come from folding the family's fixed chain of [`FlagLayer`]s, base
//! first. See [`layers`] for the individual contributions.

pub mod layers;
pub mod presets;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::host::{Arch, Host};
use crate::core::toolchain::Toolchain;

pub use layers::{FlagLayer, LayerContribution};
pub use presets::{
    android_config, android_configs, config_for_host, darwin_config, host_config, linux_config,
    mingw_config, msvc_config, AndroidOptions, TargetPaths,
};

/// Builder-specific flavour of a config.
///
/// Builders that care declare which variants they accept, and anything else
/// is rejected when the builder is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Default,
    /// Builtins with exported symbols
    Exported,
    /// Builtins with hidden symbols
    Hidden,
    Shared,
    Static,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Default,
        Variant::Exported,
        Variant::Hidden,
        Variant::Shared,
        Variant::Static,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Variant::Default => "default",
            Variant::Exported => "exported",
            Variant::Hidden => "hidden",
            Variant::Shared => "shared",
            Variant::Static => "static",
        }
    }

    /// Appended to the output directory name so variants never collide.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Variant::Default | Variant::Hidden => "",
            Variant::Exported => "-exported",
            Variant::Shared => "-shared",
            Variant::Static => "-static",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownVariant(s.to_string()))
    }
}

/// A GCC installation providing crt objects and libgcc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GccInstall {
    pub root: PathBuf,
    pub triple: String,
    pub version: String,
    pub is_32_bit: bool,
}

impl GccInstall {
    pub fn new(root: impl Into<PathBuf>, triple: impl Into<String>, version: impl Into<String>) -> Self {
        GccInstall {
            root: root.into(),
            triple: triple.into(),
            version: version.into(),
            is_32_bit: false,
        }
    }

    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        vec![self.root.join(&self.triple).join("bin")]
    }

    pub fn lib_dirs(&self) -> Vec<PathBuf> {
        let mut gcc_lib_dir = self
            .root
            .join("lib")
            .join("gcc")
            .join(&self.triple)
            .join(&self.version);
        if self.is_32_bit {
            gcc_lib_dir = gcc_lib_dir.join("32");
        }
        vec![gcc_lib_dir, self.root.join("lib").join(&self.triple)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarwinTarget {
    pub mac_min_version: String,
}

/// Location of an unpacked Windows SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcSdk {
    pub path: PathBuf,
}

impl MsvcSdk {
    /// Environment described by `bin/SetEnv.x64.json`.
    ///
    /// Each entry is a list of path component lists, joined under `bin/` and
    /// then with `;`.
    pub fn read_env(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        #[derive(Deserialize)]
        struct SetEnv {
            env: BTreeMap<String, Vec<Vec<String>>>,
        }

        let base = self.path.join("bin");
        let file = base.join("SetEnv.x64.json");
        let sdk_error = |message: String| ConfigError::SdkEnvironment {
            path: file.clone(),
            message,
        };

        let contents = std::fs::read_to_string(&file).map_err(|e| sdk_error(e.to_string()))?;
        let parsed: SetEnv = serde_json::from_str(&contents).map_err(|e| sdk_error(e.to_string()))?;

        Ok(parsed
            .env
            .into_iter()
            .map(|(key, entries)| {
                let value = entries
                    .iter()
                    .map(|parts| {
                        parts
                            .iter()
                            .fold(base.clone(), |acc, part| acc.join(part))
                            .display()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join(";");
                (key, value)
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidTarget {
    /// Platform runtimes (as opposed to NDK runtimes)
    pub platform: bool,
    pub static_link: bool,
    pub suppress_libcxx_headers: bool,
    /// GCC toolchain directory whose `bin/` is searched for assembler and linker helpers
    pub gcc_toolchain: Option<PathBuf>,
    /// libc++ and bionic headers injected for platform builds
    pub libcxx_headers: Vec<PathBuf>,
}

/// Family-specific payload of a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    Darwin(DarwinTarget),
    Linux(GccInstall),
    MinGw(GccInstall),
    Msvc(MsvcSdk),
    Android(AndroidTarget),
}

impl ConfigKind {
    pub const fn family(&self) -> &'static str {
        match self {
            ConfigKind::Darwin(_) => "darwin",
            ConfigKind::Linux(_) => "linux",
            ConfigKind::MinGw(_) => "mingw",
            ConfigKind::Msvc(_) => "msvc",
            ConfigKind::Android(_) => "android",
        }
    }
}

/// One target configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: String,
    pub target_os: Host,
    pub target_arch: Arch,
    pub sysroot: Option<PathBuf>,
    pub variant: Variant,
    /// Source root rewritten to a relative path in debug info
    pub file_prefix_map: Option<PathBuf>,
    pub kind: ConfigKind,
}

impl Config {
    pub fn new(name: impl Into<String>, target_os: Host, target_arch: Arch, kind: ConfigKind) -> Self {
        Config {
            name: name.into(),
            target_os,
            target_arch,
            sysroot: None,
            variant: Variant::Default,
            file_prefix_map: None,
            kind,
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_sysroot(mut self, sysroot: impl Into<PathBuf>) -> Self {
        self.sysroot = Some(sysroot.into());
        self
    }

    pub fn with_file_prefix_map(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_prefix_map = Some(root.into());
        self
    }

    pub fn family(&self) -> &'static str {
        self.kind.family()
    }

    pub fn sysroot(&self) -> Option<&Path> {
        self.sysroot.as_deref()
    }

    pub fn c_compiler(&self, toolchain: &Toolchain) -> PathBuf {
        match self.kind {
            ConfigKind::Msvc(_) => toolchain.cl(),
            _ => toolchain.cc(),
        }
    }

    pub fn cxx_compiler(&self, toolchain: &Toolchain) -> PathBuf {
        match self.kind {
            ConfigKind::Msvc(_) => toolchain.cl(),
            _ => toolchain.cxx(),
        }
    }

    /// Whether `-fuse-ld=lld` is passed through the compiler driver.
    ///
    /// MSVC still links with lld, but through `lld-link` directly.
    pub fn use_lld(&self) -> bool {
        !matches!(self.kind, ConfigKind::Darwin(_) | ConfigKind::Msvc(_))
    }

    pub fn linker(&self, toolchain: &Toolchain) -> Option<PathBuf> {
        match self.kind {
            ConfigKind::Msvc(_) => Some(toolchain.lld_link()),
            _ if self.use_lld() => Some(toolchain.lld()),
            _ => None,
        }
    }

    pub fn gcc_install(&self) -> Result<&GccInstall, ConfigError> {
        match &self.kind {
            ConfigKind::Linux(gcc) | ConfigKind::MinGw(gcc) => Ok(gcc),
            other => Err(ConfigError::Unsupported {
                property: "gcc_install",
                family: other.family(),
            }),
        }
    }

    pub fn android(&self) -> Result<&AndroidTarget, ConfigError> {
        match &self.kind {
            ConfigKind::Android(target) => Ok(target),
            other => Err(ConfigError::Unsupported {
                property: "android target",
                family: other.family(),
            }),
        }
    }

    /// Android API level the runtimes are built against.
    pub fn api_level(&self) -> Result<u32, ConfigError> {
        let android = self.android().map_err(|_| ConfigError::Unsupported {
            property: "api_level",
            family: self.family(),
        })?;
        if android.static_link || android.platform {
            // Platform runtimes also ship in apexes targeting 29.
            return Ok(29);
        }
        if matches!(self.target_arch, Arch::Arm | Arch::I386) {
            return Ok(19);
        }
        Ok(21)
    }

    pub fn ndk_arch(&self) -> Result<&'static str, ConfigError> {
        self.android()?;
        Ok(match self.target_arch {
            Arch::Arm => "arm",
            Arch::Aarch64 => "arm64",
            Arch::I386 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Riscv64 => "riscv64",
        })
    }

    /// Triple naming the NDK sysroot subdirectory.
    pub fn ndk_sysroot_triple(&self) -> Result<String, ConfigError> {
        self.android()?;
        if self.target_arch == Arch::Arm {
            return Ok("arm-linux-androideabi".to_string());
        }
        Ok(format!("{}-linux-android", self.target_arch.llvm_arch()))
    }

    pub fn llvm_triple(&self) -> Result<String, ConfigError> {
        match &self.kind {
            ConfigKind::Darwin(_) => Err(ConfigError::Unsupported {
                property: "llvm_triple",
                family: "darwin",
            }),
            ConfigKind::Linux(_) => Ok(format!("{}-unknown-linux-gnu", self.target_arch.llvm_arch())),
            ConfigKind::MinGw(_) => Ok("x86_64-pc-windows-gnu".to_string()),
            ConfigKind::Msvc(_) => Ok("x86_64-pc-windows-msvc".to_string()),
            ConfigKind::Android(_) => Ok(format!(
                "{}-linux-android{}",
                self.target_arch.llvm_arch(),
                self.api_level()?
            )),
        }
    }

    /// Suffix of the output directory name for this config.
    pub fn output_suffix(&self) -> String {
        let mut suffix = match &self.kind {
            ConfigKind::Android(android) => {
                let mut s = format!("-{}", self.target_arch);
                if !android.platform {
                    s.push_str("-ndk-cxx");
                }
                s
            }
            _ => format!("-{}", self.target_os),
        };
        suffix.push_str(self.variant.suffix());
        suffix
    }

    /// The layer chain this config's flags are folded from.
    pub fn layers(&self) -> &'static [&'static dyn FlagLayer] {
        layers::chain_for(&self.kind)
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers().iter().map(|layer| layer.name()).collect()
    }

    /// `-B` directories contributed by the chain.
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for layer in self.layers() {
            layer.bin_dirs(self, &mut dirs);
        }
        dirs
    }

    /// `-B`/`-L` directories contributed by the chain.
    pub fn lib_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for layer in self.layers() {
            layer.lib_dirs(self, &mut dirs);
        }
        dirs
    }

    pub fn compiler_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for layer in self.layers() {
            layer.compiler_flags(self, &mut flags);
        }
        flags
    }

    /// C++ flags: the compiler flags followed by C++-only contributions.
    pub fn cxx_flags(&self) -> Vec<String> {
        let mut flags = self.compiler_flags();
        for layer in self.layers() {
            layer.cxx_flags(self, &mut flags);
        }
        flags
    }

    pub fn linker_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for layer in self.layers() {
            layer.linker_flags(self, &mut flags);
        }
        flags
    }

    /// Environment entries the config needs; later layers win on conflicts.
    pub fn env(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut env = BTreeMap::new();
        for layer in self.layers() {
            layer.env(self, &mut env)?;
        }
        Ok(env)
    }

    pub fn cmake_defines(&self) -> BTreeMap<String, String> {
        let mut defines = BTreeMap::new();
        for layer in self.layers() {
            layer.cmake_defines(self, &mut defines);
        }
        defines
    }

    /// What each layer of the chain adds, in fold order.
    pub fn contributions(&self) -> Vec<LayerContribution> {
        self.layers()
            .iter()
            .map(|layer| LayerContribution::collect(*layer, self))
            .collect()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigKind::Android(android) => write!(
                f,
                "{} (platform={} static={} variant={})",
                self.name, android.platform, android.static_link, self.variant
            ),
            _ if self.variant != Variant::Default => write!(f, "{} ({})", self.name, self.variant),
            _ => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn android(arch: Arch, platform: bool, static_link: bool) -> Config {
        android_config(
            arch,
            &AndroidOptions {
                platform,
                static_link,
                ..AndroidOptions::default()
            },
            &TargetPaths::default(),
        )
    }

    /// Whether `needle` appears in `haystack` in order (not necessarily adjacent).
    fn is_subsequence(needle: &[String], haystack: &[String]) -> bool {
        let mut it = haystack.iter();
        needle.iter().all(|n| it.any(|h| h == n))
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("exported".parse::<Variant>().unwrap(), Variant::Exported);
        assert!(matches!(
            "weird".parse::<Variant>(),
            Err(ConfigError::UnknownVariant(_))
        ));
        assert_eq!(Variant::Exported.suffix(), "-exported");
        assert_eq!(Variant::Hidden.suffix(), "");
    }

    #[test]
    fn test_api_levels() {
        assert_eq!(android(Arch::Arm, false, false).api_level().unwrap(), 19);
        assert_eq!(android(Arch::I386, false, false).api_level().unwrap(), 19);
        assert_eq!(android(Arch::Aarch64, false, false).api_level().unwrap(), 21);
        assert_eq!(android(Arch::Aarch64, true, false).api_level().unwrap(), 29);
        assert_eq!(android(Arch::Arm, false, true).api_level().unwrap(), 29);
    }

    #[test]
    fn test_android_triples_and_suffix() {
        let arm = android(Arch::Arm, false, false);
        assert_eq!(arm.llvm_triple().unwrap(), "arm-linux-android19");
        assert_eq!(arm.ndk_arch().unwrap(), "arm");
        assert_eq!(arm.ndk_sysroot_triple().unwrap(), "arm-linux-androideabi");
        assert_eq!(arm.output_suffix(), "-arm-ndk-cxx");

        let x86 = android(Arch::I386, true, false);
        assert_eq!(x86.llvm_triple().unwrap(), "i686-linux-android29");
        assert_eq!(x86.ndk_arch().unwrap(), "x86");
        assert_eq!(x86.output_suffix(), "-i386");
    }

    #[test]
    fn test_unsupported_properties() {
        let darwin = darwin_config(&TargetPaths::default());
        assert!(matches!(
            darwin.llvm_triple(),
            Err(ConfigError::Unsupported { property: "llvm_triple", .. })
        ));
        assert!(darwin.gcc_install().is_err());
        assert!(darwin.api_level().is_err());

        let msvc = msvc_config("/sdk");
        assert!(matches!(
            msvc.gcc_install(),
            Err(ConfigError::Unsupported { family: "msvc", .. })
        ));
        assert!(android(Arch::X86_64, true, false).gcc_install().is_err());
    }

    #[test]
    fn test_linux_flags() {
        let paths = TargetPaths::default();
        let linux = linux_config(&paths);
        let cflags = linux.compiler_flags();
        let ldflags = linux.linker_flags();

        assert_eq!(linux.sysroot(), Some(Path::new("/")));
        assert!(cflags.contains(&format!(
            "-B{}",
            paths.gcc_root.join(&paths.gcc_triple).join("bin").display()
        )));
        assert!(ldflags.contains(&"-fuse-ld=lld".to_string()));
        assert_eq!(ldflags.last().unwrap(), "-Wl,--hash-style=both");
        // Linux leaves the triple to the compiler default.
        assert!(!cflags.iter().any(|f| f.starts_with("--target=")));
        assert_eq!(linux.output_suffix(), "-linux");
    }

    #[test]
    fn test_darwin_flags() {
        let darwin = darwin_config(&TargetPaths::default());
        assert!(!darwin.use_lld());
        assert!(!darwin.linker_flags().contains(&"-fuse-ld=lld".to_string()));
        assert!(darwin
            .compiler_flags()
            .contains(&"-Werror=unguarded-availability".to_string()));
        assert_eq!(darwin.linker(&Toolchain::prebuilt("/tc")), None);
    }

    #[test]
    fn test_mingw_flags() {
        let mingw = mingw_config(&TargetPaths::default());
        let cflags = mingw.compiler_flags();
        assert!(cflags.contains(&"--target=x86_64-pc-windows-gnu".to_string()));
        assert!(cflags.contains(&"-D_WIN32_WINNT=0x0600".to_string()));
        assert_eq!(mingw.target_os, Host::Windows);
        assert_eq!(mingw.output_suffix(), "-windows");
    }

    #[test]
    fn test_msvc_flags_and_tools() {
        let msvc = msvc_config("/sdk");
        let tc = Toolchain::prebuilt("/tc");
        assert_eq!(msvc.c_compiler(&tc), tc.cl());
        assert_eq!(msvc.linker(&tc), Some(tc.lld_link()));
        assert!(msvc
            .compiler_flags()
            .contains(&"--target=x86_64-pc-windows-msvc".to_string()));
        assert_eq!(msvc.linker_flags(), vec!["/MANIFEST:NO".to_string()]);
        let defines = msvc.cmake_defines();
        assert_eq!(defines["CMAKE_POLICY_DEFAULT_CMP0091"], "NEW");
        assert_eq!(defines["CMAKE_MSVC_RUNTIME_LIBRARY"], "MultiThreaded");
    }

    #[test]
    fn test_msvc_env_from_sdk() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("bin")).unwrap();
        std::fs::write(
            tmp.path().join("bin/SetEnv.x64.json"),
            r#"{"env": {"PATH": [["VC", "bin"], ["SDK", "bin"]], "LIB": [["VC", "lib"]]}}"#,
        )
        .unwrap();

        let env = msvc_config(tmp.path()).env().unwrap();
        let bin = tmp.path().join("bin");
        assert_eq!(
            env["PATH"],
            format!(
                "{};{}",
                bin.join("VC").join("bin").display(),
                bin.join("SDK").join("bin").display()
            )
        );
        assert_eq!(env["LIB"], bin.join("VC").join("lib").display().to_string());
    }

    #[test]
    fn test_msvc_env_missing_sdk() {
        let msvc = msvc_config("/nonexistent/sdk");
        assert!(matches!(
            msvc.env(),
            Err(ConfigError::SdkEnvironment { .. })
        ));
    }

    #[test]
    fn test_android_flags() {
        let paths = TargetPaths::default();
        let arm = android(Arch::Arm, false, false);
        let cflags = arm.compiler_flags();
        assert!(cflags.contains(&"--target=arm-linux-android19".to_string()));
        assert!(cflags.contains(&"-ffunction-sections".to_string()));
        assert_eq!(cflags.last().unwrap(), "-march=armv7-a");

        let ldflags = arm.linker_flags();
        assert!(ldflags.contains(&"-rtlib=compiler-rt".to_string()));
        assert!(ldflags.contains(&"-pie".to_string()));
        assert!(!ldflags.contains(&"-static".to_string()));
        assert!(android(Arch::Arm, false, true)
            .linker_flags()
            .contains(&"-static".to_string()));

        assert!(android(Arch::Aarch64, true, false)
            .compiler_flags()
            .contains(&"-mbranch-protection=standard".to_string()));
        assert_eq!(
            android(Arch::I386, true, false).compiler_flags().last().unwrap(),
            "-m32"
        );

        assert_eq!(
            arm.sysroot(),
            Some(paths.sysroots.join("ndk").join("arm").as_path())
        );
    }

    #[test]
    fn test_platform_cxx_headers() {
        let paths = TargetPaths {
            libcxx_headers: vec![PathBuf::from("/prebuilts/include/c++/v1")],
            ..TargetPaths::default()
        };
        let platform = android_config(
            Arch::Aarch64,
            &AndroidOptions {
                platform: true,
                ..AndroidOptions::default()
            },
            &paths,
        );
        let cxx = platform.cxx_flags();
        assert!(cxx.contains(&"-nostdinc++".to_string()));
        assert!(cxx.contains(&"-isystem".to_string()));
        assert!(cxx.contains(&"/prebuilts/include/c++/v1".to_string()));

        let suppressed = android_config(
            Arch::Aarch64,
            &AndroidOptions {
                platform: true,
                suppress_libcxx_headers: true,
                ..AndroidOptions::default()
            },
            &paths,
        );
        let cxx = suppressed.cxx_flags();
        assert!(cxx.contains(&"-nostdinc++".to_string()));
        assert!(!cxx.contains(&"-isystem".to_string()));

        let ndk = android(Arch::Aarch64, false, false);
        assert_eq!(ndk.cxx_flags(), ndk.compiler_flags());
    }

    #[test]
    fn test_flags_are_deterministic() {
        let paths = TargetPaths::default();
        let configs = vec![
            linux_config(&paths),
            darwin_config(&paths),
            mingw_config(&paths),
            msvc_config("/sdk"),
            android(Arch::Arm, true, false),
        ];
        for config in configs {
            assert_eq!(config.compiler_flags(), config.compiler_flags());
            assert_eq!(config.cxx_flags(), config.cxx_flags());
            assert_eq!(config.linker_flags(), config.linker_flags());
            assert_eq!(config.cmake_defines(), config.cmake_defines());
        }
    }

    #[test]
    fn test_ancestor_flags_are_ordered_subsequence() {
        for config in [
            linux_config(&TargetPaths::default()),
            mingw_config(&TargetPaths::default()),
            android(Arch::I386, true, true),
        ] {
            let full_c = config.compiler_flags();
            let full_ld = config.linker_flags();
            let mut prefix_c = Vec::new();
            let mut prefix_ld = Vec::new();
            for contribution in config.contributions() {
                prefix_c.extend(contribution.compiler_flags);
                prefix_ld.extend(contribution.linker_flags);
                assert!(is_subsequence(&prefix_c, &full_c), "{}", config);
                assert!(is_subsequence(&prefix_ld, &full_ld), "{}", config);
            }
            assert_eq!(prefix_c, full_c);
            assert_eq!(prefix_ld, full_ld);
        }
    }

    #[test]
    fn test_layer_chains() {
        let paths = TargetPaths::default();
        assert_eq!(
            linux_config(&paths).layer_names(),
            vec!["base", "gnu", "gcc", "linux"]
        );
        assert_eq!(msvc_config("/sdk").layer_names(), vec!["base", "msvc"]);
        assert_eq!(
            android(Arch::Arm, true, false).layer_names(),
            vec!["base", "gnu", "android", "android-arch"]
        );
    }

    #[test]
    fn test_variant_changes_suffix() {
        let config = android(Arch::Aarch64, true, false).with_variant(Variant::Exported);
        assert_eq!(config.output_suffix(), "-aarch64-exported");
        assert!(config.to_string().contains("variant=exported"));
    }
}
