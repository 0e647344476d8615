//! Ready-made configs for the supported targets.

use std::path::{Path, PathBuf};

use crate::core::config::{
    AndroidTarget, Config, ConfigKind, DarwinTarget, GccInstall, MsvcSdk, Variant,
};
use crate::core::host::{Arch, Host};

/// Filesystem locations the presets are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    /// Rewritten to a relative path in debug info
    pub source_root: Option<PathBuf>,
    /// Architecture of native Linux builds
    pub host_arch: Arch,
    pub gcc_root: PathBuf,
    pub gcc_triple: String,
    pub gcc_version: String,
    pub mingw_root: PathBuf,
    /// Root of the per-arch Android GCC toolchains
    pub android_gcc_root: PathBuf,
    pub sysroots: PathBuf,
    pub libcxx_headers: Vec<PathBuf>,
    pub mac_min_version: String,
}

impl Default for TargetPaths {
    fn default() -> Self {
        TargetPaths {
            source_root: None,
            host_arch: Arch::build_arch(),
            gcc_root: PathBuf::from("/usr"),
            gcc_triple: Arch::build_arch().gnu_triple(),
            gcc_version: "10".to_string(),
            mingw_root: PathBuf::from("prebuilts/gcc/linux-x86/host/x86_64-w64-mingw32-4.8"),
            android_gcc_root: PathBuf::from("prebuilts/gcc/linux-x86"),
            sysroots: PathBuf::from("out/sysroots"),
            libcxx_headers: Vec::new(),
            mac_min_version: "10.14".to_string(),
        }
    }
}

/// Options shared by every config of an Android fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidOptions {
    pub platform: bool,
    pub static_link: bool,
    pub suppress_libcxx_headers: bool,
    pub variant: Variant,
}

impl Default for AndroidOptions {
    fn default() -> Self {
        AndroidOptions {
            platform: true,
            static_link: false,
            suppress_libcxx_headers: false,
            variant: Variant::Default,
        }
    }
}

fn with_prefix_map(config: Config, paths: &TargetPaths) -> Config {
    match &paths.source_root {
        Some(root) => config.with_file_prefix_map(root),
        None => config,
    }
}

pub fn linux_config(paths: &TargetPaths) -> Config {
    let gcc = GccInstall::new(&paths.gcc_root, &paths.gcc_triple, &paths.gcc_version);
    let config = Config::new("linux", Host::Linux, paths.host_arch, ConfigKind::Linux(gcc))
        .with_sysroot("/");
    with_prefix_map(config, paths)
}

pub fn darwin_config(paths: &TargetPaths) -> Config {
    let target = DarwinTarget {
        mac_min_version: paths.mac_min_version.clone(),
    };
    let config = Config::new("darwin", Host::Darwin, Arch::X86_64, ConfigKind::Darwin(target));
    with_prefix_map(config, paths)
}

pub fn mingw_config(paths: &TargetPaths) -> Config {
    let triple = "x86_64-w64-mingw32";
    let gcc = GccInstall::new(&paths.mingw_root, triple, "4.8.3");
    let config = Config::new("mingw", Host::Windows, Arch::X86_64, ConfigKind::MinGw(gcc))
        .with_sysroot(paths.mingw_root.join(triple));
    with_prefix_map(config, paths)
}

/// MSVC config. The file prefix map is not applied: clang-cl is not a GNU driver.
pub fn msvc_config(sdk: impl AsRef<Path>) -> Config {
    let sdk = MsvcSdk {
        path: sdk.as_ref().to_path_buf(),
    };
    Config::new("msvc", Host::Windows, Arch::X86_64, ConfigKind::Msvc(sdk))
}

/// Config for the machine running the build.
pub fn host_config(paths: &TargetPaths) -> Config {
    config_for_host(Host::build_host(), paths)
}

/// Native config for `host`. Windows hosts build with MinGW.
pub fn config_for_host(host: Host, paths: &TargetPaths) -> Config {
    match host {
        Host::Darwin => darwin_config(paths),
        Host::Windows => mingw_config(paths),
        Host::Linux | Host::Android => linux_config(paths),
    }
}

fn android_gcc_toolchain(arch: Arch) -> Option<&'static str> {
    match arch {
        Arch::Arm => Some("arm/arm-linux-androideabi-4.9/arm-linux-androideabi"),
        Arch::Aarch64 => Some("aarch64/aarch64-linux-android-4.9/aarch64-linux-android"),
        Arch::I386 | Arch::X86_64 => Some("x86/x86_64-linux-android-4.9/x86_64-linux-android"),
        Arch::Riscv64 => None,
    }
}

pub fn android_config(arch: Arch, options: &AndroidOptions, paths: &TargetPaths) -> Config {
    let target = AndroidTarget {
        platform: options.platform,
        static_link: options.static_link,
        suppress_libcxx_headers: options.suppress_libcxx_headers,
        gcc_toolchain: android_gcc_toolchain(arch).map(|rel| paths.android_gcc_root.join(rel)),
        libcxx_headers: paths.libcxx_headers.clone(),
    };
    let mut config = Config::new(
        format!("android-{}", arch),
        Host::Android,
        arch,
        ConfigKind::Android(target),
    )
    .with_variant(options.variant);

    let flavour = if options.platform { "platform" } else { "ndk" };
    if let Ok(ndk_arch) = config.ndk_arch() {
        config.sysroot = Some(paths.sysroots.join(flavour).join(ndk_arch));
    }
    with_prefix_map(config, paths)
}

/// One config per Android architecture, in a fixed order.
pub fn android_configs(options: &AndroidOptions, paths: &TargetPaths) -> Vec<Config> {
    [Arch::Arm, Arch::Aarch64, Arch::I386, Arch::X86_64]
        .into_iter()
        .map(|arch| android_config(arch, options, paths))
        .collect()
}
