//! Configuration file support for toolstage.
//!
//! toolstage reads two configuration files:
//! - Global: `~/.toolstage/config.toml` - User-wide defaults
//! - Project: `toolstage.toml` in the working directory
//!
//! Project settings take precedence over global settings, and the `OUT_DIR`
//! environment variable overrides `paths.out_dir`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::config::TargetPaths;
use crate::core::host::Arch;
use crate::core::toolchain::Toolchain;
use crate::util::process;

/// Name of the project settings file.
pub const SETTINGS_FILE: &str = "toolstage.toml";

/// toolstage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub gcc: GccConfig,
    pub tools: ToolsConfig,
    pub build: BuildConfig,
    pub prebuilt: PrebuiltConfig,
}

/// Directory layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for all build output (default `out`)
    pub out_dir: Option<PathBuf>,

    /// Checked-out sources, one subdirectory per project
    pub source_dir: Option<PathBuf>,

    /// Tree root rewritten out of debug info paths
    pub android_dir: Option<PathBuf>,

    /// Android sysroots (default `<out_dir>/sysroots`)
    pub sysroots: Option<PathBuf>,

    /// Unpacked Windows SDK, enables MSVC targets
    pub msvc_sdk: Option<PathBuf>,

    /// Headers injected into platform C++ builds
    #[serde(default)]
    pub libcxx_headers: Vec<PathBuf>,
}

/// GCC installations providing crt objects and libgcc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GccConfig {
    /// Native Linux architecture, defaults to the machine running the build
    pub arch: Option<Arch>,
    pub root: Option<PathBuf>,
    pub triple: Option<String>,
    pub version: Option<String>,
    pub mingw_root: Option<PathBuf>,
    pub android_root: Option<PathBuf>,
}

/// External tool overrides. Unset tools are looked up in PATH.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub cmake: Option<PathBuf>,
    pub make: Option<PathBuf>,
    pub ninja: Option<PathBuf>,

    /// CMake generator (default `Unix Makefiles`)
    pub generator: Option<String>,

    pub install_name_tool: Option<PathBuf>,
    pub python: Option<PathBuf>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of parallel jobs passed to the build tool (None = auto-detect)
    pub jobs: Option<usize>,

    pub mac_min_version: Option<String>,

    pub enable_assertions: Option<bool>,

    pub lto: Option<bool>,
}

/// The bootstrap compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrebuiltConfig {
    pub path: Option<PathBuf>,

    /// Clang version directory name, resolved from disk when unset
    pub version: Option<String>,
}

impl Settings {
    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))
    }

    /// Merge another settings value into this one (other takes precedence).
    pub fn merge(&mut self, other: Settings) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.paths.out_dir, other.paths.out_dir);
        take(&mut self.paths.source_dir, other.paths.source_dir);
        take(&mut self.paths.android_dir, other.paths.android_dir);
        take(&mut self.paths.sysroots, other.paths.sysroots);
        take(&mut self.paths.msvc_sdk, other.paths.msvc_sdk);
        if !other.paths.libcxx_headers.is_empty() {
            self.paths.libcxx_headers = other.paths.libcxx_headers;
        }

        take(&mut self.gcc.arch, other.gcc.arch);
        take(&mut self.gcc.root, other.gcc.root);
        take(&mut self.gcc.triple, other.gcc.triple);
        take(&mut self.gcc.version, other.gcc.version);
        take(&mut self.gcc.mingw_root, other.gcc.mingw_root);
        take(&mut self.gcc.android_root, other.gcc.android_root);

        take(&mut self.tools.cmake, other.tools.cmake);
        take(&mut self.tools.make, other.tools.make);
        take(&mut self.tools.ninja, other.tools.ninja);
        take(&mut self.tools.generator, other.tools.generator);
        take(&mut self.tools.install_name_tool, other.tools.install_name_tool);
        take(&mut self.tools.python, other.tools.python);

        take(&mut self.build.jobs, other.build.jobs);
        take(&mut self.build.mac_min_version, other.build.mac_min_version);
        take(&mut self.build.enable_assertions, other.build.enable_assertions);
        take(&mut self.build.lto, other.build.lto);

        take(&mut self.prebuilt.path, other.prebuilt.path);
        take(&mut self.prebuilt.version, other.prebuilt.version);
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(out_dir) = std::env::var_os("OUT_DIR").filter(|v| !v.is_empty()) {
            self.paths.out_dir = Some(PathBuf::from(out_dir));
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.paths
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("out"))
    }

    pub fn source_dir(&self) -> PathBuf {
        self.paths
            .source_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("external"))
    }

    /// Source checkout of one project.
    pub fn source_path(&self, project: &str) -> PathBuf {
        self.source_dir().join(project)
    }

    pub fn sysroots(&self) -> PathBuf {
        self.paths
            .sysroots
            .clone()
            .unwrap_or_else(|| self.out_dir().join("sysroots"))
    }

    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn enable_assertions(&self) -> bool {
        self.build.enable_assertions.unwrap_or(false)
    }

    pub fn lto(&self) -> bool {
        self.build.lto.unwrap_or(false)
    }

    pub fn mac_min_version(&self) -> String {
        self.build
            .mac_min_version
            .clone()
            .unwrap_or_else(|| TargetPaths::default().mac_min_version)
    }

    pub fn cmake(&self) -> PathBuf {
        self.tools
            .cmake
            .clone()
            .or_else(process::find_cmake)
            .unwrap_or_else(|| PathBuf::from("cmake"))
    }

    pub fn make(&self) -> PathBuf {
        self.tools
            .make
            .clone()
            .or_else(process::find_make)
            .unwrap_or_else(|| PathBuf::from("make"))
    }

    pub fn ninja(&self) -> PathBuf {
        self.tools
            .ninja
            .clone()
            .or_else(process::find_ninja)
            .unwrap_or_else(|| PathBuf::from("ninja"))
    }

    pub fn generator(&self) -> String {
        self.tools
            .generator
            .clone()
            .unwrap_or_else(|| "Unix Makefiles".to_string())
    }

    /// The program CMake's generated files are driven with.
    pub fn build_program(&self) -> PathBuf {
        if self.generator() == "Ninja" {
            self.ninja()
        } else {
            self.make()
        }
    }

    pub fn install_name_tool(&self) -> PathBuf {
        self.tools
            .install_name_tool
            .clone()
            .unwrap_or_else(|| PathBuf::from("install_name_tool"))
    }

    pub fn python(&self) -> Option<PathBuf> {
        self.tools
            .python
            .clone()
            .or_else(|| process::find_executable("python3"))
    }

    /// The bootstrap toolchain, if one is configured.
    pub fn prebuilt_toolchain(&self) -> Result<Option<Toolchain>> {
        let Some(path) = &self.prebuilt.path else {
            return Ok(None);
        };
        let toolchain = Toolchain::prebuilt(path);
        match &self.prebuilt.version {
            Some(version) => Ok(Some(toolchain.with_version(version).with_context(|| {
                format!("invalid prebuilt clang version `{}`", version)
            })?)),
            None => Ok(Some(toolchain)),
        }
    }

    /// Locations the config presets are derived from.
    pub fn target_paths(&self) -> TargetPaths {
        let defaults = TargetPaths::default();
        let host_arch = self.gcc.arch.unwrap_or(defaults.host_arch);
        TargetPaths {
            source_root: self.paths.android_dir.clone(),
            host_arch,
            gcc_root: self.gcc.root.clone().unwrap_or(defaults.gcc_root),
            gcc_triple: self
                .gcc
                .triple
                .clone()
                .unwrap_or_else(|| host_arch.gnu_triple()),
            gcc_version: self.gcc.version.clone().unwrap_or(defaults.gcc_version),
            mingw_root: self.gcc.mingw_root.clone().unwrap_or(defaults.mingw_root),
            android_gcc_root: self
                .gcc
                .android_root
                .clone()
                .unwrap_or(defaults.android_gcc_root),
            sysroots: self.sysroots(),
            libcxx_headers: self.paths.libcxx_headers.clone(),
            mac_min_version: self.mac_min_version(),
        }
    }
}

/// Load merged settings from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. `OUT_DIR` environment variable
/// 2. Project settings (`toolstage.toml`)
/// 3. Global settings (`~/.toolstage/config.toml`)
/// 4. Defaults
pub fn load_settings(global_path: Option<&Path>, project_path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(global_path) = global_path.filter(|p| p.exists()) {
        settings.merge(Settings::load(global_path)?);
    }

    if project_path.exists() {
        settings.merge(Settings::load(project_path)?);
    }

    settings.apply_env();
    Ok(settings)
}

/// Get the global toolstage config directory (~/.toolstage).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".toolstage"))
}

/// Get the global settings path (~/.toolstage/config.toml).
pub fn global_settings_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.out_dir(), PathBuf::from("out"));
        assert_eq!(settings.sysroots(), PathBuf::from("out/sysroots"));
        assert_eq!(settings.generator(), "Unix Makefiles");
        assert!(!settings.enable_assertions());
        assert!(settings.jobs() >= 1);
    }

    #[test]
    fn test_settings_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("toolstage.toml");

        std::fs::write(
            &path,
            r#"
[paths]
out_dir = "/build/out"
source_dir = "/src"

[tools]
generator = "Ninja"
ninja = "/usr/local/bin/ninja"

[build]
jobs = 16
enable_assertions = true

[prebuilt]
path = "/prebuilts/clang"
version = "14.0.6"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.out_dir(), PathBuf::from("/build/out"));
        assert_eq!(settings.source_path("swig"), PathBuf::from("/src/swig"));
        assert_eq!(settings.jobs(), 16);
        assert!(settings.enable_assertions());
        assert_eq!(settings.build_program(), PathBuf::from("/usr/local/bin/ninja"));

        let prebuilt = settings.prebuilt_toolchain().unwrap().unwrap();
        assert!(prebuilt.is_prebuilt());
        assert_eq!(prebuilt.version().unwrap().dir_name, "14.0.6");
    }

    #[test]
    fn test_settings_reject_unparseable_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("toolstage.toml");
        std::fs::write(&path, "[build]\njobs = \"many\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_settings_merge() {
        let mut base = Settings::default();
        base.build.jobs = Some(4);
        base.tools.cmake = Some(PathBuf::from("/usr/bin/cmake"));

        let mut other = Settings::default();
        other.tools.cmake = Some(PathBuf::from("/opt/cmake/bin/cmake"));

        base.merge(other);

        assert_eq!(base.tools.cmake, Some(PathBuf::from("/opt/cmake/bin/cmake")));
        assert_eq!(base.build.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_load_settings_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("toolstage.toml");

        std::fs::write(
            &global_path,
            r#"
[gcc]
root = "/opt/gcc"
triple = "x86_64-linux"

[build]
jobs = 2
"#,
        )
        .unwrap();
        std::fs::write(
            &project_path,
            r#"
[gcc]
triple = "aarch64-linux-gnu"
"#,
        )
        .unwrap();

        let settings = load_settings(Some(&global_path), &project_path).unwrap();
        let paths = settings.target_paths();

        assert_eq!(paths.gcc_root, PathBuf::from("/opt/gcc"));
        assert_eq!(paths.gcc_triple, "aarch64-linux-gnu");
        assert_eq!(settings.build.jobs, Some(2));
    }

    #[test]
    fn test_gcc_triple_follows_host_arch() {
        let defaults = Settings::default().target_paths();
        assert_eq!(defaults.host_arch, Arch::build_arch());
        assert_eq!(defaults.gcc_triple, Arch::build_arch().gnu_triple());

        let settings: Settings = toml::from_str(
            r#"
[gcc]
arch = "aarch64"
"#,
        )
        .unwrap();
        let paths = settings.target_paths();
        assert_eq!(paths.gcc_triple, "aarch64-linux-gnu");

        let linux = crate::core::config::linux_config(&paths);
        assert_eq!(linux.target_arch, Arch::Aarch64);
        assert_eq!(linux.llvm_triple().unwrap(), "aarch64-unknown-linux-gnu");
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(None, &tmp.path().join("toolstage.toml")).unwrap();
        assert!(settings.prebuilt_toolchain().unwrap().is_none());
    }
}
