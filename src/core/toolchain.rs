//! Toolchain references.
//!
//! A [`Toolchain`] points at an installed compiler. Every binutil is found at a
//! fixed path relative to the install root:
//!
//! ```text
//! <root>/bin/clang, clang++, ld.lld, llvm-ar, ...
//! <root>/lib/
//! <root>/lib/clang/<version>/lib/linux   (resource directory)
//! ```
//!
//! Downstream consumers (the packaged compiler looking up its own runtimes)
//! depend on this layout, so it must not change.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::builder::util::parse_version_flexible;
use crate::core::error::ToolchainError;

/// Where a toolchain came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainOrigin {
    /// A compiler installed before the run started (the bootstrap compiler).
    Prebuilt,
    /// The output of a stage built during this run.
    Stage(String),
}

/// Resolved clang version of a toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangVersion {
    /// Directory name under `lib/clang/` (e.g. `14.0.6` or `17`).
    pub dir_name: String,
    /// Parsed version.
    pub version: semver::Version,
}

/// A read-only handle to an installed compiler.
#[derive(Debug, Clone)]
pub struct Toolchain {
    path: PathBuf,
    build_path: Option<PathBuf>,
    origin: ToolchainOrigin,
    version: OnceLock<ClangVersion>,
}

/// Toolchains are shared between builders without copying.
pub type ToolchainRef = Arc<Toolchain>;

impl Toolchain {
    /// Reference a prebuilt compiler installed at `path`.
    pub fn prebuilt(path: impl Into<PathBuf>) -> Self {
        Toolchain {
            path: path.into(),
            build_path: None,
            origin: ToolchainOrigin::Prebuilt,
            version: OnceLock::new(),
        }
    }

    /// Reference the output of the stage `name`.
    ///
    /// `build_path` is the stage's build tree, which may diverge from the
    /// install tree.
    pub fn stage(name: impl Into<String>, path: impl Into<PathBuf>, build_path: Option<PathBuf>) -> Self {
        Toolchain {
            path: path.into(),
            build_path,
            origin: ToolchainOrigin::Stage(name.into()),
            version: OnceLock::new(),
        }
    }

    /// Pin the version instead of resolving it from disk.
    pub fn with_version(self, dir_name: &str) -> Result<Self, ToolchainError> {
        let version = parse_version_flexible(dir_name)
            .ok_or_else(|| ToolchainError::InvalidVersion(dir_name.to_string()))?;
        let pinned = OnceLock::new();
        let _ = pinned.set(ClangVersion {
            dir_name: dir_name.to_string(),
            version,
        });
        Ok(Toolchain {
            version: pinned,
            ..self
        })
    }

    /// Install root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build tree, when it differs from the install tree.
    pub fn build_path(&self) -> Option<&Path> {
        self.build_path.as_deref()
    }

    pub fn origin(&self) -> &ToolchainOrigin {
        &self.origin
    }

    pub fn is_prebuilt(&self) -> bool {
        self.origin == ToolchainOrigin::Prebuilt
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.path.join("lib")
    }

    /// Path of a tool in `bin/`, with the build host's executable suffix.
    pub fn tool(&self, name: &str) -> PathBuf {
        self.bin_dir()
            .join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
    }

    pub fn cc(&self) -> PathBuf {
        self.tool("clang")
    }

    pub fn cxx(&self) -> PathBuf {
        self.tool("clang++")
    }

    pub fn cl(&self) -> PathBuf {
        self.tool("clang-cl")
    }

    pub fn lld(&self) -> PathBuf {
        self.tool("ld.lld")
    }

    pub fn lld_link(&self) -> PathBuf {
        self.tool("lld-link")
    }

    pub fn ar(&self) -> PathBuf {
        self.tool("llvm-ar")
    }

    pub fn nm(&self) -> PathBuf {
        self.tool("llvm-nm")
    }

    pub fn objcopy(&self) -> PathBuf {
        self.tool("llvm-objcopy")
    }

    pub fn objdump(&self) -> PathBuf {
        self.tool("llvm-objdump")
    }

    pub fn ranlib(&self) -> PathBuf {
        self.tool("llvm-ranlib")
    }

    pub fn readelf(&self) -> PathBuf {
        self.tool("llvm-readelf")
    }

    pub fn strip(&self) -> PathBuf {
        self.tool("llvm-strip")
    }

    pub fn addr2line(&self) -> PathBuf {
        self.tool("llvm-addr2line")
    }

    pub fn lipo(&self) -> PathBuf {
        self.tool("llvm-lipo")
    }

    pub fn rc(&self) -> PathBuf {
        self.tool("llvm-rc")
    }

    pub fn mt(&self) -> PathBuf {
        self.tool("llvm-mt")
    }

    pub fn llvm_config(&self) -> PathBuf {
        self.tool("llvm-config")
    }

    pub fn llvm_profdata(&self) -> PathBuf {
        self.tool("llvm-profdata")
    }

    /// The clang version, resolved once.
    ///
    /// Looks at `lib/clang/` in the install tree first. If that does not exist
    /// yet, falls back to `Version.inc` in the build tree.
    pub fn version(&self) -> Result<&ClangVersion, ToolchainError> {
        if let Some(version) = self.version.get() {
            return Ok(version);
        }
        let resolved = self.resolve_version()?;
        Ok(self.version.get_or_init(|| resolved))
    }

    fn resolve_version(&self) -> Result<ClangVersion, ToolchainError> {
        let clang_dir = self.lib_dir().join("clang");
        if clang_dir.is_dir() {
            return version_from_install(&clang_dir);
        }
        if let Some(build_path) = &self.build_path {
            let inc = build_path
                .join("tools")
                .join("clang")
                .join("include")
                .join("clang")
                .join("Basic")
                .join("Version.inc");
            if inc.is_file() {
                return version_from_inc(&inc);
            }
        }
        Err(ToolchainError::VersionNotFound { path: clang_dir })
    }

    /// `lib/clang/<version>`.
    pub fn clang_lib_dir(&self) -> Result<PathBuf, ToolchainError> {
        let version = self.version()?;
        Ok(self.lib_dir().join("clang").join(&version.dir_name))
    }

    /// Directory where the compiler looks up its target runtime libraries.
    pub fn resource_dir(&self) -> Result<PathBuf, ToolchainError> {
        Ok(self.clang_lib_dir()?.join("lib").join("linux"))
    }
}

impl PartialEq for Toolchain {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.build_path == other.build_path && self.origin == other.origin
    }
}

impl Eq for Toolchain {}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ToolchainOrigin::Prebuilt => write!(f, "prebuilt ({})", self.path.display()),
            ToolchainOrigin::Stage(name) => write!(f, "{} ({})", name, self.path.display()),
        }
    }
}

fn version_from_install(clang_dir: &Path) -> Result<ClangVersion, ToolchainError> {
    let mut found: Vec<String> = std::fs::read_dir(clang_dir)
        .map_err(|_| ToolchainError::VersionNotFound {
            path: clang_dir.to_path_buf(),
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    found.sort();

    match found.as_slice() {
        [] => Err(ToolchainError::VersionNotFound {
            path: clang_dir.to_path_buf(),
        }),
        [dir_name] => {
            let version = parse_version_flexible(dir_name)
                .ok_or_else(|| ToolchainError::InvalidVersion(dir_name.clone()))?;
            Ok(ClangVersion {
                dir_name: dir_name.clone(),
                version,
            })
        }
        _ => Err(ToolchainError::AmbiguousVersion {
            path: clang_dir.to_path_buf(),
            found,
        }),
    }
}

fn version_from_inc(inc: &Path) -> Result<ClangVersion, ToolchainError> {
    let contents = std::fs::read_to_string(inc).map_err(|_| ToolchainError::VersionNotFound {
        path: inc.to_path_buf(),
    })?;

    let re = Regex::new(r"#define\s+CLANG_VERSION\s+([0-9][0-9.]*)")
        .map_err(|e| ToolchainError::InvalidVersion(e.to_string()))?;
    let raw = re
        .captures(&contents)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ToolchainError::VersionNotFound {
            path: inc.to_path_buf(),
        })?;

    let version =
        parse_version_flexible(&raw).ok_or_else(|| ToolchainError::InvalidVersion(raw.clone()))?;

    // Since clang 16 the resource directory is keyed by the major version only.
    let dir_name = if version.major >= 16 {
        version.major.to_string()
    } else {
        raw
    };

    Ok(ClangVersion { dir_name, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_binutil_layout() {
        let tc = Toolchain::prebuilt("/opt/clang");
        let exe = std::env::consts::EXE_SUFFIX;
        assert_eq!(tc.cc(), PathBuf::from(format!("/opt/clang/bin/clang{}", exe)));
        assert_eq!(tc.ar(), PathBuf::from(format!("/opt/clang/bin/llvm-ar{}", exe)));
        assert_eq!(tc.lib_dir(), PathBuf::from("/opt/clang/lib"));
        assert!(tc.is_prebuilt());
    }

    #[test]
    fn test_version_from_install_tree() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/clang/14.0.6")).unwrap();

        let tc = Toolchain::stage("stage1", tmp.path(), None);
        assert_eq!(tc.version().unwrap().dir_name, "14.0.6");
        assert_eq!(
            tc.resource_dir().unwrap(),
            tmp.path().join("lib/clang/14.0.6/lib/linux")
        );
    }

    #[test]
    fn test_version_ambiguous() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/clang/14.0.6")).unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/clang/15.0.0")).unwrap();

        let tc = Toolchain::prebuilt(tmp.path());
        assert!(matches!(
            tc.version(),
            Err(ToolchainError::AmbiguousVersion { .. })
        ));
    }

    #[test]
    fn test_version_from_build_tree() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("build");
        let inc_dir = build.join("tools/clang/include/clang/Basic");
        std::fs::create_dir_all(&inc_dir).unwrap();
        std::fs::write(
            inc_dir.join("Version.inc"),
            "#define CLANG_VERSION 17.0.2\n#define CLANG_VERSION_MAJOR 17\n",
        )
        .unwrap();

        let tc = Toolchain::stage("stage2", tmp.path().join("install"), Some(build));
        let version = tc.version().unwrap();
        assert_eq!(version.dir_name, "17");
        assert_eq!(version.version, semver::Version::new(17, 0, 2));
    }

    #[test]
    fn test_pinned_version() {
        let tc = Toolchain::prebuilt("/opt/clang").with_version("14").unwrap();
        assert_eq!(
            tc.clang_lib_dir().unwrap(),
            PathBuf::from("/opt/clang/lib/clang/14")
        );
    }

    #[test]
    fn test_missing_version() {
        let tc = Toolchain::prebuilt("/nonexistent/toolchain");
        assert!(matches!(
            tc.version(),
            Err(ToolchainError::VersionNotFound { .. })
        ));
    }
}
