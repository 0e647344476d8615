//! Already-built dependency libraries.
//!
//! All knowledge of how a library file is named on a given OS lives here, so
//! consumers never special-case "what is libfoo called on Darwin".

use std::path::{Path, PathBuf};

use crate::core::error::{BuildResult, ConfigError};
use crate::core::host::Host;
use crate::util::process::{Invocation, ProcessRunner};

/// Description of an installed library dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibInfo {
    /// Base name, e.g. `libxml2`
    pub name: String,
    /// Library files provided, defaults to `[name]`
    pub lib_names: Vec<String>,
    /// Shared object version, e.g. `2.9.10`
    pub version: String,
    /// Static archive instead of shared object
    pub static_lib: bool,
    /// Where the library was installed
    pub install_dir: PathBuf,
    /// OS the library was built for
    pub target_os: Host,
    /// Link through an MSVC import library (`.lib`)
    pub import_lib: bool,
    /// Extra symlinks that ship alongside the library
    pub symlinks: Vec<PathBuf>,
    /// Header root when it is not `<install_dir>/include`
    pub include_override: Option<PathBuf>,
}

impl LibInfo {
    /// Describe a shared library.
    pub fn shared(
        name: impl Into<String>,
        version: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        target_os: Host,
    ) -> Self {
        let name = name.into();
        LibInfo {
            lib_names: vec![name.clone()],
            name,
            version: version.into(),
            static_lib: false,
            install_dir: install_dir.into(),
            target_os,
            import_lib: false,
            symlinks: Vec::new(),
            include_override: None,
        }
    }

    /// Describe a static archive.
    pub fn static_archive(
        name: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        target_os: Host,
    ) -> Self {
        LibInfo {
            static_lib: true,
            ..LibInfo::shared(name, "", install_dir, target_os)
        }
    }

    /// Override the list of library files (e.g. ncurses ships several).
    pub fn with_lib_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.lib_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_import_lib(mut self, import_lib: bool) -> Self {
        self.import_lib = import_lib;
        self
    }

    pub fn with_symlinks(mut self, symlinks: Vec<PathBuf>) -> Self {
        self.symlinks = symlinks;
        self
    }

    pub fn with_include_dir(mut self, include_dir: impl Into<PathBuf>) -> Self {
        self.include_override = Some(include_dir.into());
        self
    }

    pub fn include_dir(&self) -> PathBuf {
        self.include_override
            .clone()
            .unwrap_or_else(|| self.install_dir.join("include"))
    }

    /// File suffix of the link-time library.
    pub fn lib_suffix(&self) -> Result<String, ConfigError> {
        if self.target_os.is_windows() && self.import_lib {
            return Ok(".lib".to_string());
        }
        if self.static_lib {
            return Ok(".a".to_string());
        }
        match self.target_os {
            Host::Linux => Ok(format!(".so.{}", self.version)),
            Host::Darwin => Ok(format!(".{}.dylib", self.version)),
            Host::Windows => Ok(".dll.a".to_string()),
            Host::Android => Err(ConfigError::Unsupported {
                property: "versioned shared library suffix",
                family: "android",
            }),
        }
    }

    /// Libraries to pass to the linker.
    pub fn link_libraries(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let suffix = self.lib_suffix()?;
        let lib_dir = self.install_dir.join("lib");
        Ok(self
            .lib_names
            .iter()
            .map(|name| lib_dir.join(format!("{}{}", name, suffix)))
            .collect())
    }

    /// Libraries that must ship next to the binaries that use them.
    ///
    /// Static archives are linked in, so nothing is installed. On Windows the
    /// loadable DLL lives in `bin/` and differs from the link-time stub.
    pub fn install_libraries(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if self.static_lib {
            return Ok(Vec::new());
        }
        if self.target_os.is_windows() {
            let bin_dir = self.install_dir.join("bin");
            return Ok(self
                .lib_names
                .iter()
                .map(|name| bin_dir.join(format!("{}.dll", name)))
                .collect());
        }
        self.link_libraries()
    }

    pub fn symlinks(&self) -> &[PathBuf] {
        &self.symlinks
    }

    /// Rewrite Darwin install names to `@rpath/...` so consumers do not link
    /// against absolute paths. No-op everywhere else.
    pub fn update_lib_id(&self, runner: &dyn ProcessRunner, install_name_tool: &Path) -> BuildResult<()> {
        if self.static_lib || !self.target_os.is_darwin() {
            return Ok(());
        }
        let libs = self.link_libraries()?;
        for lib in &libs {
            let file_name = file_name_of(lib);
            runner.run(
                &Invocation::new(install_name_tool)
                    .arg("-id")
                    .arg(format!("@rpath/{}", file_name))
                    .arg(lib.display().to_string()),
            )?;
            for other in &libs {
                runner.run(
                    &Invocation::new(install_name_tool)
                        .arg("-change")
                        .arg(other.display().to_string())
                        .arg(format!("@rpath/{}", file_name_of(other)))
                        .arg(lib.display().to_string()),
                )?;
            }
        }
        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
