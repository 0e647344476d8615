//! Host libraries and tools LLDB links against, built with stage1 for the
//! machine running the build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::builder::autoconf::AutoconfProject;
use crate::builder::cmake::CMakeProject;
use crate::builder::step::ConfigContext;
use crate::core::error::BuildResult;
use crate::core::host::Host;
use crate::core::lib_info::LibInfo;
use crate::util::config::Settings;

/// libxml2, shared.
#[derive(Debug, Clone, Default)]
pub struct Libxml2;

impl Libxml2 {
    pub const NAME: &'static str = "libxml2";
    pub const VERSION: &'static str = "2.9.12";

    pub fn lib_info(install_dir: &Path, target_os: Host) -> LibInfo {
        let symlinks = match target_os {
            Host::Linux => vec![install_dir.join("lib").join("libxml2.so")],
            Host::Darwin => vec![install_dir.join("lib").join("libxml2.dylib")],
            Host::Windows | Host::Android => Vec::new(),
        };
        LibInfo::shared(Self::NAME, Self::VERSION, install_dir, target_os)
            .with_include_dir(install_dir.join("include").join("libxml2"))
            .with_symlinks(symlinks)
    }
}

impl CMakeProject for Libxml2 {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        settings.source_path("libxml2")
    }

    fn defines(&self, _ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        for feature in ["PYTHON", "PROGRAMS", "LZMA", "ICONV", "ZLIB"] {
            defines.insert(format!("LIBXML2_WITH_{}", feature), "OFF".to_string());
        }
        Ok(())
    }
}

/// liblzma from xz, static.
#[derive(Debug, Clone, Default)]
pub struct Xz;

impl Xz {
    pub const NAME: &'static str = "liblzma";

    pub fn lib_info(install_dir: &Path, target_os: Host) -> LibInfo {
        LibInfo::static_archive(Self::NAME, install_dir, target_os)
    }
}

impl CMakeProject for Xz {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        settings.source_path("xz")
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        // CMake emits an archive command llvm-ranlib rejects; the system
        // ranlib accepts it.
        if ctx.config.target_os.is_darwin() {
            defines.remove("CMAKE_RANLIB");
        }
        Ok(())
    }
}

/// ncurses with its form and panel libraries.
#[derive(Debug, Clone, Default)]
pub struct Libncurses;

impl Libncurses {
    pub const NAME: &'static str = "libncurses";
    pub const VERSION: &'static str = "6";

    pub fn info(install_dir: &Path, target_os: Host) -> LibInfo {
        LibInfo::shared(Self::NAME, Self::VERSION, install_dir, target_os)
            .with_lib_names(["libncurses", "libform", "libpanel"])
    }
}

impl AutoconfProject for Libncurses {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        settings.source_path("libncurses")
    }

    fn config_flags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        vec!["--with-shared".to_string()]
    }

    fn lib_info(&self, install_dir: &Path, target_os: Host) -> Option<LibInfo> {
        Some(Self::info(install_dir, target_os))
    }
}

/// libedit, built against [`Libncurses`].
#[derive(Debug, Clone)]
pub struct Libedit {
    libncurses: LibInfo,
}

impl Libedit {
    pub const NAME: &'static str = "libedit";
    pub const VERSION: &'static str = "0";

    pub fn new(libncurses: LibInfo) -> Self {
        Libedit { libncurses }
    }

    pub fn info(install_dir: &Path, target_os: Host) -> LibInfo {
        LibInfo::shared(Self::NAME, Self::VERSION, install_dir, target_os)
    }
}

impl AutoconfProject for Libedit {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        settings.source_path("libedit")
    }

    fn cflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        let include = self.libncurses.include_dir();
        vec![
            format!("-I{}", include.display()),
            format!("-I{}", include.join("ncurses").display()),
        ]
    }

    fn ldflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        let lib_dir = self
            .libncurses
            .link_libraries()
            .ok()
            .and_then(|libs| libs.first().and_then(|l| l.parent().map(Path::to_path_buf)))
            .unwrap_or_else(|| self.libncurses.install_dir.join("lib"));
        vec![format!("-L{}", lib_dir.display())]
    }

    fn lib_info(&self, install_dir: &Path, target_os: Host) -> Option<LibInfo> {
        Some(Self::info(install_dir, target_os))
    }
}

/// SWIG, for LLDB's Python bindings.
#[derive(Debug, Clone, Default)]
pub struct Swig;

impl Swig {
    pub const NAME: &'static str = "swig";

    pub fn executable(install_dir: &Path) -> PathBuf {
        install_dir.join("bin").join("swig")
    }
}

impl AutoconfProject for Swig {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        settings.source_path("swig")
    }

    fn config_flags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        vec!["--without-pcre".to_string()]
    }

    fn ldflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        // libc++.so of the compiling toolchain.
        vec![format!("-Wl,-rpath,{}", ctx.toolchain.lib_dir().display())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::builder::autoconf::AutoconfStep;
    use crate::builder::cmake::CMakeStep;
    use crate::builder::step::Builder;
    use crate::core::config::{darwin_config, linux_config, TargetPaths};
    use crate::core::toolchain::Toolchain;
    use crate::test_support::{test_env, touch_file, RecordingRunner};

    #[test]
    fn test_libxml2_lib_info() {
        let info = Libxml2::lib_info(Path::new("/out/lib/libxml2-linux-install"), Host::Linux);
        assert_eq!(
            info.include_dir(),
            PathBuf::from("/out/lib/libxml2-linux-install/include/libxml2")
        );
        assert_eq!(
            info.link_libraries().unwrap(),
            vec![PathBuf::from("/out/lib/libxml2-linux-install/lib/libxml2.so.2.9.12")]
        );
        assert_eq!(
            info.symlinks(),
            [PathBuf::from("/out/lib/libxml2-linux-install/lib/libxml2.so")]
        );
        assert!(Libxml2::lib_info(Path::new("/x"), Host::Windows).symlinks().is_empty());
    }

    #[test]
    fn test_xz_drops_ranlib_on_darwin() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = test_env(tmp.path(), Arc::new(RecordingRunner::new())).with_host(Host::Darwin);
        let toolchain = Toolchain::stage("stage1", "/out/stage1-install", None);
        let config = darwin_config(&TargetPaths::default());
        let ctx = ConfigContext {
            builder: Xz::NAME,
            config: &config,
            index: 0,
            toolchain: &toolchain,
            output_toolchain: &toolchain,
            env: &env,
        };
        let defines = CMakeStep::new(Xz).cmake_defines(&ctx).unwrap();
        assert!(!defines.contains_key("CMAKE_RANLIB"));

        let linux = linux_config(&TargetPaths::default());
        let ctx = ConfigContext { config: &linux, ..ctx };
        let defines = CMakeStep::new(Xz).cmake_defines(&ctx).unwrap();
        assert!(defines.contains_key("CMAKE_RANLIB"));
    }

    #[test]
    fn test_libedit_points_at_ncurses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Linux);
        let toolchain = Arc::new(Toolchain::stage("stage1", "/out/stage1-install", None));
        touch_file(&tmp.path().join("src/libedit/configure"));
        let ncurses = Libncurses::info(Path::new("/deps/ncurses-install"), Host::Linux);

        let mut builder = Builder::new(
            AutoconfStep::new(Libedit::new(ncurses)),
            vec![linux_config(&TargetPaths::default())],
            toolchain,
        )
        .unwrap();
        builder.build(&env).unwrap();

        let cflags = std::fs::read_to_string(tmp.path().join("out/lib/libedit-linux/cflags")).unwrap();
        assert!(cflags.contains("-I/deps/ncurses-install/include/ncurses"));
        assert!(cflags.contains("-L/deps/ncurses-install/lib"));
        assert!(cflags.contains("-L/out/stage1-install/lib"));
    }

    #[test]
    fn test_swig_rpath_and_executable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Linux);
        let toolchain = Arc::new(Toolchain::stage("stage1", "/out/stage1-install", None));
        touch_file(&tmp.path().join("src/swig/configure"));

        let mut builder = Builder::new(
            AutoconfStep::new(Swig),
            vec![linux_config(&TargetPaths::default())],
            toolchain,
        )
        .unwrap();
        builder.build(&env).unwrap();

        let configure = &runner.invocations()[0];
        assert!(configure.get_args().contains(&"--without-pcre".to_string()));
        let cxxflags =
            std::fs::read_to_string(tmp.path().join("out/lib/swig-linux/cxxflags")).unwrap();
        assert!(cxxflags.contains("-Wl,-rpath,/out/stage1-install/lib"));

        let install_dir = builder.install_dir(&env, 0).unwrap();
        assert_eq!(
            Swig::executable(&install_dir),
            tmp.path().join("out/lib/swig-linux-install/bin/swig")
        );
    }
}
