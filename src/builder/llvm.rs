//! LLVM-specific CMake pieces shared by the toolchain stages and the
//! runtime libraries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::builder::step::{ConfigContext, FinalizeContext};
use crate::builder::util::{cmake_list, on_off};
use crate::core::config::ConfigKind;
use crate::core::error::{BuildError, BuildResult};
use crate::core::host::Host;
use crate::core::lib_info::LibInfo;
use crate::core::toolchain::Toolchain;
use crate::util::fs::{copy_file, copy_into, ensure_dir};

pub const REPOSITORY_STRING: &str = "https://android.googlesource.com/toolchain/llvm-project";
pub const BUG_REPORT_URL: &str = "https://github.com/android-ndk/ndk/issues";

/// Backends for tools that run on the build machine.
pub const HOST_TARGETS: &[&str] = &["AArch64", "X86"];
/// Backends for every Android architecture.
pub const ANDROID_TARGETS: &[&str] = &["AArch64", "ARM", "BPF", "RISCV", "X86"];

/// `llvm-project/<sub>` under the source directory.
pub fn llvm_source(settings: &crate::util::config::Settings, sub: &str) -> PathBuf {
    settings.source_path("llvm-project").join(sub)
}

/// Defines every LLVM build gets, toolchain or runtime.
pub fn base_defines(ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) {
    let settings = ctx.settings();
    let mut set = |key: &str, value: &str| {
        defines.insert(key.to_string(), value.to_string());
    };

    set("LLVM_ENABLE_ASSERTIONS", on_off(settings.enable_assertions()));
    // Don't depend on libtinfo.
    set("LLVM_ENABLE_TERMINFO", "OFF");
    set("LLVM_ENABLE_THREADS", "ON");
    set("LLVM_USE_NEWPM", "ON");
    set("CLANG_REPOSITORY_STRING", REPOSITORY_STRING);
    set("BUG_REPORT_URL", BUG_REPORT_URL);

    if ctx.config.target_os.is_darwin() {
        set("CMAKE_OSX_DEPLOYMENT_TARGET", &settings.mac_min_version());
    }

    set("COMPILER_RT_BUILD_XRAY", "OFF");
    // Keeps cmake from checking the libstdc++ version.
    set("LLVM_ENABLE_LIBCXX", "ON");
    set("LIBCXX_HAS_ATOMIC_LIB", "NO");

    if !ctx.config.target_os.is_darwin() {
        set("LLVM_ENABLE_LLD", "ON");
    }
    if let Some(python) = settings.python() {
        set("Python3_EXECUTABLE", &python.display().to_string());
    }
}

/// Defines for runtime libraries built against an existing toolchain.
pub fn runtime_defines(ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) {
    base_defines(ctx, defines);
    defines.insert(
        "LLVM_CONFIG_PATH".to_string(),
        ctx.toolchain.llvm_config().display().to_string(),
    );
}

/// Where a runtime library installs for one config.
///
/// Platform configs go to the output toolchain's resource directory, NDK
/// configs to `runtimes_ndk_cxx`, both split by architecture.
pub fn runtime_install_dir(ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
    let android = ctx.config.android()?;
    let arch = ctx.config.target_arch.as_str();
    if android.platform {
        Ok(ctx.output_toolchain.resource_dir()?.join(arch))
    } else {
        Ok(ctx.output_toolchain.path().join("runtimes_ndk_cxx").join(arch))
    }
}

/// `<out>/<name>`: toolchain stages build outside `lib/`.
pub fn stage_output_dir(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(name)
}

pub fn stage_install_dir(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}-install", name))
}

/// The toolchain a stage leaves in its install directory.
pub fn stage_toolchain(ctx: &FinalizeContext<'_>, name: &str) -> Toolchain {
    let out_dir = ctx.out_dir();
    Toolchain::stage(
        name,
        stage_install_dir(&out_dir, name),
        Some(stage_output_dir(&out_dir, name)),
    )
}

/// Host libraries and tools LLDB is built against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LldbDeps {
    pub swig: Option<PathBuf>,
    pub libxml2: Option<LibInfo>,
    pub liblzma: Option<LibInfo>,
    pub libedit: Option<LibInfo>,
    pub libncurses: Option<LibInfo>,
}

impl LldbDeps {
    fn libs(&self) -> impl Iterator<Item = &LibInfo> {
        [&self.liblzma, &self.libedit, &self.libxml2, &self.libncurses]
            .into_iter()
            .flatten()
    }
}

/// What a toolchain stage builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainBuild {
    pub build_name: String,
    pub revision: String,
    pub tags: Vec<String>,
    pub projects: Vec<String>,
    pub targets: Vec<String>,
    pub build_lldb: bool,
    pub deps: LldbDeps,
}

impl ToolchainBuild {
    pub fn clang_vendor(&self) -> String {
        let tags: String = self.tags.iter().map(|t| format!("{}, ", t)).collect();
        format!("Android ({}, {}based on {})", self.build_name, tags, self.revision)
    }
}

fn first_link_library(lib: &LibInfo) -> BuildResult<String> {
    let libs = lib.link_libraries()?;
    libs.first()
        .map(|p| p.display().to_string())
        .ok_or_else(|| BuildError::Invariant {
            builder: lib.name.clone(),
            message: "library has no link libraries".to_string(),
        })
}

/// Defines for building clang/LLVM itself.
pub fn toolchain_defines(
    ctx: &ConfigContext<'_>,
    build: &ToolchainBuild,
    defines: &mut BTreeMap<String, String>,
) -> BuildResult<()> {
    base_defines(ctx, defines);
    let target_os = ctx.config.target_os;

    defines.insert(
        "LLVM_ENABLE_PROJECTS".to_string(),
        cmake_list(build.projects.iter().map(String::as_str)),
    );
    defines.insert(
        "LLVM_TARGETS_TO_BUILD".to_string(),
        cmake_list(build.targets.iter().map(String::as_str)),
    );
    if target_os.is_darwin() || target_os.is_linux() {
        defines.insert("LLVM_BUILD_LLVM_DYLIB".to_string(), "ON".to_string());
    } else if matches!(ctx.config.kind, ConfigKind::Msvc(_)) {
        defines.insert("LLVM_BUILD_LLVM_C_DYLIB".to_string(), "OFF".to_string());
    }

    defines.insert("CLANG_VENDOR".to_string(), build.clang_vendor());
    defines.insert("LLVM_BUILD_RUNTIME".to_string(), "ON".to_string());
    defines.insert("LLVM_INCLUDE_GO_TESTS".to_string(), "OFF".to_string());

    if target_os.is_darwin() {
        defines.insert("HAVE_LIBCOMPRESSION".to_string(), "1".to_string());
        defines.insert("HAVE_FUTIMENS".to_string(), "1".to_string());
        // Ad-hoc signature, required on arm64 Darwin.
        defines.insert("LLVM_CODESIGNING_IDENTITY".to_string(), "-".to_string());
    }

    if let Some(libxml2) = &build.deps.libxml2 {
        defines.insert(
            "LIBXML2_INCLUDE_DIR".to_string(),
            libxml2.include_dir().display().to_string(),
        );
        defines.insert("LIBXML2_LIBRARY".to_string(), first_link_library(libxml2)?);
    }

    if build.build_lldb {
        lldb_defines(target_os, &build.deps, defines)?;
    }
    Ok(())
}

fn lldb_defines(
    target_os: Host,
    deps: &LldbDeps,
    defines: &mut BTreeMap<String, String>,
) -> BuildResult<()> {
    let mut set = |key: &str, value: String| {
        defines.insert(key.to_string(), value);
    };

    if target_os.is_darwin() {
        set("LLDB_USE_SYSTEM_DEBUGSERVER", "ON".to_string());
    }
    set("LLDB_ENABLE_LUA", "OFF".to_string());

    match &deps.swig {
        Some(swig) => {
            set("SWIG_EXECUTABLE", swig.display().to_string());
            set("LLDB_ENABLE_PYTHON", "ON".to_string());
            set("LLDB_EMBED_PYTHON_HOME", "OFF".to_string());
        }
        None => set("LLDB_ENABLE_PYTHON", "OFF".to_string()),
    }

    match &deps.liblzma {
        Some(lzma) => {
            set("LLDB_ENABLE_LZMA", "ON".to_string());
            set("LIBLZMA_INCLUDE_DIR", lzma.include_dir().display().to_string());
            set("LIBLZMA_LIBRARY", first_link_library(lzma)?);
        }
        None => set("LLDB_ENABLE_LZMA", "OFF".to_string()),
    }

    match &deps.libedit {
        Some(libedit) => {
            set("LLDB_ENABLE_LIBEDIT", "ON".to_string());
            set("LibEdit_INCLUDE_DIRS", libedit.include_dir().display().to_string());
            set("LibEdit_LIBRARIES", first_link_library(libedit)?);
        }
        None => set("LLDB_ENABLE_LIBEDIT", "OFF".to_string()),
    }

    set("LLDB_ENABLE_LIBXML2", on_off(deps.libxml2.is_some()).to_string());

    match &deps.libncurses {
        Some(ncurses) => {
            let libs = ncurses
                .link_libraries()?
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(";");
            set("LLDB_ENABLE_CURSES", "ON".to_string());
            set("CURSES_INCLUDE_DIRS", ncurses.include_dir().display().to_string());
            set("CURSES_LIBRARIES", libs.clone());
            set("PANEL_LIBRARIES", libs);
        }
        None => set("LLDB_ENABLE_CURSES", "OFF".to_string()),
    }
    Ok(())
}

/// Copy the shared libraries LLDB links against into the stage install.
pub fn install_lldb_deps(install_dir: &Path, target_os: Host, deps: &LldbDeps) -> BuildResult<()> {
    let lib_dir = install_dir.join(if target_os.is_windows() { "bin" } else { "lib" });
    ensure_dir(&lib_dir)?;

    for lib in deps.libs() {
        for file in lib.install_libraries()? {
            copy_into(&file, &lib_dir)?;
        }
        for link in lib.symlinks() {
            copy_link(link, &lib_dir)?;
        }
    }
    Ok(())
}

/// Copy a symlink as a symlink, or the file when it is not one.
fn copy_link(link: &Path, dst_dir: &Path) -> BuildResult<()> {
    let Some(name) = link.file_name() else {
        return Ok(());
    };
    let dst = dst_dir.join(name);

    #[cfg(unix)]
    {
        if let Ok(target) = std::fs::read_link(link) {
            match std::fs::remove_file(&dst) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(anyhow::Error::from(e).into()),
            }
            std::os::unix::fs::symlink(&target, &dst).map_err(anyhow::Error::from)?;
            return Ok(());
        }
    }

    copy_file(link, &dst)?;
    Ok(())
}
