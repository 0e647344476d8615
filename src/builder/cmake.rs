//! CMake binding.
//!
//! A [`CMakeProject`] describes one CMake source tree: where it lives, what
//! it adds to the flags and defines, and how it installs. [`CMakeStep`]
//! turns it into a [`BuildStep`] that configures, builds and installs once
//! per config.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use crate::builder::step::{sibling_install_dir, BuildStep, ConfigContext, FinalizeContext};
use crate::builder::util::{define_args, join_flags};
use crate::core::config::Variant;
use crate::core::error::BuildResult;
use crate::core::toolchain::Toolchain;
use crate::util::config::Settings;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists, rm_cmake_cache, write_invocation_script};
use crate::util::process::Invocation;

/// One CMake source tree and its build-specific knobs.
///
/// Flag hooks return only what the project adds; the config's flags and the
/// builder's base linker flags are prepended by [`CMakeStep`].
pub trait CMakeProject: Send + Sync {
    fn name(&self) -> &str;

    /// Directory holding the top-level `CMakeLists.txt`.
    fn src_dir(&self, settings: &Settings) -> PathBuf;

    fn accepted_variants(&self) -> &[Variant] {
        &[Variant::Default]
    }

    fn output_dir(&self, ctx: &ConfigContext<'_>) -> PathBuf {
        ctx.default_output_dir()
    }

    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        Ok(sibling_install_dir(self.output_dir(ctx)))
    }

    fn cflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        Vec::new()
    }

    fn cxxflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        self.cflags(ctx)
    }

    fn ldflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        Vec::new()
    }

    /// Applied last, so a project may override or remove any define.
    fn defines(&self, _ctx: &ConfigContext<'_>, _defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        Ok(())
    }

    /// Extra environment on top of the config's.
    fn env(&self, _ctx: &ConfigContext<'_>, _env: &mut BTreeMap<String, String>) {}

    /// Build-tool targets; empty builds the default target.
    fn targets(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        Vec::new()
    }

    /// Clear `CMakeCache.txt` and `CMakeFiles/` before configuring.
    fn remove_cmake_cache(&self) -> bool {
        false
    }

    fn remove_install_dir(&self) -> bool {
        false
    }

    /// Whether `<build tool> install` installs this project. Projects that
    /// copy their outputs by hand return `false`.
    fn uses_install_target(&self) -> bool {
        true
    }

    fn after_install(&self, _ctx: &ConfigContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn finalize(&self, _ctx: &FinalizeContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn produced_toolchain(&self, _ctx: &FinalizeContext<'_>) -> Option<Toolchain> {
        None
    }
}

/// Drives a [`CMakeProject`] through configure, build and install.
#[derive(Debug, Clone)]
pub struct CMakeStep<P> {
    project: P,
}

impl<P: CMakeProject> CMakeStep<P> {
    pub fn new(project: P) -> Self {
        CMakeStep { project }
    }

    pub fn project(&self) -> &P {
        &self.project
    }

    pub fn cflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        let mut flags = ctx.config.compiler_flags();
        flags.extend(self.project.cflags(ctx));
        flags
    }

    pub fn cxxflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        let mut flags = ctx.config.cxx_flags();
        flags.extend(self.project.cxxflags(ctx));
        flags
    }

    pub fn ldflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        let mut flags = ctx.config.linker_flags();
        flags.extend(ctx.base_ldflags());
        flags.extend(self.project.ldflags(ctx));
        flags
    }

    /// Every `-D` passed to cmake for one config.
    pub fn cmake_defines(&self, ctx: &ConfigContext<'_>) -> BuildResult<BTreeMap<String, String>> {
        let tc = ctx.toolchain;
        let config = ctx.config;
        let mut defines = BTreeMap::new();
        let mut set = |key: &str, value: String| {
            defines.insert(key.to_string(), value);
        };
        let path = |p: PathBuf| p.display().to_string();

        set("CMAKE_C_COMPILER", path(ctx.cc()));
        set("CMAKE_CXX_COMPILER", path(ctx.cxx()));
        set("CMAKE_ADDR2LINE", path(tc.addr2line()));
        set("CMAKE_AR", path(tc.ar()));
        set("CMAKE_LIPO", path(tc.lipo()));
        set("CMAKE_NM", path(tc.nm()));
        set("CMAKE_OBJCOPY", path(tc.objcopy()));
        set("CMAKE_OBJDUMP", path(tc.objdump()));
        set("CMAKE_RANLIB", path(tc.ranlib()));
        set("CMAKE_RC_COMPILER", path(tc.rc()));
        set("CMAKE_READELF", path(tc.readelf()));
        set("CMAKE_STRIP", path(tc.strip()));
        set("CMAKE_MT", path(tc.mt()));

        let cflags = join_flags(&self.cflags(ctx));
        set("CMAKE_ASM_FLAGS", cflags.clone());
        set("CMAKE_C_FLAGS", cflags);
        set("CMAKE_CXX_FLAGS", join_flags(&self.cxxflags(ctx)));

        let ldflags = join_flags(&self.ldflags(ctx));
        set("CMAKE_EXE_LINKER_FLAGS", ldflags.clone());
        set("CMAKE_SHARED_LINKER_FLAGS", ldflags.clone());
        set("CMAKE_MODULE_LINKER_FLAGS", ldflags);

        set("CMAKE_BUILD_TYPE", "Release".to_string());
        set("CMAKE_INSTALL_PREFIX", path(self.project.install_dir(ctx)?));
        set("CMAKE_MAKE_PROGRAM", path(ctx.settings().build_program()));

        set("CMAKE_FIND_ROOT_PATH_MODE_INCLUDE", "ONLY".to_string());
        set("CMAKE_FIND_ROOT_PATH_MODE_LIBRARY", "ONLY".to_string());
        set("CMAKE_FIND_ROOT_PATH_MODE_PACKAGE", "ONLY".to_string());
        set("CMAKE_FIND_ROOT_PATH_MODE_PROGRAM", "NEVER".to_string());
        set("CMAKE_POSITION_INDEPENDENT_CODE", "ON".to_string());

        if let Some(linker) = ctx.linker() {
            set("CMAKE_LINKER", path(linker));
        }
        if let Some(sysroot) = config.sysroot() {
            set("CMAKE_SYSROOT", sysroot.display().to_string());
        }
        if config.target_os.is_android() {
            set("ANDROID", "1".to_string());
            set("CMAKE_SYSTEM_VERSION", "1".to_string());
        }
        if config.target_os.is_darwin() {
            set("CMAKE_OSX_ARCHITECTURES", "arm64;x86_64".to_string());
        }
        if ctx.is_cross_compiling() {
            set("CMAKE_SYSTEM_NAME", config.target_os.cmake_system_name().to_string());
            set("CMAKE_SYSTEM_PROCESSOR", config.target_arch.as_str().to_string());
        }

        defines.extend(config.cmake_defines());
        self.project.defines(ctx, &mut defines)?;
        Ok(defines)
    }

    fn tool_env(&self, ctx: &ConfigContext<'_>) -> BuildResult<BTreeMap<String, String>> {
        let mut env = ctx.process_env()?;
        self.project.env(ctx, &mut env);
        Ok(env)
    }

    /// The `cmake -G ...` command for one config.
    pub fn configure_invocation(&self, ctx: &ConfigContext<'_>) -> BuildResult<Invocation> {
        let settings = ctx.settings();
        Ok(Invocation::new(settings.cmake())
            .arg("-G")
            .arg(settings.generator())
            .args(define_args(&self.cmake_defines(ctx)?))
            .arg(self.project.src_dir(settings))
            .cwd(self.project.output_dir(ctx))
            .envs(&self.tool_env(ctx)?))
    }
}

impl<P: CMakeProject> BuildStep for CMakeStep<P> {
    fn name(&self) -> &str {
        self.project.name()
    }

    fn accepted_variants(&self) -> &[Variant] {
        self.project.accepted_variants()
    }

    fn supports_rebuild(&self) -> bool {
        self.project.remove_cmake_cache()
    }

    fn prepare_rebuild(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        rm_cmake_cache(&self.project.output_dir(ctx))?;
        Ok(())
    }

    fn build_config(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let output_dir = self.project.output_dir(ctx);
        if self.project.remove_cmake_cache() {
            rm_cmake_cache(&output_dir)?;
        }
        if self.project.remove_install_dir() {
            remove_dir_all_if_exists(&self.project.install_dir(ctx)?)?;
        }
        ensure_dir(&output_dir)?;

        let configure = self.configure_invocation(ctx)?;
        write_invocation_script(&output_dir.join("cmake_invocation.sh"), &configure)?;
        info!("configuring {} in {}", ctx.builder, output_dir.display());
        ctx.run(&configure)?;

        let settings = ctx.settings();
        let build = Invocation::new(settings.build_program())
            .args(self.project.targets(ctx))
            .arg(format!("-j{}", ctx.env.jobs()))
            .cwd(&output_dir)
            .envs(&self.tool_env(ctx)?);
        ctx.run(&build)?;
        Ok(())
    }

    fn install_config(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        if self.project.uses_install_target() {
            let install = Invocation::new(ctx.settings().build_program())
                .arg("install")
                .cwd(self.project.output_dir(ctx))
                .envs(&self.tool_env(ctx)?);
            ctx.run(&install)?;
        }
        self.project.after_install(ctx)
    }

    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        self.project.install_dir(ctx)
    }

    fn finalize(&self, ctx: &FinalizeContext<'_>) -> BuildResult<()> {
        self.project.finalize(ctx)
    }

    fn produced_toolchain(&self, ctx: &FinalizeContext<'_>) -> Option<Toolchain> {
        self.project.produced_toolchain(ctx)
    }
}
