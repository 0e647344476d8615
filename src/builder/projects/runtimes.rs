//! Android runtime libraries, installed into the output toolchain.
//!
//! Each runtime is compiled by one toolchain and installed into another (the
//! builder's output toolchain), so a stage's runtimes can be built with the
//! compiler of that same stage before it is packaged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::builder::cmake::CMakeProject;
use crate::builder::llvm::{llvm_source, runtime_defines, runtime_install_dir};
use crate::builder::step::{sibling_install_dir, ConfigContext, FinalizeContext};
use crate::core::config::{android_config, android_configs, AndroidOptions, Config, TargetPaths, Variant};
use crate::core::error::BuildResult;
use crate::core::host::Arch;
use crate::util::config::Settings;
use crate::util::fs::{copy_dir_all, copy_file, ensure_dir, glob_files, verify_artifacts};

fn ndk_options() -> AndroidOptions {
    AndroidOptions {
        platform: false,
        ..AndroidOptions::default()
    }
}

/// Platform configs followed by NDK configs, one per architecture each.
fn platform_and_ndk_configs(paths: &TargetPaths) -> Vec<Config> {
    let mut configs = android_configs(&AndroidOptions::default(), paths);
    configs.extend(android_configs(&ndk_options(), paths));
    configs
}

fn is_platform(ctx: &ConfigContext<'_>) -> BuildResult<bool> {
    Ok(ctx.config.android()?.platform)
}

/// compiler-rt builtins.
///
/// Built for the NDK only: platform and NDK builds share one toolchain, and
/// a toolchain has a single resource directory.
#[derive(Debug, Clone, Default)]
pub struct Builtins;

impl Builtins {
    pub const NAME: &'static str = "builtins";

    /// NDK configs, plus arm and i386 builds with exported symbols for
    /// bionic's libc.so and libm.so.
    pub fn configs(paths: &TargetPaths) -> Vec<Config> {
        let mut configs = android_configs(&ndk_options(), paths);
        let exported = AndroidOptions {
            variant: Variant::Exported,
            ..ndk_options()
        };
        for arch in [Arch::Arm, Arch::I386] {
            configs.push(android_config(arch, &exported, paths));
        }
        configs
    }

    fn file_name(arch: Arch, exported: bool) -> String {
        let suffix = if exported { "-exported" } else { "" };
        format!("libclang_rt.builtins-{}-android{}.a", arch.llvm_arch(), suffix)
    }
}

impl CMakeProject for Builtins {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        llvm_source(settings, "compiler-rt/lib/builtins")
    }

    fn accepted_variants(&self) -> &[Variant] {
        &[Variant::Default, Variant::Exported]
    }

    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        Ok(ctx.output_toolchain.resource_dir()?)
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        runtime_defines(ctx, defines);
        let exported = ctx.config.variant == Variant::Exported;
        let mut set = |key: &str, value: String| {
            defines.insert(key.to_string(), value);
        };
        let hide = if exported { "FALSE" } else { "TRUE" };
        set("COMPILER_RT_BUILTINS_HIDE_SYMBOLS", hide.to_string());
        set("COMPILER_RT_DEFAULT_TARGET_TRIPLE", ctx.config.llvm_triple()?);
        // Nothing can be linked before the builtins exist.
        set("CMAKE_TRY_COMPILE_TARGET_TYPE", "STATIC_LIBRARY".to_string());
        set("COMPILER_RT_EXCLUDE_ATOMIC_BUILTIN", "OFF".to_string());
        Ok(())
    }

    fn uses_install_target(&self) -> bool {
        false
    }

    fn after_install(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let arch = ctx.config.target_arch;
        let file_name = Self::file_name(arch, false);
        let src = self.output_dir(ctx).join("lib").join("linux").join(&file_name);
        verify_artifacts([src.as_path()])?;

        let out_res_dir = ctx.output_toolchain.resource_dir()?;
        if ctx.config.variant == Variant::Exported {
            // Only for bionic's libc.so.
            copy_file(&src, &out_res_dir.join(Self::file_name(arch, true)))?;
            return Ok(());
        }

        copy_file(&src, &out_res_dir.join(&file_name))?;
        // The compiling toolchain also needs them to build the other runtimes.
        let in_res_dir = ctx.toolchain.resource_dir()?;
        if in_res_dir != out_res_dir {
            copy_file(&src, &in_res_dir.join(&file_name))?;
        }
        let ndk_dir = ctx.output_toolchain.path().join("runtimes_ndk_cxx");
        copy_file(&src, &ndk_dir.join(&file_name))?;
        Ok(())
    }
}

/// Sanitizer and profiling runtimes.
#[derive(Debug, Clone, Default)]
pub struct CompilerRt;

impl CompilerRt {
    pub const NAME: &'static str = "compiler-rt";

    pub fn configs(paths: &TargetPaths) -> Vec<Config> {
        platform_and_ndk_configs(paths)
    }

    fn lib_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        Ok(self.install_dir(ctx)?.join("lib").join("linux"))
    }
}

impl CMakeProject for CompilerRt {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        llvm_source(settings, "compiler-rt")
    }

    /// Platform runtimes go straight into the output toolchain; NDK runtimes
    /// install next to the build and are copied afterwards.
    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        if is_platform(ctx)? {
            Ok(ctx.output_toolchain.clang_lib_dir()?)
        } else {
            Ok(sibling_install_dir(self.output_dir(ctx)))
        }
    }

    fn cflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        vec!["-funwind-tables".to_string()]
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        runtime_defines(ctx, defines);
        let c_flags = defines.get("CMAKE_C_FLAGS").cloned().unwrap_or_default();
        let mut set = |key: &str, value: String| {
            defines.insert(key.to_string(), value);
        };

        set("COMPILER_RT_BUILD_BUILTINS", "OFF".to_string());
        set("COMPILER_RT_USE_BUILTINS_LIBRARY", "ON".to_string());
        set("COMPILER_RT_TEST_COMPILER_CFLAGS", c_flags);
        set("COMPILER_RT_DEFAULT_TARGET_TRIPLE", ctx.config.llvm_triple()?);
        set("COMPILER_RT_INCLUDE_TESTS", "OFF".to_string());
        set("SANITIZER_CXX_ABI", "libcxxabi".to_string());

        let mut libs = Vec::new();
        if ctx.config.api_level()? < 21 {
            libs.push("-landroid_support");
        }
        // -rtlib=compiler-rt does not pull in libunwind.a on Android.
        libs.push("-lunwind");
        set("SANITIZER_COMMON_LINK_LIBS", libs.join(" "));
        set("SANITIZER_COMMON_LINK_FLAGS", "-Wl,-z,defs".to_string());
        if is_platform(ctx)? {
            set("COMPILER_RT_HWASAN_WITH_INTERCEPTORS", "OFF".to_string());
        }

        // Installs to lib/linux, not lib/android.
        defines.remove("CMAKE_SYSTEM_NAME");
        Ok(())
    }

    fn after_install(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let arch = ctx.config.target_arch;
        let lib_dir = self.lib_dir(ctx)?;

        // Older consumers look for <arch>/libFuzzer.a.
        let fuzzer = lib_dir.join(format!("libclang_rt.fuzzer-{}-android.a", arch.llvm_arch()));
        verify_artifacts([fuzzer.as_path()])?;
        copy_file(&fuzzer, &lib_dir.join(arch.as_str()).join("libFuzzer.a"))?;

        if !is_platform(ctx)? {
            let ndk_dir = ctx.output_toolchain.path().join("runtimes_ndk_cxx");
            copy_dir_all(&lib_dir, &ndk_dir)?;
        }
        Ok(())
    }

    fn finalize(&self, ctx: &FinalizeContext<'_>) -> BuildResult<()> {
        let header_src = self.src_dir(&ctx.env.settings).join("lib").join("fuzzer");
        let header_dst = ctx
            .output_toolchain
            .path()
            .join("prebuilt_include")
            .join("llvm")
            .join("lib")
            .join("Fuzzer");
        ensure_dir(&header_dst)?;
        let headers = glob_files(&header_src, &["*.h".to_string(), "*.def".to_string()])?;
        debug!("installing {} fuzzer headers", headers.len());
        for header in headers {
            if let Some(name) = header.file_name() {
                copy_file(&header, &header_dst.join(name))?;
            }
        }

        let res_dir = ctx.output_toolchain.resource_dir()?;
        link_hwasan_static(&res_dir)
    }
}

/// `libclang_rt.hwasan_static` is an alias of the hwasan archive.
fn link_hwasan_static(res_dir: &Path) -> BuildResult<()> {
    let link = res_dir.join("libclang_rt.hwasan_static-aarch64-android.a");
    let _ = std::fs::remove_file(&link);
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink("libclang_rt.hwasan-aarch64-android.a", &link)
            .map_err(anyhow::Error::from)?;
    }
    #[cfg(not(unix))]
    {
        copy_file(&res_dir.join("libclang_rt.hwasan-aarch64-android.a"), &link)?;
    }
    Ok(())
}

/// The unwinder.
///
/// Platform configs build the copy with exported symbols that bionic's
/// libc.so re-exports; NDK configs build the hermetic copy everything else
/// links.
#[derive(Debug, Clone, Default)]
pub struct LibUnwind;

impl LibUnwind {
    pub const NAME: &'static str = "libunwind";

    pub fn configs(paths: &TargetPaths) -> Vec<Config> {
        platform_and_ndk_configs(paths)
    }
}

impl CMakeProject for LibUnwind {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        llvm_source(settings, "libunwind")
    }

    fn output_dir(&self, ctx: &ConfigContext<'_>) -> PathBuf {
        let base = ctx.default_output_dir();
        let exported = ctx.config.android().map(|a| a.platform).unwrap_or(false);
        let suffix = if exported { "-exported" } else { "-hermetic" };
        let name = base
            .file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), suffix))
            .unwrap_or_else(|| suffix.trim_start_matches('-').to_string());
        base.with_file_name(name)
    }

    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        runtime_install_dir(ctx)
    }

    fn cflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        vec!["-D_LIBUNWIND_USE_DLADDR=0".to_string()]
    }

    fn ldflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        // libunwind.a does not exist yet.
        vec!["-unwindlib=none".to_string()]
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        runtime_defines(ctx, defines);
        let exported = is_platform(ctx)?;
        let bool_str = |b: bool| (if b { "TRUE" } else { "FALSE" }).to_string();
        let mut set = |key: &str, value: String| {
            defines.insert(key.to_string(), value);
        };

        set("LIBUNWIND_HIDE_SYMBOLS", bool_str(!exported));
        set("LIBUNWIND_ENABLE_SHARED", bool_str(false));
        set(
            "LIBUNWIND_ENABLE_ASSERTIONS",
            bool_str(ctx.settings().enable_assertions()),
        );
        // The frame header cache needs dl_phdr_info fields only newer bionic has.
        set("LIBUNWIND_USE_FRAME_HEADER_CACHE", bool_str(exported));
        set("LIBUNWIND_TARGET_TRIPLE", ctx.config.llvm_triple()?);
        Ok(())
    }

    fn uses_install_target(&self) -> bool {
        false
    }

    fn after_install(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let src = self.output_dir(ctx).join("lib").join("libunwind.a");
        verify_artifacts([src.as_path()])?;
        let arch = ctx.config.target_arch.as_str();
        let out_res_dir = ctx.output_toolchain.resource_dir()?.join(arch);

        if is_platform(ctx)? {
            copy_file(&src, &out_res_dir.join("libunwind-exported.a"))?;
            return Ok(());
        }

        copy_file(&src, &out_res_dir.join("libunwind.a"))?;
        let in_res_dir = ctx.toolchain.resource_dir()?.join(arch);
        if in_res_dir != out_res_dir {
            copy_file(&src, &in_res_dir.join("libunwind.a"))?;
        }
        let ndk_dir = ctx.output_toolchain.path().join("runtimes_ndk_cxx").join(arch);
        copy_file(&src, &ndk_dir.join("libunwind.a"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::builder::cmake::CMakeStep;
    use crate::builder::step::Builder;
    use crate::core::host::Host;
    use crate::test_support::{fake_toolchain, test_env, touch_file, RecordingRunner};

    #[test]
    fn test_builtins_configs() {
        let configs = Builtins::configs(&TargetPaths::default());
        assert_eq!(configs.len(), 6);
        assert!(configs.iter().all(|c| !c.android().unwrap().platform));
        let exported: Vec<Arch> = configs
            .iter()
            .filter(|c| c.variant == Variant::Exported)
            .map(|c| c.target_arch)
            .collect();
        assert_eq!(exported, vec![Arch::Arm, Arch::I386]);
    }

    #[test]
    fn test_builtins_install_into_both_toolchains() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Linux);
        let input = Arc::new(fake_toolchain(&tmp.path().join("stage1-install"), "14.0.6"));
        let output = Arc::new(fake_toolchain(&tmp.path().join("stage2-install"), "14.0.6"));

        let configs = Builtins::configs(&TargetPaths::default());
        let out_lib = tmp.path().join("out/lib");
        touch_file(&out_lib.join("builtins-i386-ndk-cxx/lib/linux/libclang_rt.builtins-i686-android.a"));
        touch_file(&out_lib.join("builtins-arm-ndk-cxx/lib/linux/libclang_rt.builtins-arm-android.a"));
        touch_file(&out_lib.join("builtins-aarch64-ndk-cxx/lib/linux/libclang_rt.builtins-aarch64-android.a"));
        touch_file(&out_lib.join("builtins-x86_64-ndk-cxx/lib/linux/libclang_rt.builtins-x86_64-android.a"));
        touch_file(&out_lib.join("builtins-arm-ndk-cxx-exported/lib/linux/libclang_rt.builtins-arm-android.a"));
        touch_file(&out_lib.join("builtins-i386-ndk-cxx-exported/lib/linux/libclang_rt.builtins-i686-android.a"));

        let mut builder = Builder::new(CMakeStep::new(Builtins), configs, input)
            .unwrap()
            .with_output_toolchain(output);
        builder.build(&env).unwrap();

        // configure + build per config, no install target.
        assert_eq!(runner.invocations().len(), 12);
        let input_bin = tmp.path().join("stage1-install/bin");
        for configure in runner.invocations_of("cmake") {
            let define = |key: &str| {
                let prefix = format!("-D{}=", key);
                configure
                    .get_args()
                    .iter()
                    .find_map(|a| a.strip_prefix(prefix.as_str()).map(PathBuf::from))
                    .unwrap()
            };
            assert!(define("CMAKE_C_COMPILER").starts_with(&input_bin));
            assert!(define("CMAKE_CXX_COMPILER").starts_with(&input_bin));
            assert!(define("LLVM_CONFIG_PATH").starts_with(&input_bin));
        }
        let out_res = tmp.path().join("stage2-install/lib/clang/14.0.6/lib/linux");
        assert!(out_res.join("libclang_rt.builtins-i686-android.a").is_file());
        assert!(out_res.join("libclang_rt.builtins-arm-android-exported.a").is_file());
        assert!(tmp
            .path()
            .join("stage1-install/lib/clang/14.0.6/lib/linux/libclang_rt.builtins-aarch64-android.a")
            .is_file());
        assert!(tmp
            .path()
            .join("stage2-install/runtimes_ndk_cxx/libclang_rt.builtins-x86_64-android.a")
            .is_file());
        assert!(!tmp
            .path()
            .join("stage2-install/runtimes_ndk_cxx/libclang_rt.builtins-arm-android-exported.a")
            .exists());
    }

    #[test]
    fn test_compiler_rt_defines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = test_env(tmp.path(), Arc::new(RecordingRunner::new())).with_host(Host::Linux);
        let toolchain = fake_toolchain(&tmp.path().join("stage2-install"), "14.0.6");
        let configs = CompilerRt::configs(&TargetPaths::default());
        let ndk_arm = configs
            .iter()
            .find(|c| c.target_arch == Arch::Arm && !c.android().unwrap().platform)
            .unwrap();
        let ctx = ConfigContext {
            builder: CompilerRt::NAME,
            config: ndk_arm,
            index: 0,
            toolchain: &toolchain,
            output_toolchain: &toolchain,
            env: &env,
        };

        let defines = CMakeStep::new(CompilerRt).cmake_defines(&ctx).unwrap();

        assert!(!defines.contains_key("CMAKE_SYSTEM_NAME"));
        assert_eq!(defines["SANITIZER_COMMON_LINK_LIBS"], "-landroid_support -lunwind");
        assert_eq!(defines["COMPILER_RT_TEST_COMPILER_CFLAGS"], defines["CMAKE_C_FLAGS"]);
        assert!(defines["CMAKE_C_FLAGS"].contains("-funwind-tables"));
        assert!(!defines.contains_key("COMPILER_RT_HWASAN_WITH_INTERCEPTORS"));
        assert!(defines["CMAKE_INSTALL_PREFIX"].ends_with("compiler-rt-arm-ndk-cxx-install"));

        let platform = &configs[0];
        let ctx = ConfigContext { config: platform, ..ctx };
        let defines = CMakeStep::new(CompilerRt).cmake_defines(&ctx).unwrap();
        assert_eq!(defines["SANITIZER_COMMON_LINK_LIBS"], "-lunwind");
        assert_eq!(defines["COMPILER_RT_HWASAN_WITH_INTERCEPTORS"], "OFF");
        assert_eq!(
            PathBuf::from(&defines["CMAKE_INSTALL_PREFIX"]),
            tmp.path().join("stage2-install/lib/clang/14.0.6")
        );
    }

    #[test]
    fn test_libunwind_installs_exported_and_hermetic_copies() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = test_env(tmp.path(), Arc::new(RecordingRunner::new())).with_host(Host::Linux);
        let toolchain = Arc::new(fake_toolchain(&tmp.path().join("stage2-install"), "14.0.6"));
        let paths = TargetPaths::default();
        let configs = vec![
            android_config(Arch::Aarch64, &AndroidOptions::default(), &paths),
            android_config(Arch::Aarch64, &ndk_options(), &paths),
        ];
        let out_lib = tmp.path().join("out/lib");
        touch_file(&out_lib.join("libunwind-aarch64-exported/lib/libunwind.a"));
        touch_file(&out_lib.join("libunwind-aarch64-ndk-cxx-hermetic/lib/libunwind.a"));

        let mut builder = Builder::new(CMakeStep::new(LibUnwind), configs, toolchain).unwrap();
        builder.build(&env).unwrap();

        let res = tmp.path().join("stage2-install/lib/clang/14.0.6/lib/linux/aarch64");
        assert!(res.join("libunwind-exported.a").is_file());
        assert!(res.join("libunwind.a").is_file());
        assert!(tmp
            .path()
            .join("stage2-install/runtimes_ndk_cxx/aarch64/libunwind.a")
            .is_file());
    }

    #[test]
    fn test_libunwind_missing_archive_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = test_env(tmp.path(), Arc::new(RecordingRunner::new())).with_host(Host::Linux);
        let toolchain = Arc::new(fake_toolchain(&tmp.path().join("stage2-install"), "14.0.6"));
        let configs = vec![android_config(
            Arch::X86_64,
            &AndroidOptions::default(),
            &TargetPaths::default(),
        )];

        let mut builder = Builder::new(CMakeStep::new(LibUnwind), configs, toolchain).unwrap();
        let err = builder.build(&env).unwrap_err();
        assert!(err.to_string().contains("libunwind.a"));
    }
}
