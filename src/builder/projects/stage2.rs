//! The shipped compiler, built with stage1.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builder::cmake::CMakeProject;
use crate::builder::llvm::{
    install_lldb_deps, llvm_source, stage_install_dir, stage_output_dir, stage_toolchain,
    toolchain_defines, LldbDeps, ToolchainBuild, ANDROID_TARGETS,
};
use crate::builder::step::{ConfigContext, FinalizeContext};
use crate::core::error::BuildResult;
use crate::core::host::Host;
use crate::core::toolchain::Toolchain;
use crate::util::config::Settings;
use crate::util::fs::write_string;

#[derive(Debug, Clone)]
pub struct Stage2 {
    build: ToolchainBuild,
    lto: bool,
    debug_build: bool,
    profdata_file: Option<PathBuf>,
}

impl Stage2 {
    pub const NAME: &'static str = "stage2";

    pub fn new(revision: impl Into<String>, build_lldb: bool) -> Self {
        let mut projects = vec![
            "clang",
            "lld",
            "libcxxabi",
            "libcxx",
            "compiler-rt",
            "clang-tools-extra",
            "polly",
        ];
        if build_lldb {
            projects.push("lldb");
        }
        Stage2 {
            build: ToolchainBuild {
                build_name: Self::NAME.to_string(),
                revision: revision.into(),
                projects: projects.into_iter().map(String::from).collect(),
                targets: ANDROID_TARGETS.iter().map(|t| t.to_string()).collect(),
                build_lldb,
                ..ToolchainBuild::default()
            },
            lto: true,
            debug_build: false,
            profdata_file: None,
        }
    }

    /// Name baked into the compiler's version string.
    pub fn with_build_name(mut self, build_name: impl Into<String>) -> Self {
        self.build.build_name = build_name.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.build.tags = tags;
        self
    }

    pub fn with_lldb_deps(mut self, deps: LldbDeps) -> Self {
        self.build.deps = deps;
        self
    }

    pub fn with_lto(mut self, lto: bool) -> Self {
        self.lto = lto;
        self
    }

    pub fn with_debug_build(mut self, debug_build: bool) -> Self {
        self.debug_build = debug_build;
        self
    }

    pub fn with_profdata(mut self, profdata_file: Option<PathBuf>) -> Self {
        self.profdata_file = profdata_file;
        self
    }

    pub fn toolchain_build(&self) -> &ToolchainBuild {
        &self.build
    }
}

fn lldb_wrapper(target_os: Host) -> String {
    let lib_path_env = if target_os.is_linux() {
        "LD_LIBRARY_PATH"
    } else {
        "DYLD_LIBRARY_PATH"
    };
    format!(
        "#!/bin/bash\n\
         CURDIR=$(cd $(dirname $0) && pwd)\n\
         export PYTHONHOME=\"$CURDIR/../python3\"\n\
         export {env}=\"$CURDIR/../python3/lib:${env}\"\n\
         \"$CURDIR/lldb\" \"$@\"\n",
        env = lib_path_env
    )
}

impl CMakeProject for Stage2 {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn src_dir(&self, settings: &Settings) -> PathBuf {
        llvm_source(settings, "llvm")
    }

    fn output_dir(&self, ctx: &ConfigContext<'_>) -> PathBuf {
        stage_output_dir(&ctx.env.out_dir(), Self::NAME)
    }

    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        Ok(stage_install_dir(&ctx.env.out_dir(), Self::NAME))
    }

    fn cflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        if self.profdata_file.is_some() {
            vec![
                "-Wno-profile-instr-out-of-date".to_string(),
                "-Wno-profile-instr-unprofiled".to_string(),
            ]
        } else {
            Vec::new()
        }
    }

    fn env(&self, ctx: &ConfigContext<'_>, env: &mut BTreeMap<String, String>) {
        // Configure checks run binaries linked against stage1's libc++.
        env.insert(
            "LD_LIBRARY_PATH".to_string(),
            ctx.toolchain.lib_dir().display().to_string(),
        );
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        toolchain_defines(ctx, &self.build, defines)?;
        let target_os = ctx.config.target_os;
        let mut set = |key: &str, value: String| {
            defines.insert(key.to_string(), value);
        };

        set("SANITIZER_ALLOW_CXXABI", "OFF".to_string());
        set("CLANG_PYTHON_BINDINGS_VERSIONS", "3".to_string());

        if self.lto && !target_os.is_darwin() && !self.debug_build {
            set("LLVM_ENABLE_LTO", "Thin".to_string());
        }

        // libFuzzer is exported for host fuzzer builds; it does not build on Darwin.
        let libfuzzer = if target_os.is_darwin() { "OFF" } else { "ON" };
        set("COMPILER_RT_BUILD_LIBFUZZER", libfuzzer.to_string());

        if self.debug_build {
            set("CMAKE_BUILD_TYPE", "Debug".to_string());
        }
        if let Some(profdata) = &self.profdata_file {
            set("LLVM_PROFDATA_FILE", profdata.display().to_string());
        }

        if target_os.is_linux() {
            set("LIBCXX_ENABLE_STATIC_ABI_LIBRARY", "ON".to_string());
            set("LIBCXX_ENABLE_ABI_LINKER_SCRIPT", "OFF".to_string());
            let cxx_flags = defines.get("CMAKE_CXX_FLAGS").cloned().unwrap_or_default();
            let exe_flags = defines
                .get("CMAKE_EXE_LINKER_FLAGS")
                .cloned()
                .unwrap_or_default();
            defines.insert("LIBCXX_TEST_COMPILER_FLAGS".to_string(), cxx_flags);
            defines.insert("LIBCXX_TEST_LINKER_FLAGS".to_string(), exe_flags);
        }
        if target_os.is_darwin() {
            defines.insert("LLVM_BUILD_EXTERNAL_COMPILER_RT".to_string(), "ON".to_string());
        }
        Ok(())
    }

    fn remove_install_dir(&self) -> bool {
        true
    }

    fn after_install(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let install_dir = stage_install_dir(&ctx.env.out_dir(), Self::NAME);
        if self.build.build_lldb {
            install_lldb_deps(&install_dir, ctx.config.target_os, &self.build.deps)?;
        }

        let wrapper = install_dir.join("bin").join("lldb.sh");
        write_string(&wrapper, &lldb_wrapper(ctx.config.target_os))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755))
                .map_err(anyhow::Error::from)?;
        }
        Ok(())
    }

    fn produced_toolchain(&self, ctx: &FinalizeContext<'_>) -> Option<Toolchain> {
        Some(stage_toolchain(ctx, Self::NAME))
    }
}
