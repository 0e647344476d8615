//! Bootstrap compiler, built with the prebuilt toolchain.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builder::cmake::CMakeProject;
use crate::builder::llvm::{
    install_lldb_deps, llvm_source, stage_install_dir, stage_output_dir, stage_toolchain,
    toolchain_defines, ToolchainBuild, ANDROID_TARGETS, HOST_TARGETS,
};
use crate::builder::step::{ConfigContext, FinalizeContext};
use crate::core::error::BuildResult;
use crate::core::toolchain::Toolchain;
use crate::util::config::Settings;

#[derive(Debug, Clone)]
pub struct Stage1 {
    build: ToolchainBuild,
    extra_tools: bool,
}

impl Stage1 {
    pub const NAME: &'static str = "stage1";

    pub fn new(revision: impl Into<String>, build_lldb: bool) -> Self {
        let mut stage = Stage1 {
            build: ToolchainBuild {
                build_name: Self::NAME.to_string(),
                revision: revision.into(),
                build_lldb,
                ..ToolchainBuild::default()
            },
            extra_tools: false,
        };
        stage.update_lists(false);
        stage
    }

    /// Also build clang-tools-extra, for running tests against stage1.
    pub fn with_extra_tools(mut self, extra_tools: bool) -> Self {
        self.extra_tools = extra_tools;
        let android = self.build.targets.len() > HOST_TARGETS.len();
        self.update_lists(android);
        self
    }

    /// Include the Android backends.
    pub fn with_android_targets(mut self, android_targets: bool) -> Self {
        self.update_lists(android_targets);
        self
    }

    fn update_lists(&mut self, android_targets: bool) {
        let mut projects = vec!["clang", "lld", "libcxxabi", "libcxx", "compiler-rt"];
        if self.extra_tools {
            projects.push("clang-tools-extra");
        }
        if self.build.build_lldb {
            projects.push("lldb");
        }
        self.build.projects = projects.into_iter().map(String::from).collect();

        let mut targets: Vec<&str> = HOST_TARGETS.to_vec();
        if android_targets {
            targets.extend(ANDROID_TARGETS);
        }
        self.build.targets = targets.into_iter().map(String::from).collect();
    }

    pub fn toolchain_build(&self) -> &ToolchainBuild {
        &self.build
    }
}

impl CMakeProject for Stage1 {
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

    fn ldflags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        // Link libc++ statically so nothing needs an rpath into the prebuilt.
        vec!["-static-libstdc++".to_string()]
    }

    fn defines(&self, ctx: &ConfigContext<'_>, defines: &mut BTreeMap<String, String>) -> BuildResult<()> {
        toolchain_defines(ctx, &self.build, defines)?;
        let mut set = |key: &str, value: &str| {
            defines.insert(key.to_string(), value.to_string());
        };

        set("CLANG_ENABLE_ARCMT", "OFF");
        if !self.extra_tools {
            set("CLANG_ENABLE_STATIC_ANALYZER", "OFF");
        }
        set("LLVM_BUILD_TOOLS", "ON");

        // libc++.so as a symlink rather than a linker script, with libc++abi
        // linked in.
        if ctx.config.target_os.is_linux() {
            set("LIBCXX_ENABLE_ABI_LINKER_SCRIPT", "OFF");
            set("LIBCXX_ENABLE_STATIC_ABI_LIBRARY", "ON");
        }
        if ctx.config.target_os.is_darwin() {
            set("LLVM_BUILD_EXTERNAL_COMPILER_RT", "ON");
        }
        set("COMPILER_RT_BUILD_LIBFUZZER", "OFF");
        Ok(())
    }

    fn after_install(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        if self.build.build_lldb {
            install_lldb_deps(
                &stage_install_dir(&ctx.env.out_dir(), Self::NAME),
                ctx.config.target_os,
                &self.build.deps,
            )?;
        }
        Ok(())
    }

    fn produced_toolchain(&self, ctx: &FinalizeContext<'_>) -> Option<Toolchain> {
        Some(stage_toolchain(ctx, Self::NAME))
    }
}
