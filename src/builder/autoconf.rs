//! Autoconf binding.
//!
//! Runs `configure && make && make install` out of tree. Compiler flags are
//! passed through `@file` argument files so `configure` scripts that mangle
//! `CFLAGS` cannot drop them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::builder::step::{sibling_install_dir, BuildStep, ConfigContext};
use crate::core::config::Variant;
use crate::core::error::BuildResult;
use crate::core::host::Host;
use crate::core::lib_info::LibInfo;
use crate::util::config::Settings;
use crate::util::fs::{
    ensure_dir, remove_dir_all_if_exists, touch_autoconf_files, write_invocation_script,
    write_string,
};
use crate::util::process::Invocation;

/// One autoconf source tree.
pub trait AutoconfProject: Send + Sync {
    fn name(&self) -> &str;

    fn src_dir(&self, settings: &Settings) -> PathBuf;

    fn accepted_variants(&self) -> &[Variant] {
        &[Variant::Default]
    }

    /// Arguments after `--prefix`.
    fn config_flags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
        Vec::new()
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

    /// The installed library, for projects that produce one.
    fn lib_info(&self, _install_dir: &Path, _target_os: Host) -> Option<LibInfo> {
        None
    }
}

/// Drives an [`AutoconfProject`] once per config.
#[derive(Debug, Clone)]
pub struct AutoconfStep<P> {
    project: P,
}

impl<P: AutoconfProject> AutoconfStep<P> {
    pub fn new(project: P) -> Self {
        AutoconfStep { project }
    }

    pub fn project(&self) -> &P {
        &self.project
    }

    pub fn output_dir(&self, ctx: &ConfigContext<'_>) -> PathBuf {
        ctx.default_output_dir()
    }

    /// Deployment target and SDK flags, empty off Darwin.
    ///
    /// Asks `xcrun` once per config; the result goes into both flag files.
    pub fn sdk_flags(&self, ctx: &ConfigContext<'_>) -> BuildResult<Vec<String>> {
        if !ctx.config.target_os.is_darwin() {
            return Ok(Vec::new());
        }
        let output = ctx.run(&Invocation::new("xcrun").arg("--show-sdk-path"))?;
        let sdk = output.stdout.trim();
        let min = ctx.settings().mac_min_version();
        Ok(vec![
            format!("-mmacosx-version-min={}", min),
            format!("-DMACOSX_DEPLOYMENT_TARGET={}", min),
            format!("-isysroot{}", sdk),
            format!("-Wl,-syslibroot,{}", sdk),
        ])
    }

    pub fn cflags(&self, ctx: &ConfigContext<'_>, sdk_flags: &[String]) -> Vec<String> {
        let mut flags = ctx.config.compiler_flags();
        flags.push("-fPIC".to_string());
        flags.push("-Wno-unused-command-line-argument".to_string());
        flags.extend_from_slice(sdk_flags);
        flags.extend(self.project.cflags(ctx));
        flags
    }

    pub fn cxxflags(&self, ctx: &ConfigContext<'_>, sdk_flags: &[String]) -> Vec<String> {
        let mut flags = ctx.config.cxx_flags();
        flags.push("-fPIC".to_string());
        flags.push("-Wno-unused-command-line-argument".to_string());
        flags.push("-stdlib=libc++".to_string());
        flags.extend_from_slice(sdk_flags);
        flags.extend(self.project.cxxflags(ctx));
        flags
    }

    pub fn ldflags(&self, ctx: &ConfigContext<'_>) -> Vec<String> {
        let mut flags = ctx.config.linker_flags();
        flags.extend(ctx.base_ldflags());
        match ctx.config.target_os {
            Host::Darwin => flags.push("-Wl,-rpath,@loader_path/../lib".to_string()),
            Host::Linux => flags.push("-Wl,-rpath,$ORIGIN/../lib".to_string()),
            Host::Windows | Host::Android => {}
        }
        flags.extend(self.project.ldflags(ctx));
        flags
    }

    fn tool_env(&self, ctx: &ConfigContext<'_>, output_dir: &Path) -> BuildResult<BTreeMap<String, String>> {
        let mut env = ctx.process_env()?;
        env.insert(
            "CC".to_string(),
            format!("{} @{}", ctx.cc().display(), output_dir.join("cflags").display()),
        );
        env.insert(
            "CXX".to_string(),
            format!("{} @{}", ctx.cxx().display(), output_dir.join("cxxflags").display()),
        );
        if ctx.config.target_os.is_darwin() {
            // Universal binaries.
            let arches = "-arch arm64 -arch x86_64".to_string();
            env.insert("CFLAGS".to_string(), arches.clone());
            env.insert("CXXFLAGS".to_string(), arches);
        }
        Ok(env)
    }

    /// Installed library for one config, if the project is a library.
    pub fn lib_info(&self, ctx: &ConfigContext<'_>) -> Option<LibInfo> {
        let install_dir = sibling_install_dir(self.output_dir(ctx));
        self.project.lib_info(&install_dir, ctx.config.target_os)
    }
}

impl<P: AutoconfProject> BuildStep for AutoconfStep<P> {
    fn name(&self) -> &str {
        self.project.name()
    }

    fn accepted_variants(&self) -> &[Variant] {
        self.project.accepted_variants()
    }

    fn build_config(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let output_dir = self.output_dir(ctx);
        let install_dir = sibling_install_dir(output_dir.clone());
        let src_dir = self.project.src_dir(ctx.settings());

        remove_dir_all_if_exists(&install_dir)?;
        ensure_dir(&output_dir)?;
        touch_autoconf_files(&src_dir)?;

        // Linker flags ride along in the argument files: libtool drops
        // LDFLAGS it does not understand.
        let ldflags = self.ldflags(ctx);
        let sdk_flags = self.sdk_flags(ctx)?;
        let mut cflags = self.cflags(ctx, &sdk_flags);
        cflags.extend(ldflags.iter().cloned());
        let mut cxxflags = self.cxxflags(ctx, &sdk_flags);
        cxxflags.extend(ldflags);
        write_string(&output_dir.join("cflags"), &cflags.join(" "))?;
        write_string(&output_dir.join("cxxflags"), &cxxflags.join(" "))?;

        let env = self.tool_env(ctx, &output_dir)?;
        let configure = Invocation::new(src_dir.join("configure"))
            .arg(format!("--prefix={}", install_dir.display()))
            .args(self.project.config_flags(ctx))
            .cwd(&output_dir)
            .envs(&env);
        write_invocation_script(&output_dir.join("config_invocation.sh"), &configure)?;
        info!("configuring {} in {}", ctx.builder, output_dir.display());
        ctx.run(&configure)?;

        let make = Invocation::new(ctx.settings().make())
            .arg(format!("-j{}", ctx.env.jobs()))
            .cwd(&output_dir)
            .envs(&env);
        ctx.run(&make)?;
        Ok(())
    }

    fn install_config(&self, ctx: &ConfigContext<'_>) -> BuildResult<()> {
        let output_dir = self.output_dir(ctx);
        let install = Invocation::new(ctx.settings().make())
            .arg("install")
            .cwd(&output_dir)
            .envs(&self.tool_env(ctx, &output_dir)?);
        ctx.run(&install)?;

        if let Some(lib) = self.lib_info(ctx) {
            lib.update_lib_id(ctx.env.runner.as_ref(), &ctx.settings().install_name_tool())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use crate::builder::step::Builder;
    use crate::core::config::{darwin_config, linux_config, TargetPaths};
    use crate::core::toolchain::Toolchain;
    use crate::test_support::{test_env, touch_file, CommandPattern, MockProcessOutput, RecordingRunner};

    struct Libfoo;

    impl AutoconfProject for Libfoo {
        fn name(&self) -> &str {
            "libfoo"
        }

        fn src_dir(&self, settings: &Settings) -> PathBuf {
            settings.source_path("libfoo")
        }

        fn config_flags(&self, _ctx: &ConfigContext<'_>) -> Vec<String> {
            vec!["--with-shared".to_string()]
        }

        fn lib_info(&self, install_dir: &Path, target_os: Host) -> Option<LibInfo> {
            Some(LibInfo::shared("libfoo", "1", install_dir, target_os))
        }
    }

    #[test]
    fn test_linux_configure_make_install() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Linux);
        let stage1 = Arc::new(Toolchain::stage("stage1", "/out/stage1-install", None));
        touch_file(&tmp.path().join("src/libfoo/configure"));
        let stale = tmp.path().join("out/lib/libfoo-linux-install/stale");
        touch_file(&stale);

        let mut builder = Builder::new(
            AutoconfStep::new(Libfoo),
            vec![linux_config(&TargetPaths::default())],
            stage1,
        )
        .unwrap();
        builder.build(&env).unwrap();

        assert!(!stale.exists());
        let output_dir = tmp.path().join("out/lib/libfoo-linux");
        let cflags = fs::read_to_string(output_dir.join("cflags")).unwrap();
        assert!(cflags.contains("-fPIC"));
        assert!(cflags.contains("-L/out/stage1-install/lib"));
        assert!(cflags.contains("-Wl,-rpath,$ORIGIN/../lib"));
        let cxxflags = fs::read_to_string(output_dir.join("cxxflags")).unwrap();
        assert!(cxxflags.contains("-stdlib=libc++"));
        assert!(output_dir.join("config_invocation.sh").is_file());

        let calls = runner.invocations();
        assert_eq!(calls.len(), 3);
        let configure = &calls[0];
        assert!(configure.get_program().ends_with("src/libfoo/configure"));
        assert_eq!(
            configure.get_args(),
            [
                format!("--prefix={}", output_dir.with_file_name("libfoo-linux-install").display()),
                "--with-shared".to_string(),
            ]
        );
        assert!(configure.get_env()["CC"].ends_with(&format!("@{}", output_dir.join("cflags").display())));
        assert_eq!(calls[1].get_args(), ["-j4"]);
        assert_eq!(calls[2].get_args(), ["install"]);
    }

    #[test]
    fn test_darwin_sdk_flags_and_lib_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.expect(
            CommandPattern::Exact("xcrun --show-sdk-path".to_string()),
            MockProcessOutput::success("/Applications/Xcode.app/SDKs/MacOSX.sdk\n"),
        );
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Darwin);
        let prebuilt = Arc::new(Toolchain::prebuilt("/prebuilt"));

        let mut builder = Builder::new(
            AutoconfStep::new(Libfoo),
            vec![darwin_config(&TargetPaths::default())],
            prebuilt,
        )
        .unwrap();
        builder.build(&env).unwrap();

        let output_dir = tmp.path().join("out/lib/libfoo-darwin");
        let cflags = fs::read_to_string(output_dir.join("cflags")).unwrap();
        assert!(cflags.contains("-isysroot/Applications/Xcode.app/SDKs/MacOSX.sdk"));
        assert!(cflags.contains("-mmacosx-version-min=10.14"));
        assert!(cflags.contains("-Wl,-rpath,@loader_path/../lib"));
        let cxxflags = fs::read_to_string(output_dir.join("cxxflags")).unwrap();
        assert!(cxxflags.contains("-isysroot/Applications/Xcode.app/SDKs/MacOSX.sdk"));
        assert_eq!(runner.invocations_of("xcrun").len(), 1);

        let configure = runner
            .invocations()
            .into_iter()
            .find(|inv| inv.get_program().ends_with("configure"))
            .unwrap();
        assert_eq!(configure.get_env()["CFLAGS"], "-arch arm64 -arch x86_64");

        let ids = runner.invocations_of("install_name_tool");
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].get_args()[1], "@rpath/libfoo.1.dylib");
    }

    #[test]
    fn test_configure_failure_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        runner.expect(
            CommandPattern::Contains("configure".to_string()),
            MockProcessOutput::failure(77, "C compiler cannot create executables"),
        );
        let env = test_env(tmp.path(), runner.clone()).with_host(Host::Linux);
        let mut builder = Builder::new(
            AutoconfStep::new(Libfoo),
            vec![linux_config(&TargetPaths::default())],
            Arc::new(Toolchain::prebuilt("/prebuilt")),
        )
        .unwrap();

        let err = builder.build(&env).unwrap_err();

        assert_eq!(err.exit_code(), Some(77));
        assert!(err.to_string().contains("cannot create executables"));
        assert_eq!(runner.calls().len(), 1);
    }
}
