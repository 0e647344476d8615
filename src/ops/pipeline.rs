//! Implementation of `toolstage build`.
//!
//! Runs the builders of a release in dependency order:
//!
//! ```text
//! stage1 -> [swig] -> libxml2 -> [liblzma, libncurses, libedit] -> stage2
//!        -> builtins -> libunwind -> compiler-rt
//! ```
//!
//! Bracketed builders only run when LLDB is built. Each builder gets its
//! toolchain from the one before it; nothing is looked up globally.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::builder::autoconf::AutoconfStep;
use crate::builder::cmake::CMakeStep;
use crate::builder::events::BuildEvent;
use crate::builder::llvm::LldbDeps;
use crate::builder::projects::{
    Builtins, CompilerRt, LibUnwind, Libedit, Libncurses, Libxml2, Stage1, Stage2, Swig, Xz,
};
use crate::builder::step::{BuildEnv, BuildState, BuildStep, Builder};
use crate::core::config::{config_for_host, Config};
use crate::core::toolchain::ToolchainRef;

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Name baked into the final compiler's version string
    pub build_name: String,

    /// Source revision the compiler reports
    pub revision: String,

    /// Build LLDB and the host libraries it needs
    pub build_lldb: bool,

    /// Stop after stage2
    pub skip_runtimes: bool,

    /// ThinLTO for stage2 (None = from settings)
    pub lto: Option<bool>,

    /// Debug stage2; also gives stage1 the Android backends
    pub debug: bool,

    /// PGO profile for stage2
    pub profdata_file: Option<PathBuf>,

    /// Build clang-tools-extra into stage1
    pub stage1_extra_tools: bool,

    /// Fan configs out on the rayon pool
    pub parallel: bool,

    /// Show a progress bar
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            build_name: "dev".to_string(),
            revision: "unknown".to_string(),
            build_lldb: true,
            skip_runtimes: false,
            lto: None,
            debug: false,
            profdata_file: None,
            stage1_extra_tools: false,
            parallel: false,
            progress: false,
        }
    }
}

/// What happened to one builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub state: BuildState,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,

    /// The toolchain the runtimes were installed into
    pub output_toolchain: ToolchainRef,
}

impl PipelineReport {
    pub fn built(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.state == BuildState::Installed)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.state == BuildState::Skipped)
            .count()
    }
}

/// Names of the builders a run with `options` goes through, in order.
pub fn planned_builders(options: &PipelineOptions, env: &BuildEnv) -> Vec<&'static str> {
    let mut names = vec![Stage1::NAME];
    if options.build_lldb {
        names.push(Swig::NAME);
    }
    names.push(Libxml2::NAME);
    if options.build_lldb {
        names.extend([Xz::NAME, Libncurses::NAME, Libedit::NAME]);
    }
    names.push(Stage2::NAME);
    if runs_runtimes(options, env) {
        names.extend([Builtins::NAME, LibUnwind::NAME, CompilerRt::NAME]);
    }
    names
}

/// Android runtimes are only built on Linux hosts.
fn runs_runtimes(options: &PipelineOptions, env: &BuildEnv) -> bool {
    !options.skip_runtimes && env.host.is_linux()
}

struct Pipeline<'a> {
    env: &'a BuildEnv,
    options: &'a PipelineOptions,
    host: Config,
    progress: ProgressBar,
    stages: Vec<StageReport>,
}

impl<'a> Pipeline<'a> {
    fn run<S: BuildStep>(&mut self, builder: Builder<S>) -> Result<Builder<S>> {
        let mut builder = builder.parallel(self.options.parallel);
        let name = builder.name().to_string();
        self.progress.set_message(name.clone());

        let result = builder.build(self.env);
        self.stages.push(StageReport {
            name: name.clone(),
            state: builder.state(),
        });
        self.progress.inc(1);
        result.with_context(|| format!("failed to build `{}`", name))?;
        Ok(builder)
    }

    fn host_configs(&self) -> Vec<Config> {
        vec![self.host.clone()]
    }

    fn install_dir<S: BuildStep>(&self, builder: &Builder<S>) -> Result<PathBuf> {
        builder
            .install_dir(self.env, 0)
            .with_context(|| format!("no install directory for `{}`", builder.name()))
    }

    fn run_all(&mut self) -> Result<ToolchainRef> {
        let settings = &self.env.settings;
        let options = self.options;
        let target_os = self.host.target_os;

        let prebuilt = settings
            .prebuilt_toolchain()?
            .context("no prebuilt toolchain configured (set `[prebuilt] path` in toolstage.toml)")?;

        let stage1 = Stage1::new(&options.revision, options.build_lldb)
            .with_extra_tools(options.stage1_extra_tools)
            .with_android_targets(options.debug);
        let stage1 = self.run(Builder::new(
            CMakeStep::new(stage1),
            self.host_configs(),
            Arc::new(prebuilt),
        )?)?;
        let stage1_tc = stage1.installed_toolchain()?;
        info!("stage1 toolchain: {}", stage1_tc);

        let mut deps = LldbDeps::default();
        if options.build_lldb {
            let swig = self.run(Builder::new(
                AutoconfStep::new(Swig),
                self.host_configs(),
                stage1_tc.clone(),
            )?)?;
            deps.swig = Some(Swig::executable(&self.install_dir(&swig)?));
        }

        let libxml2 = self.run(Builder::new(
            CMakeStep::new(Libxml2),
            self.host_configs(),
            stage1_tc.clone(),
        )?)?;
        deps.libxml2 = Some(Libxml2::lib_info(&self.install_dir(&libxml2)?, target_os));

        if options.build_lldb {
            let xz = self.run(Builder::new(CMakeStep::new(Xz), self.host_configs(), stage1_tc.clone())?)?;
            deps.liblzma = Some(Xz::lib_info(&self.install_dir(&xz)?, target_os));

            let ncurses = self.run(Builder::new(
                AutoconfStep::new(Libncurses),
                self.host_configs(),
                stage1_tc.clone(),
            )?)?;
            let ncurses_info = Libncurses::info(&self.install_dir(&ncurses)?, target_os);

            let libedit = self.run(Builder::new(
                AutoconfStep::new(Libedit::new(ncurses_info.clone())),
                self.host_configs(),
                stage1_tc.clone(),
            )?)?;
            deps.libedit = Some(Libedit::info(&self.install_dir(&libedit)?, target_os));
            deps.libncurses = Some(ncurses_info);
        }

        let mut tags = Vec::new();
        if options.profdata_file.is_none() {
            tags.push("NO PGO PROFILE".to_string());
        }
        let stage2 = Stage2::new(&options.revision, options.build_lldb)
            .with_build_name(&options.build_name)
            .with_tags(tags)
            .with_lldb_deps(deps)
            .with_lto(options.lto.unwrap_or_else(|| settings.lto()))
            .with_debug_build(options.debug)
            .with_profdata(options.profdata_file.clone());
        let stage2 = self.run(Builder::new(
            CMakeStep::new(stage2),
            self.host_configs(),
            stage1_tc.clone(),
        )?)?;
        let output = stage2.installed_toolchain()?;
        info!("output toolchain: {}", output);

        if runs_runtimes(options, self.env) {
            // A debug stage2 is too slow to compile anything with; stage1
            // has the Android backends for that case.
            let compiler = if options.debug { &stage1_tc } else { &output };
            self.run_runtimes(compiler, &output)?;
        } else if !options.skip_runtimes {
            info!("skipping runtimes: only built on linux hosts");
        }
        Ok(output)
    }

    /// Runtimes compile with `compiler` and install into `output`.
    fn run_runtimes(&mut self, compiler: &ToolchainRef, output: &ToolchainRef) -> Result<()> {
        let paths = self.env.settings.target_paths();

        self.run(
            Builder::new(CMakeStep::new(Builtins), Builtins::configs(&paths), compiler.clone())?
                .with_output_toolchain(output.clone()),
        )?;
        self.run(
            Builder::new(CMakeStep::new(LibUnwind), LibUnwind::configs(&paths), compiler.clone())?
                .with_output_toolchain(output.clone()),
        )?;
        self.run(
            Builder::new(CMakeStep::new(CompilerRt), CompilerRt::configs(&paths), compiler.clone())?
                .with_output_toolchain(output.clone()),
        )?;
        Ok(())
    }
}

fn progress_bar(options: &PipelineOptions, total: usize) -> ProgressBar {
    if !options.progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Run every builder of a release.
///
/// `build_times.txt` is written to the output directory whether or not the
/// run succeeds.
pub fn build(env: &BuildEnv, options: &PipelineOptions) -> Result<PipelineReport> {
    let start = Instant::now();
    let host = config_for_host(env.host, &env.settings.target_paths());
    let planned = planned_builders(options, env);
    info!("building {} on {} ({} builders)", options.build_name, env.host, planned.len());

    let mut pipeline = Pipeline {
        env,
        options,
        host,
        progress: progress_bar(options, planned.len()),
        stages: Vec::new(),
    };
    let result = pipeline.run_all();
    pipeline.progress.finish_and_clear();

    let times = env.out_dir().join("build_times.txt");
    if let Err(e) = env.times.write_report(&times) {
        warn!("failed to write {}: {:#}", times.display(), e);
    }

    for name in env.registry.unmatched_selections() {
        let message = format!("no builder named `{}`", name);
        warn!("{}", message);
        env.events.emit(&BuildEvent::warning(message));
    }

    let stages = pipeline.stages;
    let built = stages
        .iter()
        .filter(|s| s.state == BuildState::Installed)
        .count() as u64;
    env.events.emit(&BuildEvent::pipeline_finished(
        result.is_ok(),
        start.elapsed().as_millis() as u64,
        built,
    ));

    let output_toolchain = result?;
    Ok(PipelineReport {
        stages,
        output_toolchain,
    })
}
