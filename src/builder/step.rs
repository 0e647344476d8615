//! The builder lifecycle.
//!
//! A [`Builder`] owns a [`BuildStep`] plus the configs it fans out over. The
//! step provides the per-config work; the builder drives it through the
//! selection check, the config loop, finalize, and toolchain hand-off.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::builder::events::{BuildEvent, EventSink, NullSink};
use crate::builder::registry::BuilderRegistry;
use crate::core::config::{Config, Variant};
use crate::core::error::{BuildError, BuildResult, ConfigError};
use crate::core::host::Host;
use crate::core::toolchain::{Toolchain, ToolchainRef};
use crate::util::config::Settings;
use crate::util::process::{Invocation, ProcessOutput, ProcessRunner};
use crate::util::timer::BuildTimes;

/// Everything a build needs that is shared across builders.
#[derive(Clone)]
pub struct BuildEnv {
    pub runner: Arc<dyn ProcessRunner>,
    pub registry: BuilderRegistry,
    pub settings: Arc<Settings>,
    /// The machine running the build
    pub host: Host,
    pub events: Arc<dyn EventSink>,
    pub times: Arc<BuildTimes>,
}

impl BuildEnv {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: Settings) -> Self {
        BuildEnv {
            runner,
            registry: BuilderRegistry::default(),
            settings: Arc::new(settings),
            host: Host::build_host(),
            events: Arc::new(NullSink),
            times: Arc::new(BuildTimes::new()),
        }
    }

    pub fn with_registry(mut self, registry: BuilderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }

    pub fn out_dir(&self) -> PathBuf {
        self.settings.out_dir()
    }

    pub fn jobs(&self) -> usize {
        self.settings.jobs()
    }
}

impl fmt::Debug for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildEnv")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// One unit of per-config work.
///
/// Passed by reference to every per-config hook; there is no mutable
/// "current config" on the builder.
#[derive(Clone, Copy)]
pub struct ConfigContext<'a> {
    pub builder: &'a str,
    pub config: &'a Config,
    pub index: usize,
    /// Compiles the sources
    pub toolchain: &'a Toolchain,
    /// Receives installed runtimes
    pub output_toolchain: &'a Toolchain,
    pub env: &'a BuildEnv,
}

impl<'a> ConfigContext<'a> {
    pub fn host(&self) -> Host {
        self.env.host
    }

    pub fn settings(&self) -> &'a Settings {
        &self.env.settings
    }

    pub fn is_cross_compiling(&self) -> bool {
        self.config.target_os != self.env.host
    }

    pub fn cc(&self) -> PathBuf {
        self.config.c_compiler(self.toolchain)
    }

    pub fn cxx(&self) -> PathBuf {
        self.config.cxx_compiler(self.toolchain)
    }

    pub fn linker(&self) -> Option<PathBuf> {
        self.config.linker(self.toolchain)
    }

    /// `<out>/lib/<builder><suffix>`
    pub fn default_output_dir(&self) -> PathBuf {
        self.env
            .out_dir()
            .join("lib")
            .join(format!("{}{}", self.builder, self.config.output_suffix()))
    }

    /// Linker flags every builder starts from.
    ///
    /// Native builds with a freshly built toolchain link against its libc++.
    pub fn base_ldflags(&self) -> Vec<String> {
        if !self.is_cross_compiling() && !self.toolchain.is_prebuilt() {
            vec![format!("-L{}", self.toolchain.lib_dir().display())]
        } else {
            Vec::new()
        }
    }

    /// Environment for external tools: the config's variables, with its
    /// `PATH` entries put in front of the inherited `PATH`.
    pub fn process_env(&self) -> BuildResult<BTreeMap<String, String>> {
        let mut env = self.config.env()?;
        if let Some(path) = env.get_mut("PATH") {
            if let Some(inherited) = std::env::var_os("PATH").filter(|p| !p.is_empty()) {
                let sep = if self.env.host.is_windows() { ";" } else { ":" };
                *path = format!("{}{}{}", path, sep, inherited.to_string_lossy());
            }
        }
        Ok(env)
    }

    pub fn run(&self, invocation: &Invocation) -> BuildResult<ProcessOutput> {
        self.env.runner.run(invocation)
    }
}

/// Context for the once-per-builder hooks.
#[derive(Clone, Copy)]
pub struct FinalizeContext<'a> {
    pub builder: &'a str,
    pub configs: &'a [Config],
    pub toolchain: &'a Toolchain,
    pub output_toolchain: &'a Toolchain,
    pub env: &'a BuildEnv,
}

impl FinalizeContext<'_> {
    pub fn out_dir(&self) -> PathBuf {
        self.env.out_dir()
    }
}

/// The work a builder does. Implemented by the tool bindings.
pub trait BuildStep: Send + Sync {
    /// Registry key and directory name.
    fn name(&self) -> &str;

    fn accepted_variants(&self) -> &[Variant] {
        &[Variant::Default]
    }

    /// Whether calling `build()` twice is allowed.
    fn supports_rebuild(&self) -> bool {
        false
    }

    /// Clear state left by an earlier build of this config.
    fn prepare_rebuild(&self, _ctx: &ConfigContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn build_config(&self, ctx: &ConfigContext<'_>) -> BuildResult<()>;

    fn install_config(&self, _ctx: &ConfigContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    /// Where one config installs to.
    fn install_dir(&self, ctx: &ConfigContext<'_>) -> BuildResult<PathBuf> {
        Ok(sibling_install_dir(ctx.default_output_dir()))
    }

    /// Runs once, after every config installed.
    fn finalize(&self, _ctx: &FinalizeContext<'_>) -> BuildResult<()> {
        Ok(())
    }

    /// The toolchain this step installs, if it builds one.
    ///
    /// Must not touch the filesystem: it is also asked when the step is
    /// skipped.
    fn produced_toolchain(&self, _ctx: &FinalizeContext<'_>) -> Option<Toolchain> {
        None
    }
}

/// `foo` -> `foo-install`, next to it.
pub fn sibling_install_dir(output_dir: PathBuf) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|n| format!("{}-install", n.to_string_lossy()))
        .unwrap_or_else(|| "install".to_string());
    output_dir.with_file_name(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPhase {
    Building,
    Installing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    Running { config: usize, phase: ConfigPhase },
    Finalizing,
    Installed,
    Skipped,
    Failed,
}

/// A build step bound to its configs and toolchains.
pub struct Builder<S: BuildStep> {
    step: S,
    configs: Vec<Config>,
    toolchain: ToolchainRef,
    output_toolchain: ToolchainRef,
    state: BuildState,
    parallel: bool,
    installed: Option<ToolchainRef>,
}

impl<S: BuildStep> Builder<S> {
    /// Bind `step` to its configs. Configs carrying a variant the step does
    /// not accept are rejected here, before anything runs.
    pub fn new(step: S, configs: Vec<Config>, toolchain: ToolchainRef) -> BuildResult<Self> {
        if configs.is_empty() {
            return Err(BuildError::Invariant {
                builder: step.name().to_string(),
                message: "no configs to build".to_string(),
            });
        }
        let accepted = step.accepted_variants();
        if let Some(config) = configs.iter().find(|c| !accepted.contains(&c.variant)) {
            return Err(ConfigError::InvalidVariant {
                builder: step.name().to_string(),
                variant: config.variant,
                accepted: accepted
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
            .into());
        }

        Ok(Builder {
            step,
            configs,
            output_toolchain: toolchain.clone(),
            toolchain,
            state: BuildState::NotStarted,
            parallel: false,
            installed: None,
        })
    }

    /// Install into a different toolchain than the one compiling.
    pub fn with_output_toolchain(mut self, output_toolchain: ToolchainRef) -> Self {
        self.output_toolchain = output_toolchain;
        self
    }

    /// Run per-config work on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn name(&self) -> &str {
        self.step.name()
    }

    pub fn step(&self) -> &S {
        &self.step
    }

    pub fn configs(&self) -> &[Config] {
        &self.configs
    }

    pub fn toolchain(&self) -> &ToolchainRef {
        &self.toolchain
    }

    pub fn output_toolchain(&self) -> &ToolchainRef {
        &self.output_toolchain
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn context<'a>(&'a self, env: &'a BuildEnv, index: usize, config: &'a Config) -> ConfigContext<'a> {
        ConfigContext {
            builder: self.step.name(),
            config,
            index,
            toolchain: &self.toolchain,
            output_toolchain: &self.output_toolchain,
            env,
        }
    }

    fn finalize_context<'a>(&'a self, env: &'a BuildEnv) -> FinalizeContext<'a> {
        FinalizeContext {
            builder: self.step.name(),
            configs: &self.configs,
            toolchain: &self.toolchain,
            output_toolchain: &self.output_toolchain,
            env,
        }
    }

    /// Install directory of the config at `index`.
    pub fn install_dir(&self, env: &BuildEnv, index: usize) -> BuildResult<PathBuf> {
        let config = self.configs.get(index).ok_or_else(|| BuildError::Invariant {
            builder: self.name().to_string(),
            message: format!("no config at index {}", index),
        })?;
        self.step.install_dir(&self.context(env, index, config))
    }

    /// Build and install every config, then finalize.
    pub fn build(&mut self, env: &BuildEnv) -> BuildResult<()> {
        let name = self.step.name().to_string();

        if !env.registry.should_build(&name) {
            info!("skipping {}", name);
            env.events.emit(&BuildEvent::skipped(&name));
            self.installed = self
                .step
                .produced_toolchain(&self.finalize_context(env))
                .map(Arc::new);
            self.state = BuildState::Skipped;
            return Ok(());
        }

        match self.state {
            BuildState::NotStarted | BuildState::Skipped => {}
            BuildState::Installed | BuildState::Failed if self.step.supports_rebuild() => {
                for (index, config) in self.configs.iter().enumerate() {
                    self.step.prepare_rebuild(&self.context(env, index, config))?;
                }
            }
            _ => return Err(BuildError::AlreadyBuilt(name)),
        }

        info!("building {} ({} configs)", name, self.configs.len());
        env.events
            .emit(&BuildEvent::builder_started(&name, self.configs.len()));
        let start = Instant::now();

        let result = self.run_all(env);
        let duration_ms = start.elapsed().as_millis() as u64;
        env.events
            .emit(&BuildEvent::builder_finished(&name, result.is_ok(), duration_ms));

        match result {
            Ok(()) => {
                self.installed = self
                    .step
                    .produced_toolchain(&self.finalize_context(env))
                    .map(Arc::new);
                self.state = BuildState::Installed;
                Ok(())
            }
            Err(e) => {
                self.state = BuildState::Failed;
                Err(e)
            }
        }
    }

    fn run_all(&mut self, env: &BuildEnv) -> BuildResult<()> {
        if self.parallel {
            let step = &self.step;
            let toolchain = &*self.toolchain;
            let output_toolchain = &*self.output_toolchain;
            self.state = BuildState::Running {
                config: 0,
                phase: ConfigPhase::Building,
            };
            self.configs
                .par_iter()
                .enumerate()
                .try_for_each(|(index, config)| {
                    let ctx = ConfigContext {
                        builder: step.name(),
                        config,
                        index,
                        toolchain,
                        output_toolchain,
                        env,
                    };
                    run_config(step, &ctx, &mut |_| {})
                })?;
        } else {
            for (index, config) in self.configs.iter().enumerate() {
                let ctx = ConfigContext {
                    builder: self.step.name(),
                    config,
                    index,
                    toolchain: &self.toolchain,
                    output_toolchain: &self.output_toolchain,
                    env,
                };
                let state = &mut self.state;
                run_config(&self.step, &ctx, &mut |phase| {
                    *state = BuildState::Running {
                        config: index,
                        phase,
                    }
                })?;
            }
        }

        self.state = BuildState::Finalizing;
        debug!("finalizing {}", self.step.name());
        self.step.finalize(&self.finalize_context(env))
    }

    /// The toolchain this builder installed.
    ///
    /// Available once `build()` returned `Ok`, whether the builder ran or
    /// was skipped.
    pub fn installed_toolchain(&self) -> BuildResult<ToolchainRef> {
        match self.state {
            BuildState::Installed | BuildState::Skipped => self
                .installed
                .clone()
                .ok_or_else(|| BuildError::NoToolchain(self.name().to_string())),
            _ => Err(BuildError::NotBuilt(self.name().to_string())),
        }
    }
}

impl<S: BuildStep> fmt::Debug for Builder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.step.name())
            .field("configs", &self.configs.len())
            .field("toolchain", &self.toolchain.to_string())
            .field("output_toolchain", &self.output_toolchain.to_string())
            .field("state", &self.state)
            .finish()
    }
}

fn run_config<S: BuildStep>(
    step: &S,
    ctx: &ConfigContext<'_>,
    on_phase: &mut dyn FnMut(ConfigPhase),
) -> BuildResult<()> {
    let label = format!("{}_{}", ctx.builder, ctx.config.name);
    info!("building {} for {}", ctx.builder, ctx.config);
    ctx.env
        .events
        .emit(&BuildEvent::config_started(ctx.builder, &ctx.config.name, ctx.index));

    let start = Instant::now();
    on_phase(ConfigPhase::Building);
    step.build_config(ctx)?;
    on_phase(ConfigPhase::Installing);
    step.install_config(ctx)?;
    ctx.env.times.record(label, start.elapsed());

    let install_dir = step.install_dir(ctx)?;
    ctx.env.events.emit(&BuildEvent::config_installed(
        ctx.builder,
        &ctx.config.name,
        install_dir,
    ));
    Ok(())
}
