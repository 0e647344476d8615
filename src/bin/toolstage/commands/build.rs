//! `toolstage build` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs, MessageFormat};
use toolstage::builder::events::JsonLinesSink;
use toolstage::builder::{BuildEnv, BuilderRegistry, SelectionPolicy};
use toolstage::ops::{build, planned_builders, PipelineOptions};
use toolstage::util::process::{DryRunRunner, ProcessRunner, SystemRunner};

pub fn execute(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let mut settings = super::settings(global)?;

    // Jobs: CLI > settings > available parallelism
    if let Some(jobs) = args.jobs {
        settings.build.jobs = Some(jobs);
    }

    let runner: Arc<dyn ProcessRunner> = if args.dry_run {
        Arc::new(DryRunRunner::new())
    } else {
        Arc::new(SystemRunner::new())
    };

    let policy = SelectionPolicy::from_selection(&args.build, &args.skip, args.skip_build);
    let json = args.message_format == MessageFormat::Json;

    let mut env = BuildEnv::new(runner, settings).with_registry(BuilderRegistry::new(policy));
    if json {
        env = env.with_events(Arc::new(JsonLinesSink::new()));
    }

    let lto = match (args.lto, args.no_lto) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    let options = PipelineOptions {
        build_name: args.build_name,
        revision: args.revision,
        build_lldb: !args.no_lldb,
        skip_runtimes: args.skip_runtimes,
        lto,
        debug: args.debug,
        profdata_file: args.profdata,
        stage1_extra_tools: args.stage1_extra_tools,
        parallel: args.parallel,
        progress: !json && !global.verbose,
    };

    if !json {
        eprintln!(
            "    Planning {}",
            planned_builders(&options, &env).join(" -> ")
        );
    }

    let report = build(&env, &options)?;

    if !json {
        eprintln!(
            "    Finished {} builder(s), {} skipped",
            report.built(),
            report.skipped()
        );
        eprintln!(
            "      Output {}",
            report.output_toolchain.path().display()
        );
    }

    Ok(())
}
