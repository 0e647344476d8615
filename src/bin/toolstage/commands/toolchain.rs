//! `toolstage toolchain` command

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, ToolchainArgs, ToolchainCommands, ToolchainShowArgs};
use toolstage::core::Toolchain;
use toolstage::util::process::{find_cmake, find_make, find_ninja};

pub fn execute(global: &GlobalArgs, args: ToolchainArgs) -> Result<()> {
    match args.command {
        ToolchainCommands::Show(show) => show_toolchain(global, show),
    }
}

fn show_toolchain(global: &GlobalArgs, args: ToolchainShowArgs) -> Result<()> {
    let settings = super::settings(global)?;

    let toolchain = match args.path {
        Some(path) => Toolchain::prebuilt(path),
        None => settings.prebuilt_toolchain()?.context(
            "no toolchain given and no prebuilt configured (set `[prebuilt] path` in toolstage.toml)",
        )?,
    };

    println!("Toolchain: {}", toolchain);
    println!();
    println!("  Path:     {}", toolchain.path().display());
    println!("  CC:       {}", toolchain.cc().display());
    println!("  CXX:      {}", toolchain.cxx().display());

    match toolchain.version() {
        Ok(version) => {
            println!("  Version:  {}", version.version);
            println!("  Resource: {}", toolchain.resource_dir()?.display());
        }
        Err(e) => println!("  Version:  unknown ({})", e),
    }

    println!();
    println!("Build tools:");
    println!("  cmake:    {}", super::display_or_none(find_cmake()));
    println!("  make:     {}", super::display_or_none(find_make()));
    println!("  ninja:    {}", super::display_or_none(find_ninja()));
    println!("  python:   {}", super::display_or_none(settings.python()));
    println!("  generator: {}", settings.generator());

    Ok(())
}
