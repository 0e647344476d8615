//! `toolstage flags` command

use anyhow::{Context, Result};

use crate::cli::{FlagsArgs, GlobalArgs, Preset};
use toolstage::core::config::{
    android_config, darwin_config, linux_config, mingw_config, msvc_config, AndroidOptions,
};
use toolstage::core::host::Arch;
use toolstage::core::Config;

pub fn execute(global: &GlobalArgs, args: FlagsArgs) -> Result<()> {
    let settings = super::settings(global)?;
    let paths = settings.target_paths();

    let config = match args.preset {
        Preset::Linux => linux_config(&paths),
        Preset::Darwin => darwin_config(&paths),
        Preset::Mingw => mingw_config(&paths),
        Preset::Msvc => {
            let sdk = settings
                .paths
                .msvc_sdk
                .clone()
                .context("no MSVC SDK configured (set `[paths] msvc_sdk` in toolstage.toml)")?;
            msvc_config(sdk)
        }
        Preset::Android => {
            let arch: Arch = args.arch.parse()?;
            let options = AndroidOptions {
                platform: !args.ndk,
                static_link: args.static_link,
                variant: args.variant.parse()?,
                ..AndroidOptions::default()
            };
            android_config(arch, &options, &paths)
        }
    };

    print_header(&config);
    if args.layers {
        print_layers(&config);
    } else {
        print_flags(&config);
    }
    Ok(())
}

fn print_header(config: &Config) {
    match config.llvm_triple() {
        Ok(triple) => println!("# {} [{}]", config, triple),
        Err(_) => println!("# {}", config),
    }
    println!("#   layers: {}", config.layer_names().join(", "));
    let suffix = config.output_suffix();
    if !suffix.is_empty() {
        println!("#   output suffix: {}", suffix);
    }
    if let Some(sysroot) = config.sysroot() {
        println!("#   sysroot: {}", sysroot.display());
    }
}

fn print_flags(config: &Config) {
    print_list("cflags", &config.compiler_flags());
    print_list("cxxflags", &config.cxx_flags());
    print_list("ldflags", &config.linker_flags());

    let defines = config.cmake_defines();
    if !defines.is_empty() {
        println!("cmake:");
        for (key, value) in &defines {
            println!("  -D{}={}", key, value);
        }
    }
}

fn print_list(label: &str, flags: &[String]) {
    if flags.is_empty() {
        return;
    }
    println!("{}:", label);
    for flag in flags {
        println!("  {}", flag);
    }
}

fn print_layers(config: &Config) {
    for contribution in config.contributions() {
        let from = contribution.layer;
        for flag in &contribution.compiler_flags {
            println!("  {}    # cflags from: {}", flag, from);
        }
        for flag in &contribution.cxx_flags {
            println!("  {}    # cxxflags from: {}", flag, from);
        }
        for flag in &contribution.linker_flags {
            println!("  {}    # ldflags from: {}", flag, from);
        }
        for (key, value) in &contribution.cmake_defines {
            println!("  -D{}={}    # cmake from: {}", key, value, from);
        }
    }
}
