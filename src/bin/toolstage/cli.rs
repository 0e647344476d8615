//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// toolstage - multi-stage compiler toolchain builds
#[derive(Parser)]
#[command(name = "toolstage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (defaults to ./toolstage.toml)
    #[arg(long, global = true, env = "TOOLSTAGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
pub struct GlobalArgs {
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the staged toolchain build
    Build(BuildArgs),

    /// Show the compiler/linker flags and CMake defines of a target config
    Flags(FlagsArgs),

    /// Inspect a toolchain
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Only build these builders
    #[arg(long = "build", value_name = "NAME", conflicts_with = "skip")]
    pub build: Vec<String>,

    /// Build everything except these builders
    #[arg(long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Do not build anything; reuse whatever is already installed
    #[arg(long)]
    pub skip_build: bool,

    /// Print commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for build progress
    #[arg(long, value_enum, default_value = "human")]
    pub message_format: MessageFormat,

    /// Number of parallel jobs passed to make/ninja
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not build LLDB or the libraries it depends on
    #[arg(long)]
    pub no_lldb: bool,

    /// Stop after stage2
    #[arg(long)]
    pub skip_runtimes: bool,

    /// Name embedded in the compiler version string
    #[arg(long, default_value = "dev")]
    pub build_name: String,

    /// Source revision the compiler reports
    #[arg(long, default_value = "unknown", env = "TOOLSTAGE_REVISION")]
    pub revision: String,

    /// Enable ThinLTO for stage2
    #[arg(long, conflicts_with = "no_lto")]
    pub lto: bool,

    /// Disable ThinLTO for stage2
    #[arg(long)]
    pub no_lto: bool,

    /// Build a debug stage2
    #[arg(long)]
    pub debug: bool,

    /// Profile data for PGO
    #[arg(long, value_name = "FILE")]
    pub profdata: Option<PathBuf>,

    /// Build clang-tools-extra into stage1
    #[arg(long)]
    pub stage1_extra_tools: bool,

    /// Build the configs of a builder in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Linux,
    Darwin,
    Mingw,
    Msvc,
    Android,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Config preset to show
    #[arg(value_enum)]
    pub preset: Preset,

    /// Architecture (android only)
    #[arg(long, default_value = "aarch64")]
    pub arch: String,

    /// Library variant (android only)
    #[arg(long, default_value = "default")]
    pub variant: String,

    /// NDK config instead of platform (android only)
    #[arg(long)]
    pub ndk: bool,

    /// Static runtime linking (android only)
    #[arg(long)]
    pub static_link: bool,

    /// Show which layer contributed each flag
    #[arg(long)]
    pub layers: bool,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(subcommand)]
    pub command: ToolchainCommands,
}

#[derive(Subcommand)]
pub enum ToolchainCommands {
    /// Show a toolchain's location, version and runtime directories
    Show(ToolchainShowArgs),
}

#[derive(Args)]
pub struct ToolchainShowArgs {
    /// Toolchain root (defaults to the configured prebuilt)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
