//! Command-line argument definitions for sdlx.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for sdlx.
#[derive(Debug, Parser)]
#[command(name = "sdlx")]
#[command(
    author,
    version,
    about = "Build and run portable, self-executing command bundles"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Directory to run from instead of the current one.
    #[arg(long, global = true)]
    pub cwd: Option<Utf8PathBuf>,

    /// Package-manager engine program.
    #[arg(long, global = true)]
    pub engine: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a package binary in a temporary environment.
    Dlx(DlxArgs),

    /// Create a self-unpacking script that runs a command.
    CreateBundle(CreateBundleArgs),

    /// Run the command recorded in an extracted bundle.
    #[command(hide = true)]
    RunBundle(RunBundleArgs),

    /// Unpack a bundle artifact into a sandbox and run it.
    #[command(hide = true)]
    Bootstrap(BootstrapArgs),
}

/// Arguments for the `dlx` subcommand.
#[derive(Debug, Parser)]
pub struct DlxArgs {
    /// The package to run the provided command from.
    #[arg(short = 'p', long = "package")]
    pub packages: Vec<String>,

    /// Only report critical errors instead of printing the full install logs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Binary to run, as a package descriptor.
    #[arg(required = true)]
    pub command: String,

    /// Arguments passed to the binary.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the `create-bundle` subcommand.
#[derive(Debug, Parser)]
pub struct CreateBundleArgs {
    /// Path to the self-unpacking script file to create.
    #[arg(short, long, default_value = "sdlx.sh")]
    pub output: Utf8PathBuf,

    /// Only report critical errors instead of printing the full install logs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Include the package cache in the output script.
    #[arg(long)]
    pub include_cache: bool,

    /// Packages to add to the bundled project.
    #[arg(short = 'p', long = "package")]
    pub packages: Vec<String>,

    /// Binary the bundle runs.
    #[arg(required = true)]
    pub command: String,

    /// Arguments recorded alongside the binary.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the `run-bundle` subcommand.
#[derive(Debug, Parser)]
pub struct RunBundleArgs {
    /// Extra arguments appended to the recorded command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the `bootstrap` subcommand.
#[derive(Debug, Parser)]
pub struct BootstrapArgs {
    /// Sandbox already populated by the artifact loader.
    #[arg(long)]
    pub sandbox: Option<Utf8PathBuf>,

    /// The artifact being executed.
    #[arg(required = true)]
    pub artifact: Utf8PathBuf,

    /// Arguments the artifact was invoked with.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
