//! `sdlx` application entry point.
//!
//! This binary builds and runs portable, self-executing command bundles. It
//! uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. User configuration file (`~/.config/sdlx/config.toml` or path from `SDLX_CONFIG_PATH`)
//! 3. The project's `.sdlxrc.toml`
//! 4. Environment variables (`SDLX_*`)
//! 5. Command-line arguments
//!
//! Diagnostics go to stderr through `tracing`, filtered by `SDLX_LOG`, so the
//! delegated command owns stdout.

use std::ffi::OsString;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use sdlx::api::{
    CommandOutcome, CreateBundleParams, DlxParams, RunBundleParams, create_bundle, dlx,
    run_bundle,
};
use sdlx::bootstrap::{self, BootstrapRequest};
use sdlx::config::{
    AppConfig, BootstrapArgs, Cli, Commands, ConfigRequest, CreateBundleArgs, DlxArgs,
    RunBundleArgs, load_config,
};
use sdlx::engine::HostEngine;
use sdlx::error::{FilesystemError, Result as SdlxResult};
use sdlx::project::find_project_cwd;
use sdlx::runtime::{ProcessFlags, effective_cwd, pinned_runtime, redirect};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SDLX_LOG";

/// Application entry point.
///
/// Parses the command line, loads configuration, honours a pinned runtime
/// and dispatches to the appropriate subcommand handler. Delegated exit
/// codes become the process exit code.
fn main() -> EyreResult<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let env = DefaultEnv::new();

    let outcome = run(&cli, &env).map_err(Report::from)?;
    Ok(exit_code(outcome))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(outcome: CommandOutcome) -> ExitCode {
    match outcome {
        CommandOutcome::Success => ExitCode::SUCCESS,
        CommandOutcome::CommandExit { code } => ExitCode::from(u8::try_from(code).unwrap_or(1)),
    }
}

/// Shared state every subcommand handler receives.
struct Invocation<'a> {
    process_cwd: Utf8PathBuf,
    cwd: Utf8PathBuf,
    config: AppConfig,
    engine: HostEngine,
    cli: &'a Cli,
}

/// Execute the CLI command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
fn run<E: mockable::Env>(cli: &Cli, env: &E) -> SdlxResult<CommandOutcome> {
    let process_cwd = current_dir()?;

    if let Commands::Bootstrap(ref args) = cli.command {
        return run_bootstrap(cli, args, &process_cwd);
    }

    let flags = ProcessFlags::from_env(env);
    let cwd = effective_cwd(flags, cli.cwd.as_deref(), &process_cwd);
    let project_cwd = find_project_cwd(&cwd);
    let request = ConfigRequest {
        config_path: cli.config.clone(),
        engine: cli.engine.clone(),
        project_cwd: project_cwd.clone(),
        include_user_file: !flags.ignore_cwd,
    };
    let config = load_config(&request, env)?;

    let pin_root = project_cwd.as_deref().unwrap_or(&cwd);
    if let Some(pinned) = pinned_runtime(&config, pin_root, flags, &current_exe()?)? {
        let args: Vec<OsString> = std::env::args_os().skip(1).collect();
        return redirect(&pinned, &args).map(CommandOutcome::from_exit_code);
    }

    let invocation = Invocation {
        process_cwd,
        cwd,
        config,
        engine: HostEngine::new(),
        cli,
    };

    match cli.command {
        Commands::CreateBundle(ref args) => run_create_bundle(&invocation, args),
        Commands::Dlx(ref args) => run_dlx(&invocation, args),
        Commands::RunBundle(ref args) => run_bundle_command(&invocation, args),
        Commands::Bootstrap(ref args) => run_bootstrap(cli, args, &invocation.process_cwd),
    }
}

fn run_create_bundle(invocation: &Invocation<'_>, args: &CreateBundleArgs) -> SdlxResult<CommandOutcome> {
    let runtime = tokio_runtime()?;
    let runtime_binary = current_exe()?;
    create_bundle(CreateBundleParams {
        engine: &invocation.engine,
        config: &invocation.config,
        cwd: &invocation.cwd,
        runtime_binary: &runtime_binary,
        output: &args.output,
        packages: &args.packages,
        command: &args.command,
        args: &args.args,
        include_cache: args.include_cache,
        quiet: args.quiet,
        runtime_handle: runtime.handle(),
    })
}

fn run_dlx(invocation: &Invocation<'_>, args: &DlxArgs) -> SdlxResult<CommandOutcome> {
    let runtime = tokio_runtime()?;
    dlx(DlxParams {
        engine: &invocation.engine,
        config: &invocation.config,
        cwd: &invocation.cwd,
        packages: &args.packages,
        command: &args.command,
        args: &args.args,
        quiet: args.quiet,
        runtime_handle: runtime.handle(),
    })
}

/// Run the recorded command of the bundle in the discovery directory.
///
/// Inside a sandbox discovery starts at the sandbox while `--cwd` carries
/// the directory the artifact was invoked from.
fn run_bundle_command(
    invocation: &Invocation<'_>,
    args: &RunBundleArgs,
) -> SdlxResult<CommandOutcome> {
    let caller_cwd = requested_cwd(invocation.cli, &invocation.process_cwd);
    run_bundle(RunBundleParams {
        engine: &invocation.engine,
        config: &invocation.config,
        bundle_dir: &invocation.cwd,
        caller_cwd: &caller_cwd,
        args: &args.args,
    })
}

fn run_bootstrap(
    cli: &Cli,
    args: &BootstrapArgs,
    process_cwd: &Utf8Path,
) -> SdlxResult<CommandOutcome> {
    let request = BootstrapRequest {
        artifact: AppConfig::resolve_path(process_cwd, &args.artifact),
        sandbox: args.sandbox.clone(),
        sandbox_parent: None,
        caller_cwd: requested_cwd(cli, process_cwd),
        args: args.args.clone(),
    };
    bootstrap::run(&request).map(CommandOutcome::from_exit_code)
}

fn requested_cwd(cli: &Cli, process_cwd: &Utf8Path) -> Utf8PathBuf {
    cli.cwd.as_deref().map_or_else(
        || process_cwd.to_path_buf(),
        |path| AppConfig::resolve_path(process_cwd, path),
    )
}

fn tokio_runtime() -> SdlxResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        FilesystemError::IoError {
            path: std::path::PathBuf::from("<tokio runtime>"),
            message: e.to_string(),
        }
        .into()
    })
}

fn current_dir() -> SdlxResult<Utf8PathBuf> {
    let path = std::env::current_dir()
        .map_err(|e| FilesystemError::from_io(std::path::PathBuf::from("."), &e))?;
    utf8(path)
}

fn current_exe() -> SdlxResult<Utf8PathBuf> {
    let path = std::env::current_exe()
        .map_err(|e| FilesystemError::from_io(std::path::PathBuf::from("<current executable>"), &e))?;
    utf8(path)
}

fn utf8(path: std::path::PathBuf) -> SdlxResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        FilesystemError::IoError {
            path,
            message: String::from("path is not valid UTF-8"),
        }
        .into()
    })
}
