//! Process-backed engine implementation.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use camino::Utf8Path;
use tracing::info;

use super::{EngineContext, InstallOptions, InstallReport, PackageManager};
use crate::config::AppConfig;
use crate::error::{EngineError, Result};
use crate::process::{exit_code, run_to_completion};
use crate::project::Workspace;

/// Environment variable naming the workspace a binary runs from.
pub const PROJECT_CWD_ENV: &str = "SDLX_PROJECT_CWD";

/// Environment variable listing the resolved plugin files.
pub const PLUGINS_ENV: &str = "SDLX_PLUGINS";

/// Drives the engine program named by `engine.program`.
///
/// The program must implement the `sdlx` engine protocol below; package
/// managers that only read their own settings will not see the sandbox.
/// Every child receives the effective cache, telemetry and plugin settings
/// through `SDLX_*` variables:
///
/// - `add` runs `<program> add -- <packages>` in the project root;
/// - `install` runs `<program> install [--immutable] [--immutable-cache]`
///   with its output captured and forwarded to the report;
/// - `execute_binary` runs `<program> run <binary> <args>` in the caller's
///   directory with `SDLX_PROJECT_CWD` pointing at the workspace.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostEngine;

impl HostEngine {
    /// Create a host engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn command(ctx: &EngineContext) -> Result<Command> {
        let config = &ctx.config;
        let program = engine_program(config)?;
        let mut command = Command::new(program);
        command.current_dir(&ctx.project_cwd);

        if let Some(ref cache_folder) = config.cache_folder {
            command.env(
                "SDLX_CACHE_FOLDER",
                AppConfig::resolve_path(&ctx.project_cwd, cache_folder),
            );
        }
        command.env(
            "SDLX_ENABLE_GLOBAL_CACHE",
            config.enable_global_cache.to_string(),
        );
        command.env(
            "SDLX_ENABLE_TELEMETRY",
            ctx.telemetry.allows(config).to_string(),
        );
        command.env(PLUGINS_ENV, plugin_list(ctx, program)?);
        Ok(command)
    }
}

fn engine_program(config: &AppConfig) -> Result<&str> {
    config
        .engine
        .program
        .as_deref()
        .ok_or_else(|| EngineError::ProgramNotConfigured.into())
}

fn plugin_list(ctx: &EngineContext, program: &str) -> Result<OsString> {
    let plugins = ctx.config.resolved_plugins(&ctx.project_cwd);
    std::env::join_paths(plugins.iter().map(|path| path.as_std_path())).map_err(|e| {
        EngineError::SpawnFailed {
            program: program.to_owned(),
            message: format!("plugin paths cannot be passed to the engine: {e}"),
        }
        .into()
    })
}

impl PackageManager for HostEngine {
    fn add(&self, ctx: &EngineContext, packages: &[String]) -> Result<i32> {
        info!(project = %ctx.project_cwd, ?packages, "adding packages");
        let mut command = Self::command(ctx)?;
        command.arg("add").arg("--").args(packages);
        if ctx.quiet {
            command.stdout(Stdio::null());
        }
        run_to_completion(&mut command)
    }

    fn install(
        &self,
        ctx: &EngineContext,
        options: InstallOptions,
        report: &mut dyn InstallReport,
    ) -> Result<()> {
        let program = engine_program(&ctx.config)?.to_owned();
        let mut command = Self::command(ctx)?;
        command.arg("install");
        if options.immutable {
            command.arg("--immutable");
        }
        if options.immutable_cache {
            command.arg("--immutable-cache");
        }

        info!(project = %ctx.project_cwd, ?options, "installing");
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| EngineError::SpawnFailed {
                program: program.clone(),
                message: e.to_string(),
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            report.report_info(line);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = exit_code(output.status);
        if code == 0 {
            for line in stderr.lines() {
                report.report_warning(line);
            }
            return Ok(());
        }

        let detail = stderr.trim();
        if detail.is_empty() {
            report.report_error(&format!("{program} install exited with code {code}"))
        } else {
            report.report_error(&format!(
                "{program} install exited with code {code}: {detail}"
            ))
        }
    }

    fn execute_binary(
        &self,
        ctx: &EngineContext,
        workspace: &Workspace,
        binary: &str,
        args: &[String],
        cwd: &Utf8Path,
    ) -> Result<i32> {
        info!(%binary, workspace = %workspace.cwd, %cwd, "executing binary");
        let mut command = Self::command(ctx)?;
        command
            .current_dir(cwd)
            .env(PROJECT_CWD_ENV, &workspace.cwd)
            .arg("run")
            .arg(binary)
            .args(args);
        run_to_completion(&mut command)
    }
}
