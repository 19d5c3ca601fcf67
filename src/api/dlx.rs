//! Running a package binary from a throwaway project.

use camino::Utf8Path;
use tracing::info;

use super::{CommandOutcome, source_project};
use crate::bundle::projector::render_table;
use crate::bundle::{StagingArea, project_dlx_config, write_scratch_project};
use crate::config::{AppConfig, load_project_config};
use crate::engine::{EngineContext, PackageManager, Telemetry};
use crate::error::Result;
use crate::project::Project;

/// Parameters for a temporary-environment run.
pub struct DlxParams<'a, P: PackageManager + ?Sized> {
    /// Engine used for the add and the binary lookup.
    pub engine: &'a P,
    /// Configuration of the invocation (provides the engine program).
    pub config: &'a AppConfig,
    /// Directory the command was invoked from; the binary runs there.
    pub cwd: &'a Utf8Path,
    /// Packages to install; defaults to the command's own package.
    pub packages: &'a [String],
    /// Descriptor of the package whose binary runs.
    pub command: &'a str,
    /// Arguments passed to the binary.
    pub args: &'a [String],
    /// Suppress non-critical engine output.
    pub quiet: bool,
    /// Tokio runtime handle for the scratch project writes.
    pub runtime_handle: &'a tokio::runtime::Handle,
}

/// Return the package name of a descriptor, without scope or range.
///
/// `@scope/name@^1.0.0` and `name@latest` both yield `name`.
#[must_use]
pub fn descriptor_name(descriptor: &str) -> &str {
    let unscoped = if descriptor.starts_with('@') {
        descriptor
            .split_once('/')
            .map_or(descriptor, |(_, rest)| rest)
    } else {
        descriptor
    };
    unscoped
        .split_once('@')
        .map_or(unscoped, |(name, _)| name)
}

/// Install packages into a throwaway project and run a binary from it.
///
/// The scratch project inherits the invoking project's configuration with
/// the shared cache on, telemetry off and plugin paths made absolute. The
/// binary runs in the invoking directory and the scratch project is removed
/// afterwards.
///
/// # Errors
///
/// Returns `SdlxError` variants:
/// - `ConfigError` if the project configuration is malformed.
/// - `SandboxError::WorkspaceRequired` if the scratch project has no
///   workspace.
/// - `EngineError::SpawnFailed` if the engine cannot be started.
///
/// A non-zero exit from the add is returned as `CommandOutcome::CommandExit`.
pub fn dlx<P: PackageManager + ?Sized>(params: DlxParams<'_, P>) -> Result<CommandOutcome> {
    let DlxParams {
        engine,
        config,
        cwd,
        packages,
        command,
        args,
        quiet,
        runtime_handle,
    } = params;

    let source = source_project(cwd)?;
    let table = project_dlx_config(source.table.as_ref(), &source.root)?;
    let rendered = render_table(&table)?;

    let area = runtime_handle.block_on(StagingArea::scratch_only())?;
    runtime_handle.block_on(write_scratch_project(area.scratch(), &rendered))?;

    let ctx = EngineContext {
        project_cwd: area.scratch().to_path_buf(),
        config: load_project_config(area.scratch(), &config.engine)?,
        telemetry: Telemetry::Disabled,
        quiet,
    };

    let to_add = if packages.is_empty() {
        vec![command.to_owned()]
    } else {
        packages.to_vec()
    };
    let add_code = engine.add(&ctx, &to_add)?;
    if add_code != 0 {
        return Ok(CommandOutcome::CommandExit { code: add_code });
    }

    let project = Project::find(area.scratch());
    let workspace = project.require_workspace()?;
    let binary = descriptor_name(command);

    info!(%binary, %cwd, "running temporary binary");
    let code = engine.execute_binary(&ctx, workspace, binary, args, cwd)?;
    Ok(CommandOutcome::from_exit_code(code))
}
