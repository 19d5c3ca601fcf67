//! Execution of the command recorded in an extracted bundle.

use camino::Utf8Path;
use tracing::info;

use super::CommandOutcome;
use crate::bundle::layout::COMMAND_RECORD;
use crate::config::AppConfig;
use crate::engine::{EngineContext, InstallOptions, PackageManager, Telemetry, ThrowReport};
use crate::error::{FilesystemError, Result, SandboxError};
use crate::project::Project;

/// Parameters for running a bundle's recorded command.
pub struct RunBundleParams<'a, P: PackageManager + ?Sized> {
    /// Engine used for the install and the binary lookup.
    pub engine: &'a P,
    /// Configuration of the bundle project.
    pub config: &'a AppConfig,
    /// The bundle root holding `command.json`: the sandbox.
    pub bundle_dir: &'a Utf8Path,
    /// Directory the artifact was invoked from; the binary runs there.
    pub caller_cwd: &'a Utf8Path,
    /// Arguments appended to the recorded ones.
    pub args: &'a [String],
}

/// Read a command record: a non-empty JSON array of strings.
///
/// # Errors
///
/// Returns `SandboxError::CommandRecordMissing` if the file does not exist
/// and `SandboxError::CommandRecordMalformed` if it is not a non-empty array
/// of strings.
pub fn read_command_record(bundle_dir: &Utf8Path) -> Result<Vec<String>> {
    let path = bundle_dir.join(COMMAND_RECORD);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SandboxError::CommandRecordMissing {
                path: path.into_std_path_buf(),
            }
            .into());
        }
        Err(e) => return Err(FilesystemError::from_io(path.as_std_path(), &e).into()),
    };

    let record: Vec<String> = ortho_config::serde_json::from_str(&text).map_err(|e| {
        SandboxError::CommandRecordMalformed {
            message: format!("{path}: {e}"),
        }
    })?;
    if record.is_empty() {
        return Err(SandboxError::CommandRecordMalformed {
            message: format!("{path}: the record names no command"),
        }
        .into());
    }
    Ok(record)
}

/// Run the command recorded in an extracted bundle.
///
/// Reads the command record, checks that the bundle root is a workspace,
/// performs an immutable install that aborts on the first reported error
/// and executes the recorded binary, with the extra `args` appended, in the
/// caller's directory.
///
/// # Errors
///
/// Returns `SdlxError` variants:
/// - `SandboxError::CommandRecordMissing` / `CommandRecordMalformed` for a
///   bad record.
/// - `SandboxError::WorkspaceRequired` if the bundle root has no manifest.
/// - `EngineError::InstallFailed` if the install reports an error.
/// - `EngineError::SpawnFailed` if the engine cannot be started.
pub fn run_bundle<P: PackageManager + ?Sized>(
    params: RunBundleParams<'_, P>,
) -> Result<CommandOutcome> {
    let RunBundleParams {
        engine,
        config,
        bundle_dir,
        caller_cwd,
        args,
    } = params;

    let record = read_command_record(bundle_dir)?;
    let project = Project::find(bundle_dir);
    let workspace = project.require_workspace()?;

    let ctx = EngineContext {
        project_cwd: project.cwd.clone(),
        config: config.clone(),
        telemetry: Telemetry::Disabled,
        quiet: true,
    };
    engine.install(&ctx, InstallOptions::frozen(), &mut ThrowReport)?;

    let mut argv = record.into_iter().chain(args.iter().cloned());
    let Some(binary) = argv.next() else {
        return Err(SandboxError::CommandRecordMalformed {
            message: String::from("the record names no command"),
        }
        .into());
    };
    let binary_args: Vec<String> = argv.collect();

    info!(%binary, args = ?binary_args, cwd = %caller_cwd, "running bundled command");
    let code = engine.execute_binary(&ctx, workspace, &binary, &binary_args, caller_cwd)?;
    Ok(CommandOutcome::from_exit_code(code))
}
