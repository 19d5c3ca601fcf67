//! Bundle creation orchestration.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tracing::info;

use super::{CommandOutcome, source_project};
use crate::bundle::layout::{COMMAND_RECORD, LOCKFILE, MANIFEST_FILE};
use crate::bundle::{
    ArchiveWriter, StagingArea, project_bundle_config, render_wrapper, stage_bundle,
    write_artifact,
};
use crate::config::{AppConfig, load_project_config};
use crate::engine::{EngineContext, PackageManager, Telemetry};
use crate::error::{FilesystemError, Result};

const MANIFEST_MODE: u32 = 0o644;

/// Parameters for building a bundle artifact.
///
/// Groups the arguments required by [`create_bundle`] into a single struct
/// to satisfy the "no more than four parameters" convention.
pub struct CreateBundleParams<'a, P: PackageManager + ?Sized> {
    /// Engine used for the build-time dependency add.
    pub engine: &'a P,
    /// Configuration of the invocation (provides the engine program).
    pub config: &'a AppConfig,
    /// Directory the build was invoked from.
    pub cwd: &'a Utf8Path,
    /// Runtime binary embedded in the bundle.
    pub runtime_binary: &'a Utf8Path,
    /// Artifact path, resolved against `cwd` when relative.
    pub output: &'a Utf8Path,
    /// Packages added to the bundled project.
    pub packages: &'a [String],
    /// Binary the bundle runs.
    pub command: &'a str,
    /// Arguments recorded with the binary.
    pub args: &'a [String],
    /// Ship the package cache inside the bundle.
    pub include_cache: bool,
    /// Suppress non-critical engine output.
    pub quiet: bool,
    /// Tokio runtime handle for concurrent staging.
    pub runtime_handle: &'a tokio::runtime::Handle,
}

/// Build a self-executing bundle artifact.
///
/// Projects the invoking project's configuration, stages the bundle tree and
/// a scratch project, adds the requested packages in the scratch project,
/// archives the result with the command record and writes the executable
/// wrapper. The artifact is only written once every earlier step succeeded.
///
/// # Errors
///
/// Returns `SdlxError` variants:
/// - `ConfigError` if the project configuration is malformed.
/// - `BundleError::RuntimeMissing` / `PluginMissing` if a source is absent.
/// - `BundleError::ArchiveFailed` / `ArtifactWriteFailed` if the artifact
///   cannot be produced.
/// - `EngineError::SpawnFailed` if the engine cannot be started.
///
/// A non-zero exit from the dependency add is returned as
/// `CommandOutcome::CommandExit` and no artifact is written.
pub fn create_bundle<P: PackageManager + ?Sized>(
    params: CreateBundleParams<'_, P>,
) -> Result<CommandOutcome> {
    let CreateBundleParams {
        engine,
        config,
        cwd,
        runtime_binary,
        output,
        packages,
        command,
        args,
        include_cache,
        quiet,
        runtime_handle,
    } = params;

    let source = source_project(cwd)?;
    let projected = project_bundle_config(source.table.as_ref(), &source.root, include_cache)?;

    let area = runtime_handle.block_on(StagingArea::create())?;
    runtime_handle.block_on(stage_bundle(&area, runtime_binary, &projected))?;

    let ctx = EngineContext {
        project_cwd: area.scratch().to_path_buf(),
        config: load_project_config(area.scratch(), &config.engine)?,
        telemetry: Telemetry::Disabled,
        quiet,
    };
    let add_code = engine.add(&ctx, packages)?;
    if add_code != 0 {
        return Ok(CommandOutcome::CommandExit { code: add_code });
    }

    let mut record = Vec::with_capacity(args.len().saturating_add(1));
    record.push(command.to_owned());
    record.extend_from_slice(args);

    let archive = build_archive(&area, &record)?;
    let artifact = render_wrapper(&archive)?;
    let destination = AppConfig::resolve_path(cwd, output);
    write_artifact(&destination, &artifact)?;

    info!(
        artifact = %destination,
        archive_bytes = archive.len(),
        "bundle written"
    );
    Ok(CommandOutcome::Success)
}

fn build_archive(area: &StagingArea, record: &[String]) -> Result<Vec<u8>> {
    let bundle = open_dir(area.bundle())?;
    let scratch = open_dir(area.scratch())?;

    let mut writer = ArchiveWriter::new();
    writer.append_tree(&bundle)?;
    for name in [MANIFEST_FILE, LOCKFILE] {
        let contents = scratch
            .read(name)
            .map_err(|e| FilesystemError::from_io(area.scratch().join(name).as_std_path(), &e))?;
        writer.append_file(Utf8Path::new(name), &contents, MANIFEST_MODE)?;
    }
    writer.append_json(Utf8Path::new(COMMAND_RECORD), record)?;
    writer.finish()
}

fn open_dir(path: &Utf8Path) -> Result<Dir> {
    Dir::open_ambient_dir(path, ambient_authority())
        .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}
