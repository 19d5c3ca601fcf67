//! Concurrent staging of the scratch project and the bundle tree.
//!
//! Staging happens in a fresh temporary base directory holding two
//! process-exclusive children: `dlx-<pid>`, the scratch project the
//! build-time dependency add runs in, and `yar-<pid>`, the tree that becomes
//! the archive root. The base directory is removed when the
//! [`StagingArea`] is dropped.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use futures_util::future::try_join_all;
use tempfile::TempDir;
use tracing::debug;

use super::layout::{
    CONFIG_FILE, EMPTY_MANIFEST, EXECUTABLE_MODE, LOCKFILE, MANIFEST_FILE, PLUGINS_DIR,
    RELEASE_PATH,
};
use super::placeholder::{relative_root, substitute};
use super::projector::{PluginCopy, ProjectedConfig};
use crate::error::{BundleError, FilesystemError, Result, SdlxError};

/// Temporary directories used while building a bundle or running `dlx`.
#[derive(Debug)]
pub struct StagingArea {
    base: TempDir,
    scratch: Utf8PathBuf,
    bundle: Utf8PathBuf,
}

impl StagingArea {
    /// Create the base directory and both staging children.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if a directory cannot be created.
    pub async fn create() -> Result<Self> {
        let area = Self::allocate()?;
        tokio::try_join!(create_dir(&area.scratch), create_dir(&area.bundle))?;
        debug!(base = %area.base_path().display(), "created staging area");
        Ok(area)
    }

    /// Create the base directory with only the scratch project.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if a directory cannot be created.
    pub async fn scratch_only() -> Result<Self> {
        let area = Self::allocate()?;
        create_dir(&area.scratch).await?;
        Ok(area)
    }

    fn allocate() -> Result<Self> {
        let base = tempfile::Builder::new()
            .prefix("sdlx-staging-")
            .tempdir()
            .map_err(|e| FilesystemError::from_io(std::env::temp_dir(), &e))?;
        let base_path = Utf8PathBuf::from_path_buf(base.path().to_path_buf()).map_err(|path| {
            FilesystemError::IoError {
                path,
                message: String::from("temporary directory path is not valid UTF-8"),
            }
        })?;

        let pid = std::process::id();
        Ok(Self {
            scratch: base_path.join(format!("dlx-{pid}")),
            bundle: base_path.join(format!("yar-{pid}")),
            base,
        })
    }

    fn base_path(&self) -> &std::path::Path {
        self.base.path()
    }

    /// The scratch project directory.
    #[must_use]
    pub fn scratch(&self) -> &Utf8Path {
        &self.scratch
    }

    /// The bundle tree directory.
    #[must_use]
    pub fn bundle(&self) -> &Utf8Path {
        &self.bundle
    }
}

/// Populate the bundle tree and the scratch project.
///
/// The runtime copy, every plugin copy and the configuration, manifest and
/// lockfile writes run concurrently and are joined before returning. The
/// scratch project's configuration is the bundle configuration with the
/// placeholder replaced by the relative path to the bundle tree.
///
/// # Errors
///
/// Returns `BundleError::RuntimeMissing` or `BundleError::PluginMissing` when
/// a source file does not exist, and `FilesystemError` for other I/O
/// failures. The first failure aborts the join.
pub async fn stage_bundle(
    area: &StagingArea,
    runtime: &Utf8Path,
    projected: &ProjectedConfig,
) -> Result<()> {
    let bundle_config = projected.to_toml_string()?;
    let root = relative_root(area.scratch(), area.bundle());
    let scratch_config = substitute(&bundle_config, root.as_str()).into_owned();
    let runtime_destination = area.bundle().join(RELEASE_PATH);
    let config_destination = area.bundle().join(CONFIG_FILE);

    tokio::try_join!(
        copy_runtime(runtime, &runtime_destination),
        copy_plugins(area.bundle(), &projected.copies),
        write_file(&config_destination, bundle_config.as_bytes()),
        write_scratch_project(area.scratch(), &scratch_config),
    )?;

    debug!(
        plugins = projected.copies.len(),
        bundle = %area.bundle(),
        "staged bundle tree"
    );
    Ok(())
}

/// Write an empty manifest, an empty lockfile and `config` into `scratch`.
///
/// # Errors
///
/// Returns `FilesystemError` if a file cannot be written.
pub async fn write_scratch_project(scratch: &Utf8Path, config: &str) -> Result<()> {
    let manifest = scratch.join(MANIFEST_FILE);
    let lockfile = scratch.join(LOCKFILE);
    let config_file = scratch.join(CONFIG_FILE);

    tokio::try_join!(
        write_file(&manifest, EMPTY_MANIFEST.as_bytes()),
        write_file(&lockfile, b""),
        write_file(&config_file, config.as_bytes()),
    )?;
    Ok(())
}

async fn copy_runtime(source: &Utf8Path, destination: &Utf8Path) -> Result<()> {
    ensure_parent(destination).await?;
    tokio::fs::copy(source, destination)
        .await
        .map_err(|e| missing_or_io(&e, source, || BundleError::RuntimeMissing {
            path: source.as_std_path().to_path_buf(),
        }))?;
    set_executable(destination).await
}

async fn copy_plugins(bundle: &Utf8Path, copies: &[PluginCopy]) -> Result<()> {
    if copies.is_empty() {
        return Ok(());
    }

    create_dir_all(&bundle.join(PLUGINS_DIR)).await?;
    try_join_all(copies.iter().map(|copy| copy_plugin(bundle, copy))).await?;
    Ok(())
}

async fn copy_plugin(bundle: &Utf8Path, copy: &PluginCopy) -> Result<()> {
    let destination = bundle.join(&copy.slot);
    tokio::fs::copy(&copy.source, &destination)
        .await
        .map_err(|e| missing_or_io(&e, &copy.source, || BundleError::PluginMissing {
            path: copy.source.as_std_path().to_path_buf(),
        }))?;
    Ok(())
}

fn missing_or_io(
    error: &io::Error,
    source: &Utf8Path,
    missing: impl FnOnce() -> BundleError,
) -> SdlxError {
    if error.kind() == io::ErrorKind::NotFound && !source.exists() {
        missing().into()
    } else {
        FilesystemError::from_io(source.as_std_path(), error).into()
    }
}

async fn create_dir(path: &Utf8Path) -> Result<()> {
    tokio::fs::create_dir(path)
        .await
        .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}

async fn create_dir_all(path: &Utf8Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}

async fn ensure_parent(path: &Utf8Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => create_dir_all(parent).await,
        _ => Ok(()),
    }
}

async fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}

#[cfg(unix)]
async fn set_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE))
        .await
        .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}

#[cfg(not(unix))]
#[expect(
    clippy::unused_async,
    reason = "keeps the signature identical to the Unix implementation"
)]
async fn set_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}
