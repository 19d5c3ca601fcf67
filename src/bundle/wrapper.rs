//! Artifact wrapper emission.
//!
//! An artifact is a bash script: a preamble that feeds the embedded loader to
//! a second bash process, the data marker line, and the base64-encoded bundle
//! archive. The loader is compressed into the binary at build time and
//! expanded here.

use std::io::Read;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use flate2::read::GzDecoder;

use super::layout::EXECUTABLE_MODE;
use crate::error::{BundleError, Result, SdlxError};

/// The line separating the script preamble from the payload.
pub const DATA_MARKER: &str = "### DATA ###";

const COMPRESSED_LOADER: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/loader.sh.gz"));

/// Return the loader script embedded in every artifact.
///
/// # Errors
///
/// Returns `BundleError::ArchiveFailed` if the compiled-in loader cannot be
/// decompressed.
pub fn loader_script() -> Result<String> {
    let mut script = String::new();
    GzDecoder::new(COMPRESSED_LOADER)
        .read_to_string(&mut script)
        .map_err(|e| BundleError::ArchiveFailed {
            message: format!("failed to expand the embedded loader: {e}"),
        })?;
    Ok(script)
}

/// Render the complete artifact text for a compressed bundle archive.
///
/// # Errors
///
/// Returns `BundleError::ArchiveFailed` if the loader cannot be expanded.
pub fn render_wrapper(archive: &[u8]) -> Result<String> {
    let loader = loader_script()?;
    let payload = STANDARD.encode(archive);

    Ok(format!(
        "#!/usr/bin/env bash\n\
         \n\
         sdlx_loader() {{\n  cat << \"SDLX_EOF\"\n{loader}SDLX_EOF\n}}\n\
         \n\
         exec bash <(sdlx_loader) \"$0\" \"$@\"\n\
         \n\
         {DATA_MARKER}\n\
         {payload}\n"
    ))
}

/// Write the artifact to `output` and mark it executable.
///
/// # Errors
///
/// Returns `BundleError::ArtifactWriteFailed` if the file cannot be written
/// or its mode cannot be changed.
pub fn write_artifact(output: &Utf8Path, contents: &str) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = output
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = output.file_name().ok_or_else(|| write_failed(output, "path has no file name"))?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|e| write_failed(output, &e.to_string()))?;
    dir.write(file_name, contents)
        .map_err(|e| write_failed(output, &e.to_string()))?;
    mark_executable(&dir, file_name).map_err(|e| write_failed(output, &e.to_string()))
}

#[cfg(unix)]
fn mark_executable(dir: &Dir, file_name: &str) -> std::io::Result<()> {
    use cap_std::fs::{Permissions, PermissionsExt};

    dir.set_permissions(file_name, Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn mark_executable(_dir: &Dir, _file_name: &str) -> std::io::Result<()> {
    Ok(())
}

fn write_failed(output: &Utf8Path, message: &str) -> SdlxError {
    BundleError::ArtifactWriteFailed {
        path: output.as_std_path().to_path_buf(),
        message: message.to_owned(),
    }
    .into()
}
