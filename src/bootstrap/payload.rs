//! Loader and payload contracts of an artifact.
//!
//! The loader contract finds where the payload starts; the payload contract
//! turns the bytes after the marker into a mountable archive image.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8Path;

use crate::bundle::ArchiveImage;
use crate::bundle::wrapper::DATA_MARKER;
use crate::error::{ArtifactError, FilesystemError, Result};

/// Return the offset just past the first `\n### DATA ###\n` in `artifact`.
#[must_use]
pub fn locate_payload(artifact: &[u8]) -> Option<usize> {
    let needle = format!("\n{DATA_MARKER}\n");
    let needle_bytes = needle.as_bytes();
    artifact
        .windows(needle_bytes.len())
        .position(|window| window == needle_bytes)
        .map(|start| start.saturating_add(needle_bytes.len()))
}

/// Decode a base64 payload, ignoring ASCII whitespace.
///
/// # Errors
///
/// Returns `ArtifactError::InvalidEncoding` if the payload is not valid
/// base64.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();

    STANDARD.decode(compact).map_err(|e| {
        ArtifactError::InvalidEncoding {
            message: e.to_string(),
        }
        .into()
    })
}

/// Read an artifact from disk.
///
/// # Errors
///
/// Returns `FilesystemError` if the file cannot be read.
pub fn read_artifact(path: &Utf8Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| FilesystemError::from_io(path.as_std_path(), &e).into())
}

/// Locate, decode and mount the archive embedded in `artifact`.
///
/// # Errors
///
/// Returns `ArtifactError::MarkerNotFound` naming `path` when the marker is
/// missing, and the decoding or mounting error otherwise.
pub fn mount_artifact(path: &Utf8Path, artifact: &[u8]) -> Result<ArchiveImage> {
    let payload = locate_payload(artifact)
        .and_then(|offset| artifact.get(offset..))
        .ok_or_else(|| ArtifactError::MarkerNotFound {
            path: path.as_std_path().to_path_buf(),
        })?;
    let archive = decode_payload(payload)?;
    ArchiveImage::from_compressed(&archive)
}
