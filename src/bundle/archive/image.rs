//! Read-only, in-memory view of a bundle archive.

use std::io::{self, Read};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::error::{ArtifactError, FilesystemError, Result, SdlxError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageEntryKind {
    Directory,
    File(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageEntry {
    path: Utf8PathBuf,
    mode: u32,
    kind: ImageEntryKind,
}

/// A decoded bundle archive held entirely in memory.
///
/// Mounting validates every entry up front, so a successfully mounted image
/// can always be materialized without escaping the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveImage {
    entries: Vec<ImageEntry>,
}

impl ArchiveImage {
    /// Decode and validate a gzip-compressed tar archive.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::CorruptArchive` if the data is not a readable
    /// archive or an entry path is absolute or contains `..`.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let mut entries = vec![];

        let archive_entries = archive.entries().map_err(|e| corrupt(&e.to_string()))?;
        for entry_result in archive_entries {
            let mut entry = entry_result.map_err(|e| corrupt(&e.to_string()))?;
            let raw_path = entry.path().map_err(|e| corrupt(&e.to_string()))?;
            let path = validated_path(&raw_path)?;
            let mode = entry.header().mode().map_err(|e| corrupt(&e.to_string()))?;

            let kind = match entry.header().entry_type() {
                EntryType::Directory => ImageEntryKind::Directory,
                EntryType::Regular | EntryType::Continuous => {
                    let mut contents = vec![];
                    entry
                        .read_to_end(&mut contents)
                        .map_err(|e| corrupt(&format!("failed to read {path}: {e}")))?;
                    ImageEntryKind::File(contents)
                }
                _ => continue,
            };

            if path.as_str().is_empty() {
                continue;
            }
            entries.push(ImageEntry { path, mode, kind });
        }

        Ok(Self { entries })
    }

    /// Return the contents of the file stored at `path`.
    #[must_use]
    pub fn file(&self, path: &Utf8Path) -> Option<&[u8]> {
        self.entries.iter().find_map(|entry| match entry.kind {
            ImageEntryKind::File(ref contents) if entry.path == path => Some(contents.as_slice()),
            _ => None,
        })
    }

    /// Return the stored Unix mode of the entry at `path`.
    #[must_use]
    pub fn mode(&self, path: &Utf8Path) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.mode)
    }

    /// Iterate over the paths of every file in the image.
    pub fn file_paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.entries.iter().filter_map(|entry| match entry.kind {
            ImageEntryKind::File(_) => Some(entry.path.as_path()),
            ImageEntryKind::Directory => None,
        })
    }

    /// Recreate the image below `target`, restoring file modes.
    ///
    /// Directory modes are applied after all files are written so read-only
    /// directories do not block their own contents.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if a directory or file cannot be created.
    pub fn materialize(&self, target: &Dir) -> Result<()> {
        for entry in &self.entries {
            match entry.kind {
                ImageEntryKind::Directory => {
                    target
                        .create_dir_all(&entry.path)
                        .map_err(|e| fs_error(&entry.path, &e))?;
                }
                ImageEntryKind::File(ref contents) => {
                    if let Some(parent) = entry.path.parent().filter(|p| !p.as_str().is_empty()) {
                        target
                            .create_dir_all(parent)
                            .map_err(|e| fs_error(parent, &e))?;
                    }
                    target
                        .write(&entry.path, contents)
                        .map_err(|e| fs_error(&entry.path, &e))?;
                    apply_mode(target, &entry.path, entry.mode)?;
                }
            }
        }

        for entry in self
            .entries
            .iter()
            .filter(|entry| entry.kind == ImageEntryKind::Directory)
        {
            apply_mode(target, &entry.path, entry.mode)?;
        }

        Ok(())
    }
}

fn validated_path(raw: &std::path::Path) -> Result<Utf8PathBuf> {
    let path = Utf8Path::from_path(raw)
        .ok_or_else(|| corrupt(&format!("entry path is not UTF-8: {}", raw.display())))?;

    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Normal(segment) => normalized.push(segment),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(corrupt(&format!("entry escapes the archive root: {path}")));
            }
        }
    }

    Ok(normalized)
}

#[cfg(unix)]
fn apply_mode(target: &Dir, path: &Utf8Path, mode: u32) -> Result<()> {
    use cap_std::fs::{Permissions, PermissionsExt};

    target
        .set_permissions(path, Permissions::from_mode(mode & 0o7777))
        .map_err(|e| fs_error(path, &e))
}

#[cfg(not(unix))]
fn apply_mode(_target: &Dir, _path: &Utf8Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn corrupt(message: &str) -> SdlxError {
    ArtifactError::CorruptArchive {
        message: message.to_owned(),
    }
    .into()
}

fn fs_error(path: &Utf8Path, error: &io::Error) -> SdlxError {
    FilesystemError::from_io(path.as_std_path(), error).into()
}
