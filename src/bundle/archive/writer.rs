//! Gzip-compressed tar construction for bundle archives.

use std::io;

use camino::Utf8Path;
use cap_std::fs::Metadata;
use cap_std::fs_utf8::Dir;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tar::{Builder, EntryType, Header};

use crate::error::{BundleError, Result};

const DEFAULT_DIRECTORY_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Incrementally assembles a bundle archive.
///
/// Entries are appended in call order; directory trees are walked in sorted
/// order so identical inputs produce identical archives.
pub struct ArchiveWriter {
    builder: Builder<GzEncoder<Vec<u8>>>,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    /// Create an empty archive writer.
    #[must_use]
    pub fn new() -> Self {
        let encoder = GzEncoder::new(vec![], Compression::default());
        let mut builder = Builder::new(encoder);
        builder.mode(tar::HeaderMode::Deterministic);
        Self { builder }
    }

    /// Append every directory and regular file below `root`.
    ///
    /// Paths are recorded relative to `root`; symlinks and other special
    /// entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::ArchiveFailed` if the tree cannot be read.
    pub fn append_tree(&mut self, root: &Dir) -> Result<()> {
        append_directory_contents(&mut self.builder, root, Utf8Path::new(""))
            .map_err(|e| archive_failed("failed to archive directory tree", &e))
    }

    /// Append a single regular file with the given contents and mode.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::ArchiveFailed` if the entry cannot be written.
    pub fn append_file(&mut self, path: &Utf8Path, contents: &[u8], mode: u32) -> Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(contents.len() as u64);
        header.set_mode(mode);
        header.set_cksum();

        self.builder
            .append_data(&mut header, normalize_archive_path(path), contents)
            .map_err(|e| archive_failed(&format!("failed to archive {path}"), &e))
    }

    /// Append `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::ArchiveFailed` if serialization or the append
    /// fails.
    pub fn append_json<T: Serialize + ?Sized>(&mut self, path: &Utf8Path, value: &T) -> Result<()> {
        let contents = ortho_config::serde_json::to_vec(value).map_err(|e| {
            BundleError::ArchiveFailed {
                message: format!("failed to serialise {path}: {e}"),
            }
        })?;
        self.append_file(path, &contents, DEFAULT_FILE_MODE)
    }

    /// Finalize the tar stream and return the compressed archive.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::ArchiveFailed` if the stream cannot be flushed.
    pub fn finish(self) -> Result<Vec<u8>> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| archive_failed("failed to finalize archive", &e))?;
        encoder
            .finish()
            .map_err(|e| archive_failed("failed to compress archive", &e))
    }
}

fn archive_failed(context: &str, error: &io::Error) -> crate::error::SdlxError {
    BundleError::ArchiveFailed {
        message: format!("{context}: {error}"),
    }
    .into()
}

fn append_directory_contents<W: io::Write>(
    builder: &mut Builder<W>,
    current_dir: &Dir,
    current_relative_path: &Utf8Path,
) -> io::Result<()> {
    let entries = sorted_entries(current_dir)?;

    for entry in entries {
        let entry_relative_path = current_relative_path.join(&entry.file_name);

        match entry.entry_kind {
            EntryKind::Directory => {
                let metadata = current_dir.metadata(&entry.file_name)?;
                append_directory_header(builder, &entry_relative_path, &metadata)?;
                let child_dir = current_dir.open_dir(&entry.file_name)?;
                append_directory_contents(builder, &child_dir, &entry_relative_path)?;
            }
            EntryKind::File => {
                append_file_entry(builder, current_dir, &entry.file_name, &entry_relative_path)?;
            }
            EntryKind::Other => {}
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedEntry {
    file_name: String,
    entry_kind: EntryKind,
}

fn sorted_entries(directory: &Dir) -> io::Result<Vec<SortedEntry>> {
    let mut entries = vec![];

    for entry_result in directory.entries()? {
        let entry = entry_result?;
        let file_name = entry.file_name()?;
        let file_type = entry.file_type()?;

        let entry_kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        entries.push(SortedEntry {
            file_name,
            entry_kind,
        });
    }

    entries.sort_unstable_by(|left, right| left.file_name.cmp(&right.file_name));
    Ok(entries)
}

fn append_directory_header<W: io::Write>(
    builder: &mut Builder<W>,
    relative_path: &Utf8Path,
    metadata: &Metadata,
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(metadata_mode(metadata, DEFAULT_DIRECTORY_MODE));
    header.set_cksum();

    let path = format!("{}/", normalize_archive_path(relative_path));
    builder.append_data(&mut header, path, io::empty())
}

fn append_file_entry<W: io::Write>(
    builder: &mut Builder<W>,
    parent_dir: &Dir,
    file_name: &str,
    relative_path: &Utf8Path,
) -> io::Result<()> {
    let metadata = parent_dir.metadata(file_name)?;
    let mut file = parent_dir.open(file_name)?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(metadata.len());
    header.set_mode(metadata_mode(&metadata, DEFAULT_FILE_MODE));
    header.set_cksum();

    builder.append_data(&mut header, normalize_archive_path(relative_path), &mut file)
}

fn normalize_archive_path(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

#[cfg(unix)]
fn metadata_mode(metadata: &Metadata, _fallback: u32) -> u32 {
    use cap_std::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn metadata_mode(_metadata: &Metadata, fallback: u32) -> u32 {
    fallback
}
