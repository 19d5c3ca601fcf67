//! Sandbox directories for extracted bundles.

use std::borrow::Cow;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tracing::{debug, warn};

use crate::bundle::layout::CONFIG_FILE;
use crate::bundle::placeholder::substitute;
use crate::error::{FilesystemError, Result};

/// An extracted bundle directory, removed when dropped.
#[derive(Debug)]
pub struct Sandbox {
    path: Utf8PathBuf,
    dir: Dir,
}

impl Sandbox {
    /// Create a fresh, uniquely named sandbox below `parent`.
    ///
    /// The name is `sdlx-<pid>-<random>`.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if the directory cannot be created.
    pub fn create_in(parent: &Utf8Path) -> Result<Self> {
        let prefix = format!("sdlx-{}-", std::process::id());
        let path = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(parent)
            .map_err(|e| FilesystemError::from_io(parent.as_std_path(), &e))?
            .keep();
        let utf8 = Utf8PathBuf::from_path_buf(path).map_err(|path| {
            let _removed = std::fs::remove_dir_all(&path);
            FilesystemError::IoError {
                path,
                message: String::from("sandbox path is not valid UTF-8"),
            }
        })?;
        Self::adopt(utf8)
    }

    /// Create a sandbox in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if the directory cannot be created.
    pub fn create() -> Result<Self> {
        let temp = std::env::temp_dir();
        let parent = Utf8PathBuf::from_path_buf(temp).map_err(|path| FilesystemError::IoError {
            path,
            message: String::from("temporary directory path is not valid UTF-8"),
        })?;
        Self::create_in(&parent)
    }

    /// Take ownership of a directory populated by the artifact loader.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if the directory cannot be opened.
    pub fn adopt(path: Utf8PathBuf) -> Result<Self> {
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .map_err(|e| FilesystemError::from_io(path.as_std_path(), &e))?;
        debug!(sandbox = %path, "sandbox ready");
        Ok(Self { path, dir })
    }

    /// The sandbox directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// A capability handle on the sandbox directory.
    #[must_use]
    pub const fn dir(&self) -> &Dir {
        &self.dir
    }

    /// Point the bundle configuration at the sandbox.
    ///
    /// Every placeholder in `.sdlxrc.toml` is replaced with `.`, making
    /// bundle paths relative to the sandbox root. A bundle without a
    /// configuration file is left alone.
    ///
    /// # Errors
    ///
    /// Returns `FilesystemError` if the file cannot be read or rewritten.
    pub fn relocate_config(&self) -> Result<()> {
        if !self.dir.exists(CONFIG_FILE) {
            return Ok(());
        }

        let config_path = self.path.join(CONFIG_FILE);
        let text = self
            .dir
            .read_to_string(CONFIG_FILE)
            .map_err(|e| FilesystemError::from_io(config_path.as_std_path(), &e))?;

        if let Cow::Owned(relocated) = substitute(&text, ".") {
            self.dir
                .write(CONFIG_FILE, relocated.as_bytes())
                .map_err(|e| FilesystemError::from_io(config_path.as_std_path(), &e))?;
        }
        Ok(())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_dir_all(&self.path) {
            warn!(sandbox = %self.path, %error, "failed to remove sandbox");
        } else {
            debug!(sandbox = %self.path, "sandbox removed");
        }
    }
}
