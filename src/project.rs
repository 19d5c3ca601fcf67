//! Project and workspace discovery.
//!
//! A project root is the nearest directory, walking upwards, that holds the
//! lockfile. Inside a project, the workspace for a directory is the nearest
//! directory at or above it, still inside the project, that holds a manifest.

use camino::{Utf8Path, Utf8PathBuf};

use crate::bundle::layout::{LOCKFILE, MANIFEST_FILE};
use crate::error::{Result, SandboxError};

/// Return the nearest ancestor of `start` (inclusive) containing the lockfile.
#[must_use]
pub fn find_project_cwd(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .find(|candidate| candidate.join(LOCKFILE).is_file())
        .map(Utf8Path::to_path_buf)
}

/// A workspace: a directory with its own manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// The workspace directory.
    pub cwd: Utf8PathBuf,
}

/// A discovered project and the workspace covering the lookup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// The project root.
    pub cwd: Utf8PathBuf,
    /// The workspace containing the lookup directory, if any.
    pub workspace: Option<Workspace>,
    lookup: Utf8PathBuf,
}

impl Project {
    /// Discover the project containing `cwd`.
    ///
    /// Without a lockfile anywhere above `cwd`, `cwd` itself is treated as
    /// the project root.
    #[must_use]
    pub fn find(cwd: &Utf8Path) -> Self {
        let root = find_project_cwd(cwd).unwrap_or_else(|| cwd.to_path_buf());
        let workspace = cwd
            .ancestors()
            .take_while(|candidate| candidate.starts_with(&root))
            .find(|candidate| candidate.join(MANIFEST_FILE).is_file())
            .map(|dir| Workspace {
                cwd: dir.to_path_buf(),
            });

        Self {
            cwd: root,
            workspace,
            lookup: cwd.to_path_buf(),
        }
    }

    /// Return the workspace, failing when the lookup directory has none.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::WorkspaceRequired` naming the project root and
    /// the lookup directory.
    pub fn require_workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or_else(|| {
            SandboxError::WorkspaceRequired {
                project_cwd: self.cwd.as_std_path().to_path_buf(),
                cwd: self.lookup.as_std_path().to_path_buf(),
            }
            .into()
        })
    }
}
