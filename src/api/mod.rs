//! Orchestration API for sdlx commands.
//!
//! This module provides public orchestration functions for each sdlx
//! command: [`create_bundle`], [`run_bundle`] and [`dlx`]. These functions
//! contain the business logic behind the CLI, making it available to both
//! the CLI adapter and library embedders.
//!
//! All functions accept library-owned types (not clap types) and return
//! [`crate::error::Result<CommandOutcome>`]. They do not print to
//! stdout/stderr or call `std::process::exit`.

mod create_bundle;
mod dlx;
mod run_bundle;


pub use create_bundle::{CreateBundleParams, create_bundle};
pub use dlx::{DlxParams, descriptor_name, dlx};
pub use run_bundle::{RunBundleParams, read_command_record, run_bundle};

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::read_project_table;
use crate::error::Result;
use crate::project::find_project_cwd;

/// Outcome of an sdlx command.
///
/// Commands return either outright success or a command-specific exit code
/// that the CLI adapter maps to a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command completed successfully (exit code 0).
    Success,
    /// The command completed but a delegated process exited with a
    /// non-zero code.
    CommandExit {
        /// The exit code reported by the delegated process.
        code: i32,
    },
}

impl CommandOutcome {
    /// Classify a delegated process exit code.
    #[must_use]
    pub const fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::CommandExit { code }
        }
    }

    /// The exit code the process should report.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::CommandExit { code } => code,
        }
    }
}

/// The invoking project's configuration source.
struct SourceProject {
    /// Root used to resolve relative paths: the project root when one was
    /// found, the lookup directory otherwise.
    root: Utf8PathBuf,
    table: Option<toml::Table>,
}

fn source_project(cwd: &Utf8Path) -> Result<SourceProject> {
    match find_project_cwd(cwd) {
        Some(root) => {
            let table = read_project_table(&root)?;
            Ok(SourceProject { root, table })
        }
        None => Ok(SourceProject {
            root: cwd.to_path_buf(),
            table: None,
        }),
    }
}
