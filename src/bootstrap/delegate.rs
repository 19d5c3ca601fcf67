//! The isolated invocation handed control after extraction.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};

use crate::bundle::layout::RELEASE_PATH;
use crate::error::Result;
use crate::process::run_to_completion;
use crate::runtime::{IGNORE_CWD_ENV, IGNORE_PATH_ENV};

/// The `run-bundle` invocation of a sandbox's runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateCommand {
    /// The runtime binary inside the sandbox.
    pub program: Utf8PathBuf,
    /// Arguments passed to it.
    pub args: Vec<String>,
    /// Working directory of the child: the sandbox.
    pub working_dir: Utf8PathBuf,
    /// Variables added to the child's environment.
    pub env: Vec<(&'static str, &'static str)>,
}

impl DelegateCommand {
    /// Build the delegate for `sandbox`.
    ///
    /// The child runs the bundled runtime as
    /// `sdlx --cwd <caller_cwd> run-bundle -- <args>` from inside the
    /// sandbox, with ambient discovery and runtime redirection disabled.
    #[must_use]
    pub fn new(sandbox: &Utf8Path, caller_cwd: &Utf8Path, args: &[String]) -> Self {
        let mut argv = vec![
            String::from("--cwd"),
            caller_cwd.to_string(),
            String::from("run-bundle"),
            String::from("--"),
        ];
        argv.extend_from_slice(args);

        Self {
            program: sandbox.join(RELEASE_PATH),
            args: argv,
            working_dir: sandbox.to_path_buf(),
            env: vec![(IGNORE_CWD_ENV, "1"), (IGNORE_PATH_ENV, "1")],
        }
    }

    /// Assemble the process command.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(self.env.iter().copied());
        command
    }

    /// Spawn the delegate, wait for it and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SpawnFailed` if the runtime cannot be started.
    pub fn run(&self) -> Result<i32> {
        run_to_completion(&mut self.to_command())
    }
}
