//! Child-process helpers shared by the engine, the bootstrap and runtime
//! pinning.

use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::error::{EngineError, Result};

/// Map a child's exit status to a shell-style exit code.
///
/// Children terminated by a signal report `128 + signal`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_exit_code(status).unwrap_or(1)
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;

    const SIGNAL_EXIT_BASE: i32 = 128;

    status
        .signal()
        .map(|signal| SIGNAL_EXIT_BASE.saturating_add(signal))
}

#[cfg(not(unix))]
const fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}

/// Spawn `command` with inherited stdio, wait for it and return its exit code.
///
/// # Errors
///
/// Returns `EngineError::SpawnFailed` if the process cannot be started.
pub fn run_to_completion(command: &mut Command) -> Result<i32> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(%program, args = ?command.get_args().collect::<Vec<_>>(), "spawning child");

    let status = command.status().map_err(|e| EngineError::SpawnFailed {
        program: program.clone(),
        message: e.to_string(),
    })?;

    let code = exit_code(status);
    debug!(%program, code, "child exited");
    Ok(code)
}
