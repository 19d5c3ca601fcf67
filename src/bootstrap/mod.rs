//! Artifact bootstrap: extraction, relocation and delegation.
//!
//! Running an artifact proceeds through a fixed sequence:
//!
//! 1. locate the data marker;
//! 2. decode the base64 payload;
//! 3. mount the archive image;
//! 4. materialize it into a fresh sandbox;
//! 5. relocate the bundle configuration to the sandbox;
//! 6. isolate the delegate's environment;
//! 7. run the delegate from inside the sandbox;
//! 8. pass it the caller's directory and arguments;
//! 9. forward its exit code, then remove the sandbox.
//!
//! The bash loader embedded in the artifact performs steps 1 to 4 and then
//! hands the populated sandbox to [`run`]. Without a sandbox, [`run`]
//! performs every step itself. Failures before the delegate starts are fatal
//! and leave no sandbox behind.

mod delegate;
mod payload;
mod sandbox;


pub use delegate::DelegateCommand;
pub use payload::{decode_payload, locate_payload, mount_artifact, read_artifact};
pub use sandbox::Sandbox;

use camino::Utf8PathBuf;
use tracing::info;

use crate::error::Result;

/// Inputs to [`run`].
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    /// The artifact being executed.
    pub artifact: Utf8PathBuf,
    /// A sandbox already populated by the loader.
    pub sandbox: Option<Utf8PathBuf>,
    /// Directory sandboxes are created in when none is given.
    pub sandbox_parent: Option<Utf8PathBuf>,
    /// The directory the artifact was invoked from.
    pub caller_cwd: Utf8PathBuf,
    /// Arguments the artifact was invoked with.
    pub args: Vec<String>,
}

/// Prepare the sandbox for a request, extracting the artifact if needed.
///
/// # Errors
///
/// Returns `ArtifactError` variants for unreadable artifacts and
/// `FilesystemError` if the sandbox cannot be populated.
pub fn prepare_sandbox(request: &BootstrapRequest) -> Result<Sandbox> {
    let sandbox = if let Some(ref populated) = request.sandbox {
        Sandbox::adopt(populated.clone())?
    } else {
        let bytes = read_artifact(&request.artifact)?;
        let image = mount_artifact(&request.artifact, &bytes)?;
        let fresh = match request.sandbox_parent {
            Some(ref parent) => Sandbox::create_in(parent)?,
            None => Sandbox::create()?,
        };
        image.materialize(fresh.dir())?;
        info!(artifact = %request.artifact, sandbox = %fresh.path(), "extracted artifact");
        fresh
    };

    sandbox.relocate_config()?;
    Ok(sandbox)
}

/// Run an artifact and return the delegate's exit code.
///
/// The sandbox is removed once the delegate has exited, whatever its
/// outcome.
///
/// # Errors
///
/// Returns the extraction error, or `EngineError::SpawnFailed` if the
/// bundled runtime cannot be started.
pub fn run(request: &BootstrapRequest) -> Result<i32> {
    let sandbox = prepare_sandbox(request)?;
    let delegate = DelegateCommand::new(sandbox.path(), &request.caller_cwd, &request.args);
    info!(program = %delegate.program, "delegating to bundled runtime");
    delegate.run()
}
